//! Shared fixtures for unit tests: sample payloads, a recording navigator,
//! and an in-process mock of the marketplace API.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use serde_json::{Value, json};

use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::navigator::Navigator;
use crate::storage::MemoryStorage;
use crate::token_store::TokenStore;
use crate::types::{AuthResponse, User, UserRole};

// =============================================================================
// FIXTURES
// =============================================================================

pub fn sample_user(id: &str) -> User {
    User {
        id: id.to_owned(),
        email: format!("{id}@example.com"),
        phone: "+60123456789".to_owned(),
        full_name: "Siti Aminah".to_owned(),
        role: UserRole::Shop,
        is_verified: true,
        avatar_url: None,
        created_at: "2026-01-02T03:04:05Z".to_owned(),
    }
}

pub fn sample_auth(access: &str, refresh: &str, user_id: &str) -> AuthResponse {
    AuthResponse {
        access_token: access.to_owned(),
        refresh_token: refresh.to_owned(),
        user: sample_user(user_id),
    }
}

pub fn memory_tokens() -> (Arc<MemoryStorage>, TokenStore) {
    let backend = Arc::new(MemoryStorage::new());
    let tokens = TokenStore::new(backend.clone());
    (backend, tokens)
}

pub fn user_json(id: &str) -> Value {
    serde_json::to_value(sample_user(id)).unwrap_or(Value::Null)
}

// =============================================================================
// RECORDING NAVIGATOR
// =============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().expect("navigator mutex should lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.paths.lock().expect("navigator mutex should lock").push(path.to_owned());
    }
}

// =============================================================================
// MOCK API
// =============================================================================

/// Behavior knobs and call counters for the mock API.
pub struct MockApi {
    /// Access token the protected routes accept.
    pub valid_access: Mutex<String>,
    /// Refresh token the refresh route accepts, and the pair it issues.
    pub valid_refresh: Mutex<String>,
    pub issued: Mutex<(String, String)>,
    /// When set, the refresh route answers 401 regardless of input.
    pub reject_refresh: Mutex<bool>,
    pub refresh_delay: Duration,
    pub refresh_calls: AtomicUsize,
    /// Every `Authorization` header seen on `/api/v1/petshops/mine`, in order.
    pub seen_auth: Mutex<Vec<Option<String>>>,
    /// Refresh tokens presented to the refresh route.
    pub seen_refresh_tokens: Mutex<Vec<String>>,
    pub logout_calls: AtomicUsize,
    pub shops: Mutex<HashMap<String, Value>>,
    pub read_notifications: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            valid_access: Mutex::new("a2".to_owned()),
            valid_refresh: Mutex::new("r1".to_owned()),
            issued: Mutex::new(("a2".to_owned(), "r2".to_owned())),
            reject_refresh: Mutex::new(false),
            refresh_delay: Duration::from_millis(100),
            refresh_calls: AtomicUsize::new(0),
            seen_auth: Mutex::new(Vec::new()),
            seen_refresh_tokens: Mutex::new(Vec::new()),
            logout_calls: AtomicUsize::new(0),
            shops: Mutex::new(HashMap::new()),
            read_notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn accept_access(&self, token: &str) {
        *self.valid_access.lock().expect("mock mutex should lock") = token.to_owned();
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().expect("mock mutex should lock").clone()
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.valid_access.lock().expect("mock mutex should lock"));
        bearer(headers).is_some_and(|h| h == expected)
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

fn envelope(data: Value) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": "token expired" }))).into_response()
}

type Mock = State<Arc<MockApi>>;

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == json!("correct-horse") {
        envelope(json!({ "access_token": "a2", "refresh_token": "r1", "user": user_json("u1") })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": "invalid credentials" }))).into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == json!("taken@example.com") {
        return (StatusCode::CONFLICT, Json(json!({ "success": false, "error": "email already registered" })))
            .into_response();
    }
    let mut user = user_json("u9");
    user["email"] = body["email"].clone();
    user["full_name"] = body["full_name"].clone();
    user["role"] = body["role"].clone();
    envelope(json!({ "access_token": "a2", "refresh_token": "r1", "user": user })).into_response()
}

async fn refresh(State(mock): Mock, Json(body): Json<Value>) -> Response {
    mock.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let presented = body["refresh_token"].as_str().unwrap_or_default().to_owned();
    mock.seen_refresh_tokens
        .lock()
        .expect("mock mutex should lock")
        .push(presented.clone());
    tokio::time::sleep(mock.refresh_delay).await;

    let rejected = *mock.reject_refresh.lock().expect("mock mutex should lock");
    let valid = mock.valid_refresh.lock().expect("mock mutex should lock").clone();
    if rejected || presented != valid {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "success": false, "error": "refresh token invalid" })))
            .into_response();
    }
    let (access, refresh) = mock.issued.lock().expect("mock mutex should lock").clone();
    envelope(json!({ "access_token": access, "refresh_token": refresh })).into_response()
}

async fn logout(State(mock): Mock) -> Response {
    mock.logout_calls.fetch_add(1, Ordering::SeqCst);
    envelope(Value::Null).into_response()
}

async fn profile(State(mock): Mock, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let mut user = user_json("u1");
    if let Some(name) = body.get("full_name") {
        user["full_name"] = name.clone();
    }
    if let Some(phone) = body.get("phone") {
        user["phone"] = phone.clone();
    }
    envelope(user).into_response()
}

async fn my_shops(State(mock): Mock, headers: HeaderMap) -> Response {
    mock.seen_auth.lock().expect("mock mutex should lock").push(bearer(&headers));
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let shops: Vec<Value> = mock.shops.lock().expect("mock mutex should lock").values().cloned().collect();
    envelope(Value::Array(shops)).into_response()
}

async fn create_shop(State(mock): Mock, headers: HeaderMap, Json(mut body): Json<Value>) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    body["id"] = json!("s1");
    body["rating"] = json!(0.0);
    body["created_at"] = json!("2026-01-02T03:04:05Z");
    mock.shops
        .lock()
        .expect("mock mutex should lock")
        .insert("s1".to_owned(), body.clone());
    envelope(body).into_response()
}

async fn update_shop(State(mock): Mock, headers: HeaderMap, Path(id): Path<String>, Json(mut body): Json<Value>) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let mut shops = mock.shops.lock().expect("mock mutex should lock");
    if !shops.contains_key(&id) {
        return (StatusCode::NOT_FOUND, Json(json!({ "success": false, "error": "shop not found" }))).into_response();
    }
    body["id"] = json!(id);
    body["rating"] = json!(4.5);
    body["created_at"] = json!("2026-01-02T03:04:05Z");
    shops.insert(id, body.clone());
    envelope(body).into_response()
}

async fn delete_shop(State(mock): Mock, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    if mock.shops.lock().expect("mock mutex should lock").remove(&id).is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({ "success": false, "detail": "no such shop" }))).into_response();
    }
    envelope(Value::Null).into_response()
}

async fn notifications(State(mock): Mock, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    let read = mock.read_notifications.lock().expect("mock mutex should lock").clone();
    let items: Vec<Value> = ["n1", "n2", "n3"]
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "user_id": "u1",
                "title": format!("Notification {id}"),
                "body": "body",
                "type": "booking",
                "is_read": read.iter().any(|r| r == id),
                "created_at": "2026-01-02T03:04:05Z"
            })
        })
        .collect();
    let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    let limit: u32 = q.get("limit").and_then(|l| l.parse().ok()).unwrap_or(0);
    Json(json!({
        "success": true,
        "data": items,
        "pagination": { "total": 3, "page": page, "limit": limit, "total_pages": 1 }
    }))
    .into_response()
}

async fn mark_read(State(mock): Mock, headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    mock.read_notifications.lock().expect("mock mutex should lock").push(id);
    envelope(Value::Null).into_response()
}

async fn rejected() -> Json<Value> {
    Json(json!({ "success": false, "data": null, "error": "shop limit reached" }))
}

async fn echo_upload(State(mock): Mock, headers: HeaderMap) -> Response {
    if !mock.authorized(&headers) {
        return unauthorized();
    }
    envelope(json!("stored")).into_response()
}

fn router(mock: Arc<MockApi>) -> Router {
    Router::new()
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/profile", put(profile))
        .route("/api/v1/petshops/mine", get(my_shops))
        .route("/api/v1/petshops", post(create_shop))
        .route("/api/v1/petshops/{id}", put(update_shop).delete(delete_shop))
        .route("/api/v1/notifications", get(notifications))
        .route("/api/v1/notifications/{id}/read", put(mark_read))
        .route("/api/v1/rejected", get(rejected))
        .route("/api/v1/uploads", post(echo_upload))
        .with_state(mock)
}

/// Serve the mock API on an ephemeral port; returns its base URL.
pub async fn spawn_mock_api(mock: Arc<MockApi>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("mock api should bind");
    let addr: SocketAddr = listener.local_addr().expect("mock api should have an address");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router(mock)).await;
    });
    format!("http://{addr}")
}

/// Everything a protocol test needs, wired the way the CLI wires it.
pub struct Harness {
    pub mock: Arc<MockApi>,
    pub tokens: TokenStore,
    pub navigator: Arc<RecordingNavigator>,
    pub client: ApiClient,
}

pub async fn harness_with(mock: MockApi) -> Harness {
    let mock = Arc::new(mock);
    let base_url = spawn_mock_api(mock.clone()).await;
    let (_, tokens) = memory_tokens();
    let navigator = Arc::new(RecordingNavigator::default());
    let config = ClientConfig { api_url: base_url, ..ClientConfig::default() };
    let client = ApiClient::new(&config, tokens.clone(), navigator.clone()).expect("client should build");
    Harness { mock, tokens, navigator, client }
}

pub async fn harness() -> Harness {
    harness_with(MockApi::new()).await
}
