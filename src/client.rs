//! Authenticated HTTP client for the marketplace API.
//!
//! ARCHITECTURE
//! ============
//! Every call passes two stages:
//! - request stage: attach `Authorization: Bearer <access>` unless the path
//!   is on the public allow-list (login, register, refresh);
//! - response stage: a 401 on a protected path (or on the refresh endpoint)
//!   enters the refresh protocol, anything else is returned to the caller
//!   as-is.
//!
//! The refresh protocol is single-flight across the whole client instance
//! (see [`crate::refresh`]). The refresh call itself goes out on the raw
//! HTTP client, so a failing refresh can never re-enter the protocol.
//!
//! TRADE-OFFS
//! ==========
//! A request is replayed at most once. If the replay still gets a 401 the
//! error is returned instead of refreshing again.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, Request, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, RefreshError, status_message};
use crate::navigator::{LOGIN_PATH, Navigator};
use crate::refresh::{RefreshCoordinator, RefreshOutcome, RefreshTicket};
use crate::token_store::TokenStore;
use crate::types::{ApiResponse, ErrorEnvelope, PaginatedResponse, RefreshRequest, TokenPair};

pub const LOGIN_ENDPOINT: &str = "/api/v1/auth/login";
pub const REGISTER_ENDPOINT: &str = "/api/v1/auth/register";
pub const REFRESH_ENDPOINT: &str = "/api/v1/auth/refresh";

/// Endpoints that never carry a bearer token.
pub const PUBLIC_PATHS: [&str; 3] = [LOGIN_ENDPOINT, REGISTER_ENDPOINT, REFRESH_ENDPOINT];

#[must_use]
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path.contains(p))
}

fn is_refresh_path(path: &str) -> bool {
    path.contains(REFRESH_ENDPOINT)
}

fn bearer_value(token: &str) -> Result<HeaderValue, ApiError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
    value.set_sensitive(true);
    Ok(value)
}

fn bearer_of(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

// =============================================================================
// CLIENT
// =============================================================================

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
    navigator: Arc<dyn Navigator>,
    refresh: RefreshCoordinator,
}

/// Shared API client. Construct once per process and clone the handle;
/// clones share the refresh state, so single-flight holds process-wide.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &ClientConfig, tokens: TokenStore, navigator: Arc<dyn Navigator>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeouts.request())
            .connect_timeout(config.timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: config.api_url.trim_end_matches('/').to_owned(),
                tokens,
                navigator,
                refresh: RefreshCoordinator::new(),
            }),
        })
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        &self.inner.tokens
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Whether a refresh is currently in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.inner.refresh.is_refreshing()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.inner.base_url, path)
    }

    /// Start a request against `path` (relative to the API origin). Send it
    /// with [`ApiClient::execute`] so it passes through both stages.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.http.request(method, self.url(path))
    }

    /// Send a request through the auth stages and return the 2xx response.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Http`] for transport failures;
    /// - [`ApiError::Status`] for non-2xx responses the refresh protocol did
    ///   not recover (including a terminal 401);
    /// - [`ApiError::Refresh`] when the session had to be torn down.
    pub async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let mut request = builder.build()?;
        self.authorize(&mut request)?;

        let replay = request.try_clone();
        let sent_with = bearer_of(&request);
        let response = self.inner.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }
        self.recover(response, replay, sent_with).await
    }

    fn authorize(&self, request: &mut Request) -> Result<(), ApiError> {
        if is_public_path(request.url().path()) {
            return Ok(());
        }
        if let Some(token) = self.inner.tokens.access_token() {
            request.headers_mut().insert(AUTHORIZATION, bearer_value(&token)?);
        }
        Ok(())
    }

    async fn recover(
        &self,
        response: Response,
        replay: Option<Request>,
        sent_with: Option<String>,
    ) -> Result<Response, ApiError> {
        let path = response.url().path().to_owned();
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let original = ApiError::from_status(status, &body);

        // Login and register never carry a credential; their 401 means
        // "bad credentials", not "expired session".
        if is_public_path(&path) && !is_refresh_path(&path) {
            return Err(original);
        }

        let replay = match replay {
            Some(r) if !is_refresh_path(&path) => r,
            _ => {
                warn!(%path, "unrecoverable 401; ending session");
                self.end_session();
                return Err(original);
            }
        };

        match self.inner.refresh.begin() {
            RefreshTicket::Waiter(waiter) => {
                let token = waiter.wait().await?;
                self.replay(replay, &token).await
            }
            RefreshTicket::Leader(lease) => {
                // With the lease held nothing else can rotate the pair, so a
                // token that differs from the one sent is already fresh.
                if let Some(current) = self.superseded(sent_with.as_deref()) {
                    let released = lease.settle(&Ok(current.clone()));
                    debug!(%path, waiters = released, "401 carried a superseded token; replaying");
                    return self.replay(replay, &current).await;
                }
                info!(%path, "access token rejected; refreshing");
                let outcome: RefreshOutcome = self.refresh_tokens().await;
                match &outcome {
                    Ok(_) => {
                        let released = lease.settle(&outcome);
                        info!(waiters = released, "token refresh succeeded");
                    }
                    Err(e) => {
                        self.inner.tokens.clear();
                        let released = lease.settle(&outcome);
                        warn!(error = %e, waiters = released, "token refresh failed; ending session");
                        self.inner.navigator.navigate(LOGIN_PATH);
                    }
                }
                let token = outcome?;
                self.replay(replay, &token).await
            }
        }
    }

    /// Stored access token, when it is not the one `sent_with`.
    fn superseded(&self, sent_with: Option<&str>) -> Option<String> {
        self.inner
            .tokens
            .access_token()
            .filter(|current| sent_with != Some(current.as_str()))
    }

    async fn replay(&self, mut request: Request, token: &str) -> Result<Response, ApiError> {
        request.headers_mut().insert(AUTHORIZATION, bearer_value(token)?);
        let response = self.inner.http.execute(request).await?;
        check_status(response).await
    }

    /// Exchange the stored refresh token for a new pair and persist it.
    async fn refresh_tokens(&self) -> Result<String, RefreshError> {
        let refresh_token = self
            .inner
            .tokens
            .refresh_token()
            .ok_or(RefreshError::MissingRefreshToken)?;

        let response = self
            .inner
            .http
            .post(self.url(REFRESH_ENDPOINT))
            .json(&RefreshRequest { refresh_token: &refresh_token })
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(RefreshError::Rejected { status: status.as_u16(), message: status_message(status, &body) });
        }

        let envelope: ApiResponse<TokenPair> =
            serde_json::from_str(&body).map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;
        let pair = envelope.data;
        if !envelope.success || pair.access_token.is_empty() || pair.refresh_token.is_empty() {
            return Err(RefreshError::InvalidResponse("missing token pair".to_owned()));
        }

        self.inner.tokens.save(&pair.access_token, &pair.refresh_token);
        Ok(pair.access_token)
    }

    fn end_session(&self) {
        self.inner.tokens.clear();
        self.inner.navigator.navigate(LOGIN_PATH);
    }

    // =========================================================================
    // ENVELOPE HELPERS
    // =========================================================================

    /// `GET path`, returning the envelope's `data`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`]; also [`ApiError::Rejected`] and
    /// [`ApiError::Decode`] for envelope problems.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        decode_data(response).await
    }

    /// `GET path` on a list endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn get_page<T: DeserializeOwned>(&self, path: &str) -> Result<PaginatedResponse<T>, ApiError> {
        let response = self.execute(self.request(Method::GET, path)).await?;
        let value = decode_value(response).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(self.request(Method::POST, path).json(body)).await?;
        decode_data(response).await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Same as [`ApiClient::get`].
    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(self.request(Method::PUT, path).json(body)).await?;
        decode_data(response).await
    }

    /// Send a bodyless request whose result payload is not needed.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::execute`]; also [`ApiError::Rejected`] when the
    /// envelope reports failure.
    pub async fn send_discarding(&self, method: Method, path: &str) -> Result<(), ApiError> {
        let response = self.execute(self.request(method, path)).await?;
        let body = response.text().await?;
        if let Ok(value) = serde_json::from_str::<Value>(&body) {
            reject_unsuccessful(value)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("refresh", &self.inner.refresh)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// RESPONSE DECODING
// =============================================================================

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!(status = status.as_u16(), "request failed");
    Err(ApiError::from_status(status, &body))
}

fn reject_unsuccessful(value: Value) -> Result<Value, ApiError> {
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        let message = serde_json::from_value::<ErrorEnvelope>(value)
            .ok()
            .and_then(ErrorEnvelope::message)
            .unwrap_or_else(|| "request rejected".to_owned());
        return Err(ApiError::Rejected { message });
    }
    Ok(value)
}

async fn decode_value(response: Response) -> Result<Value, ApiError> {
    let body = response.text().await?;
    let value: Value = serde_json::from_str(&body)?;
    reject_unsuccessful(value)
}

async fn decode_data<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let value = decode_value(response).await?;
    let envelope: ApiResponse<T> = serde_json::from_value(value)?;
    Ok(envelope.data)
}
