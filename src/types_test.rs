use super::*;
use serde_json::json;

fn user_json() -> serde_json::Value {
    json!({
        "id": "u1",
        "email": "seller@example.com",
        "phone": "+60123456789",
        "full_name": "Siti Aminah",
        "role": "shop",
        "is_verified": true,
        "created_at": "2026-01-02T03:04:05Z"
    })
}

// =============================================================================
// User
// =============================================================================

#[test]
fn user_deserializes_without_avatar() {
    let user: User = serde_json::from_value(user_json()).unwrap();
    assert_eq!(user.id, "u1");
    assert_eq!(user.role, UserRole::Shop);
    assert!(user.avatar_url.is_none());
}

#[test]
fn user_serialization_omits_missing_avatar() {
    let user: User = serde_json::from_value(user_json()).unwrap();
    let value = serde_json::to_value(&user).unwrap();
    assert!(value.get("avatar_url").is_none());
}

#[test]
fn user_role_uses_lowercase_names() {
    for (raw, role) in [
        ("owner", UserRole::Owner),
        ("runner", UserRole::Runner),
        ("admin", UserRole::Admin),
        ("shop", UserRole::Shop),
    ] {
        let parsed: UserRole = serde_json::from_value(json!(raw)).unwrap();
        assert_eq!(parsed, role);
    }
}

// =============================================================================
// Envelopes
// =============================================================================

#[test]
fn api_response_wraps_auth_payload() {
    let body = json!({
        "success": true,
        "data": { "access_token": "a1", "refresh_token": "r1", "user": user_json() }
    });
    let resp: ApiResponse<AuthResponse> = serde_json::from_value(body).unwrap();
    assert!(resp.success);
    assert_eq!(resp.data.access_token, "a1");
    assert!(resp.error.is_none());
}

#[test]
fn paginated_response_carries_pagination() {
    let body = json!({
        "success": true,
        "data": [],
        "pagination": { "total": 0, "page": 1, "limit": 50, "total_pages": 0 }
    });
    let resp: PaginatedResponse<Notification> = serde_json::from_value(body).unwrap();
    assert!(resp.data.is_empty());
    assert_eq!(resp.pagination.limit, 50);
}

#[test]
fn error_envelope_prefers_error_over_detail() {
    let env: ErrorEnvelope = serde_json::from_value(json!({ "error": "bad", "detail": "more" })).unwrap();
    assert_eq!(env.message().as_deref(), Some("bad"));
}

#[test]
fn error_envelope_falls_back_to_detail() {
    let env: ErrorEnvelope = serde_json::from_value(json!({ "error": "", "detail": "token expired" })).unwrap();
    assert_eq!(env.message().as_deref(), Some("token expired"));
}

#[test]
fn error_envelope_empty_yields_none() {
    let env: ErrorEnvelope = serde_json::from_value(json!({ "success": false })).unwrap();
    assert!(env.message().is_none());
}

// =============================================================================
// Wire names
// =============================================================================

#[test]
fn notification_type_field_maps_to_kind() {
    let n: Notification = serde_json::from_value(json!({
        "id": "n1",
        "user_id": "u1",
        "title": "New booking",
        "body": "You have a new grooming booking",
        "type": "booking",
        "is_read": false,
        "created_at": "2026-01-02T03:04:05Z"
    }))
    .unwrap();
    assert_eq!(n.kind, "booking");
}

#[test]
fn pet_shop_category_uses_snake_case() {
    let value = serde_json::to_value(PetShopCategory::PetStore).unwrap();
    assert_eq!(value, json!("pet_store"));
}

#[test]
fn register_request_skips_missing_phone() {
    let req = RegisterRequest {
        full_name: "Siti".into(),
        email: "s@example.com".into(),
        phone: None,
        password: "hunter22".into(),
        role: UserRole::Shop,
    };
    let value = serde_json::to_value(&req).unwrap();
    assert!(value.get("phone").is_none());
    assert_eq!(value["role"], json!("shop"));
}
