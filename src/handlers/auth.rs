use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::auth::Principal;

/// GET /v1/auth/who-are-you - echo the resolved principal
pub async fn who_are_you(Extension(principal): Extension<Principal>) -> Json<Value> {
    Json(json!({
        "user": principal.user,
        "user_id": principal.user_id,
        "permissions": principal.capability_tokens(),
    }))
}
