use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::database::Db;

/// GET /health - liveness/readiness probe with a store ping
pub async fn health(State(db): State<Db>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match db.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "degraded",
                "timestamp": now,
                "database_error": e.to_string()
            })),
        ),
    }
}
