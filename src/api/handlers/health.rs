use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.store.ping().await.is_ok();
    let storage_ok = state.artifacts.is_ok();

    if db_ok && storage_ok {
        (StatusCode::OK, Json(json!({ "status": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "db": if db_ok { "connected" } else { "disconnected" },
                "log_storage": match &state.artifacts {
                    Ok(_) => "configured".to_string(),
                    Err(e) => e.to_string(),
                },
            })),
        )
    }
}
