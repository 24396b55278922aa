//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::server::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    // Touch the database so the check fails when storage is broken.
    let state = state.lock().await;
    let storage_ok = state.storage.get_profile("health-probe").is_ok();

    let body = serde_json::json!({
        "status": if storage_ok { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": storage_ok,
    });
    (StatusCode::OK, axum::Json(body))
}
