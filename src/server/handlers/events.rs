//! Usage event ingestion.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::events::UsageEvent;
use crate::server::state::SharedState;

pub async fn record_event_handler(
    State(state): State<SharedState>,
    axum::Json(event): axum::Json<UsageEvent>,
) -> Response {
    let st = state.lock().await;
    st.events.record(event);
    (
        StatusCode::ACCEPTED,
        axum::Json(serde_json::json!({"status": "recorded"})),
    )
        .into_response()
}
