//! SOS dispatch handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::geo::Point;
use crate::server::state::SharedState;
use crate::server::utils::storage_error;
use crate::sos::{self, NoFix, DEFAULT_SOS_MESSAGE};

#[derive(Deserialize)]
pub struct ActivateSosPayload {
    latitude: Option<f64>,
    longitude: Option<f64>,
    message: Option<String>,
}

/// Activate an SOS for a user.  A location supplied by the client wins;
/// otherwise the last stored fix is used, and failing that the campus-area
/// fallback.  Activation never fails for lack of a location.
pub async fn activate_sos_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    axum::Json(req): axum::Json<ActivateSosPayload>,
) -> Response {
    let st = state.lock().await;

    let last_known = match (req.latitude, req.longitude) {
        (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
        _ => st
            .storage
            .get_location(&user_id)
            .ok()
            .flatten()
            .and_then(|row| match (row.latitude, row.longitude) {
                (Some(lat), Some(lng)) => Some(Point::new(lat, lng)),
                _ => None,
            }),
    };

    let message = req.message.as_deref().unwrap_or(DEFAULT_SOS_MESSAGE);
    match sos::activate(&st.storage, &user_id, last_known, &NoFix, message) {
        Ok(activation) => {
            let json = serde_json::json!({
                "alert_id": activation.alert_id,
                "latitude": activation.location.latitude,
                "longitude": activation.location.longitude,
                "contact_count": activation.contact_count,
                "confirmation": sos::confirmation_message(&activation),
            });
            (StatusCode::CREATED, axum::Json(json)).into_response()
        }
        Err(e) => storage_error(e),
    }
}

pub async fn cancel_sos_handler(
    State(state): State<SharedState>,
    Path(alert_id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match sos::cancel(&st.storage, alert_id) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({"status": "cancelled", "id": alert_id})),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn list_active_sos_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match sos::list_active(&st.storage, &user_id) {
        Ok(alerts) => {
            let json: Vec<serde_json::Value> = alerts
                .iter()
                .map(|a| {
                    serde_json::json!({
                        "id": a.id,
                        "latitude": a.latitude,
                        "longitude": a.longitude,
                        "message": a.message,
                        "status": a.status,
                        "created_at": a.created_at,
                    })
                })
                .collect();
            (StatusCode::OK, axum::Json(serde_json::json!(json))).into_response()
        }
        Err(e) => storage_error(e),
    }
}
