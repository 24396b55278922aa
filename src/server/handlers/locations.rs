//! Location sharing handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::geo::{self, Point};
use crate::server::state::SharedState;
use crate::server::utils::{api_error, storage_error};
use crate::storage::now_secs;
use crate::{sharing, sync};

#[derive(Deserialize)]
pub struct UpdateLocationPayload {
    latitude: f64,
    longitude: f64,
}

pub async fn update_location_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    axum::Json(req): axum::Json<UpdateLocationPayload>,
) -> Response {
    let point = Point::new(req.latitude, req.longitude);
    if let Err(msg) = geo::validate_point(&point) {
        return api_error(StatusCode::BAD_REQUEST, msg);
    }

    let st = state.lock().await;
    match sharing::update_own_location(&st.storage, &user_id, req.latitude, req.longitude) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "status": "updated",
                "inside_campus": geo::is_inside_campus(point),
            })),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

/// The caller's renderable roster: friends joined to the location rows
/// they are allowed to read.
pub async fn roster_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;

    let friends = match st.storage.list_friends(&user_id) {
        Ok(f) => f,
        Err(e) => return storage_error(e),
    };
    let locations = match sharing::fetch_visible_to(&st.storage, &user_id) {
        Ok(l) => l,
        Err(e) => return storage_error(e),
    };

    let view = sync::reconcile(&friends, &locations, now_secs());
    let located: Vec<serde_json::Value> = view
        .located
        .iter()
        .map(|m| {
            serde_json::json!({
                "user_id": m.user_id,
                "title": m.title,
                "latitude": m.latitude,
                "longitude": m.longitude,
                "last_seen": m.last_seen,
                "photo_url": m.photo_url,
                "inside_campus": geo::is_inside_campus(Point::new(m.latitude, m.longitude)),
            })
        })
        .collect();

    let json = serde_json::json!({
        "located": located,
        "waiting": view.waiting,
        "poll_interval_ms": sync::MAP_POLL_INTERVAL.as_millis() as u64,
    });
    (StatusCode::OK, axum::Json(json)).into_response()
}

/// Revoke a single viewer's visibility without touching the friend edge.
pub async fn stop_sharing_handler(
    State(state): State<SharedState>,
    Path((user_id, viewer_id)): Path<(String, String)>,
) -> Response {
    let st = state.lock().await;
    match sharing::stop_sharing_with(&st.storage, &user_id, &viewer_id) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({"status": "revoked", "viewer_id": viewer_id})),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}
