//! Commute catalog, route planning, geocoding, and route history handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::geo::{self, Point};
use crate::routes::{self, RoutingError, NOMINATIM_BASE_URL, OSRM_BASE_URL};
use crate::server::config::ROUTE_HISTORY_LIMIT;
use crate::server::state::SharedState;
use crate::server::utils::{api_error, storage_error};

fn routing_error(err: RoutingError) -> Response {
    match err {
        RoutingError::NoRoute => api_error(StatusCode::NOT_FOUND, "no route found"),
        RoutingError::Remote(_) => api_error(StatusCode::BAD_GATEWAY, err.to_string()),
        RoutingError::Malformed(_) => api_error(StatusCode::BAD_GATEWAY, err.to_string()),
    }
}

pub async fn catalog_handler() -> Response {
    (StatusCode::OK, axum::Json(serde_json::json!(routes::route_catalog()))).into_response()
}

#[derive(Deserialize)]
pub struct PlanQuery {
    from_lat: f64,
    from_lng: f64,
    to_lat: f64,
    to_lng: f64,
}

pub async fn plan_route_handler(Query(q): Query<PlanQuery>) -> Response {
    let origin = Point::new(q.from_lat, q.from_lng);
    let dest = Point::new(q.to_lat, q.to_lng);
    for p in [&origin, &dest] {
        if let Err(msg) = geo::validate_point(p) {
            return api_error(StatusCode::BAD_REQUEST, msg);
        }
    }

    // Outbound HTTP is blocking; keep it off the async executor threads.
    let plan = tokio::task::spawn_blocking(move || {
        routes::plan_route(OSRM_BASE_URL, origin, dest)
    })
    .await;

    match plan {
        Ok(Ok(plan)) => (StatusCode::OK, axum::Json(serde_json::json!(plan))).into_response(),
        Ok(Err(e)) => routing_error(e),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: String,
}

pub async fn search_places_handler(Query(query): Query<SearchQuery>) -> Response {
    if query.q.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "q cannot be empty");
    }

    let result = tokio::task::spawn_blocking(move || {
        routes::search_places(NOMINATIM_BASE_URL, query.q.trim())
    })
    .await;

    match result {
        Ok(Ok(places)) => (StatusCode::OK, axum::Json(serde_json::json!(places))).into_response(),
        Ok(Err(e)) => routing_error(e),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct ReverseQuery {
    lat: f64,
    lng: f64,
}

pub async fn reverse_geocode_handler(Query(q): Query<ReverseQuery>) -> Response {
    let point = Point::new(q.lat, q.lng);
    if let Err(msg) = geo::validate_point(&point) {
        return api_error(StatusCode::BAD_REQUEST, msg);
    }

    let result = tokio::task::spawn_blocking(move || {
        routes::reverse_geocode(NOMINATIM_BASE_URL, point)
    })
    .await;

    match result {
        Ok(Ok(Some(place))) => {
            (StatusCode::OK, axum::Json(serde_json::json!(place))).into_response()
        }
        Ok(Ok(None)) => api_error(StatusCode::NOT_FOUND, "no address at that point"),
        Ok(Err(e)) => routing_error(e),
        Err(e) => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

#[derive(Deserialize)]
pub struct SaveRoutePayload {
    origin: String,
    destination: String,
    route_data: Option<serde_json::Value>,
}

pub async fn save_route_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    axum::Json(req): axum::Json<SaveRoutePayload>,
) -> Response {
    if req.origin.trim().is_empty() || req.destination.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "origin and destination are required");
    }

    let st = state.lock().await;
    match st.storage.insert_route_history(
        &user_id,
        req.origin.trim(),
        req.destination.trim(),
        req.route_data.as_ref(),
    ) {
        Ok(id) => (
            StatusCode::CREATED,
            axum::Json(serde_json::json!({"id": id})),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn route_history_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match st.storage.list_route_history(&user_id, ROUTE_HISTORY_LIMIT) {
        Ok(rows) => {
            let json: Vec<serde_json::Value> = rows
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "origin": r.origin,
                        "destination": r.destination,
                        "route_data": r.route_data,
                        "created_at": r.created_at,
                    })
                })
                .collect();
            (StatusCode::OK, axum::Json(serde_json::json!(json))).into_response()
        }
        Err(e) => storage_error(e),
    }
}

pub async fn delete_route_handler(
    State(state): State<SharedState>,
    Path(route_id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_route_history(route_id) {
        Ok(true) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({"status": "deleted", "id": route_id})),
        )
            .into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, "route not found"),
        Err(e) => storage_error(e),
    }
}
