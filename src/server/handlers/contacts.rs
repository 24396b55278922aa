//! Emergency contact handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::server::state::SharedState;
use crate::server::utils::{api_error, storage_error};

#[derive(Deserialize)]
pub struct ContactPayload {
    name: String,
    phone: String,
    relationship: Option<String>,
}

pub async fn add_contact_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    axum::Json(req): axum::Json<ContactPayload>,
) -> Response {
    if req.name.trim().is_empty() || req.phone.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "name and phone are required");
    }

    let st = state.lock().await;
    match st.storage.insert_contact(
        &user_id,
        req.name.trim(),
        req.phone.trim(),
        req.relationship.as_deref(),
    ) {
        Ok(id) => (
            StatusCode::CREATED,
            axum::Json(serde_json::json!({"id": id})),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn list_contacts_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match st.storage.list_contacts(&user_id) {
        Ok(contacts) => {
            let json: Vec<serde_json::Value> = contacts
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.id,
                        "name": c.name,
                        "phone": c.phone,
                        "relationship": c.relationship,
                        "created_at": c.created_at,
                    })
                })
                .collect();
            (StatusCode::OK, axum::Json(serde_json::json!(json))).into_response()
        }
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct UpdateContactPayload {
    name: Option<String>,
    phone: Option<String>,
    relationship: Option<String>,
}

pub async fn update_contact_handler(
    State(state): State<SharedState>,
    Path(contact_id): Path<i64>,
    axum::Json(req): axum::Json<UpdateContactPayload>,
) -> Response {
    let st = state.lock().await;
    match st.storage.update_contact(
        contact_id,
        req.name.as_deref(),
        req.phone.as_deref(),
        req.relationship.as_deref(),
    ) {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({"status": "updated", "id": contact_id})),
        )
            .into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn delete_contact_handler(
    State(state): State<SharedState>,
    Path(contact_id): Path<i64>,
) -> Response {
    let st = state.lock().await;
    match st.storage.delete_contact(contact_id) {
        Ok(true) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({"status": "deleted", "id": contact_id})),
        )
            .into_response(),
        Ok(false) => api_error(StatusCode::NOT_FOUND, "contact not found"),
        Err(e) => storage_error(e),
    }
}
