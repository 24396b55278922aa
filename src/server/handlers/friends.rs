//! Tracking-code and friend registry handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::friends::{self, FriendError};
use crate::server::state::SharedState;
use crate::server::utils::{api_error, storage_error};

fn friend_error(err: FriendError) -> Response {
    match err {
        FriendError::CodeNotFound => {
            api_error(StatusCode::NOT_FOUND, "no user found with that code")
        }
        FriendError::SelfAdd => api_error(StatusCode::BAD_REQUEST, "you can't add yourself"),
        FriendError::AlreadyTracking => {
            api_error(StatusCode::CONFLICT, "already tracking this friend")
        }
        FriendError::CodeExhausted => api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "could not allocate a tracking code",
        ),
        FriendError::Storage(e) => storage_error(e),
    }
}

/// Get (lazily creating) the caller's shareable tracking code.
pub async fn tracking_code_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match friends::get_or_create_tracking_code(&st.storage, &user_id) {
        Ok(code) => {
            (StatusCode::OK, axum::Json(serde_json::json!({ "tracking_code": code })))
                .into_response()
        }
        Err(e) => friend_error(e),
    }
}

#[derive(Deserialize)]
pub struct AddFriendPayload {
    code: String,
}

pub async fn add_friend_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    axum::Json(req): axum::Json<AddFriendPayload>,
) -> Response {
    if req.code.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "code cannot be empty");
    }

    let st = state.lock().await;
    match friends::add_friend_by_code(&st.storage, &user_id, &req.code) {
        Ok(added) => {
            let json = serde_json::json!({
                "message": added.message,
                "friend": {
                    "id": added.friend.id,
                    "email": added.friend.email,
                    "display_name": added.friend.display_name,
                    "photo_url": added.friend.photo_url,
                },
            });
            (StatusCode::CREATED, axum::Json(json)).into_response()
        }
        Err(e) => friend_error(e),
    }
}

pub async fn list_friends_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match friends::get_friends(&st.storage, &user_id) {
        Ok(entries) => {
            let json: Vec<serde_json::Value> = entries
                .iter()
                .map(|f| {
                    serde_json::json!({
                        "friendship_id": f.friendship_id,
                        "added_at": f.added_at,
                        "id": f.id,
                        "email": f.email,
                        "display_name": f.display_name,
                        "photo_url": f.photo_url,
                    })
                })
                .collect();
            (StatusCode::OK, axum::Json(serde_json::json!(json))).into_response()
        }
        Err(e) => friend_error(e),
    }
}

/// Remove the caller's edge to a friend and stop that friend from seeing
/// the caller.  The friend's own edge (and the caller's view of them) is
/// untouched until the friend removes it from their side.
pub async fn remove_friend_handler(
    State(state): State<SharedState>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Response {
    let st = state.lock().await;
    if let Err(e) = friends::remove_friend(&st.storage, &user_id, &friend_id) {
        return friend_error(e);
    }
    if let Err(e) = friends::revoke_visibility(&st.storage, &user_id, &friend_id) {
        return friend_error(e);
    }
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({"status": "removed", "friend_id": friend_id})),
    )
        .into_response()
}
