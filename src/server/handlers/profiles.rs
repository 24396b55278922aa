//! Profile and session handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::identity::{self, AccountInfo};
use crate::server::state::SharedState;
use crate::server::utils::{api_error, storage_error};
use crate::storage::ProfileRow;

fn profile_to_json(p: &ProfileRow) -> serde_json::Value {
    serde_json::json!({
        "id": p.id,
        "email": p.email,
        "display_name": p.display_name,
        "photo_url": p.photo_url,
        "provider": p.provider,
        "tracking_code": p.tracking_code,
        "updated_at": p.updated_at,
    })
}

/// Sign-in sync: upsert the provider's account payload into the local
/// profile table.  Safe to call on every sign-in; never clobbers an
/// existing tracking code.
pub async fn sync_session_handler(
    State(state): State<SharedState>,
    axum::Json(account): axum::Json<AccountInfo>,
) -> Response {
    if account.id.trim().is_empty() {
        return api_error(StatusCode::BAD_REQUEST, "account id cannot be empty");
    }

    let st = state.lock().await;
    match identity::sync_account(&st.storage, &account) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile_to_json(&profile))).into_response(),
        Err(e) => storage_error(e),
    }
}

pub async fn get_profile_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Response {
    let st = state.lock().await;
    match st.storage.get_profile(&user_id) {
        Ok(Some(profile)) => {
            (StatusCode::OK, axum::Json(profile_to_json(&profile))).into_response()
        }
        Ok(None) => api_error(StatusCode::NOT_FOUND, "profile not found"),
        Err(e) => storage_error(e),
    }
}

#[derive(Deserialize)]
pub struct UpdateProfilePayload {
    display_name: Option<String>,
    photo_url: Option<String>,
}

pub async fn update_profile_handler(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
    axum::Json(req): axum::Json<UpdateProfilePayload>,
) -> Response {
    let st = state.lock().await;
    if let Err(e) = st.storage.update_profile_fields(
        &user_id,
        req.display_name.as_deref(),
        req.photo_url.as_deref(),
    ) {
        return storage_error(e);
    }
    match st.storage.get_profile(&user_id) {
        Ok(Some(profile)) => {
            (StatusCode::OK, axum::Json(profile_to_json(&profile))).into_response()
        }
        Ok(None) => api_error(StatusCode::NOT_FOUND, "profile not found"),
        Err(e) => storage_error(e),
    }
}
