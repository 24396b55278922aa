//! Axum router construction.

use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::server::handlers;
use crate::server::state::SharedState;

/// Build the complete Axum router with all API routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(handlers::health::health_handler))
        // Session / profiles
        .route("/api/session", post(handlers::profiles::sync_session_handler))
        .route(
            "/api/profiles/:user_id",
            get(handlers::profiles::get_profile_handler)
                .put(handlers::profiles::update_profile_handler),
        )
        // Tracking code + friends
        .route(
            "/api/users/:user_id/tracking-code",
            get(handlers::friends::tracking_code_handler),
        )
        .route(
            "/api/users/:user_id/friends",
            get(handlers::friends::list_friends_handler)
                .post(handlers::friends::add_friend_handler),
        )
        .route(
            "/api/users/:user_id/friends/:friend_id",
            delete(handlers::friends::remove_friend_handler),
        )
        // Location sharing
        .route(
            "/api/users/:user_id/location",
            put(handlers::locations::update_location_handler),
        )
        .route(
            "/api/users/:user_id/roster",
            get(handlers::locations::roster_handler),
        )
        .route(
            "/api/users/:user_id/shares/:viewer_id",
            delete(handlers::locations::stop_sharing_handler),
        )
        // Emergency contacts
        .route(
            "/api/users/:user_id/contacts",
            get(handlers::contacts::list_contacts_handler)
                .post(handlers::contacts::add_contact_handler),
        )
        .route(
            "/api/contacts/:contact_id",
            put(handlers::contacts::update_contact_handler)
                .delete(handlers::contacts::delete_contact_handler),
        )
        // SOS
        .route(
            "/api/users/:user_id/sos",
            get(handlers::sos::list_active_sos_handler).post(handlers::sos::activate_sos_handler),
        )
        .route(
            "/api/sos/:alert_id/cancel",
            post(handlers::sos::cancel_sos_handler),
        )
        // Commute
        .route("/api/commute/routes", get(handlers::routes::catalog_handler))
        .route("/api/commute/plan", get(handlers::routes::plan_route_handler))
        .route(
            "/api/places/search",
            get(handlers::routes::search_places_handler),
        )
        .route(
            "/api/places/reverse",
            get(handlers::routes::reverse_geocode_handler),
        )
        .route(
            "/api/users/:user_id/route-history",
            get(handlers::routes::route_history_handler)
                .post(handlers::routes::save_route_handler),
        )
        .route(
            "/api/route-history/:route_id",
            delete(handlers::routes::delete_route_handler),
        )
        // Usage events
        .route("/api/events", post(handlers::events::record_event_handler))
        .with_state(state)
}
