pub mod health;
pub mod profile;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::generation::handlers as generation;
use crate::history::handlers as history;
use crate::state::AppState;
use crate::surfaces;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Cross-surface messages
        .route(
            "/api/v1/messages/generate",
            post(generation::handle_generate),
        )
        .route("/api/v1/messages/cancel", post(generation::handle_cancel))
        .route("/api/v1/messages/status", get(generation::handle_status))
        .route(
            "/api/v1/messages/check-history",
            post(history::handle_check_history),
        )
        .route(
            "/api/v1/messages/page-visit",
            post(history::handle_page_visit),
        )
        // Push channel (pushIndicator)
        .route("/api/v1/events", get(surfaces::events_handler))
        // History surface
        .route("/api/v1/history", get(history::handle_list))
        .route("/api/v1/history", delete(history::handle_clear))
        .route(
            "/api/v1/history/:display_index",
            delete(history::handle_delete),
        )
        .route("/api/v1/history/import", post(history::handle_import))
        // Settings surface
        .route("/api/v1/profile", get(profile::get_profile))
        .route("/api/v1/profile", put(profile::put_profile))
        .route("/api/v1/settings", get(profile::get_settings))
        .route("/api/v1/settings", put(profile::put_settings))
        .with_state(state)
}
