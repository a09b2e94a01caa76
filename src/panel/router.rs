//! Axum router for the panel.

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::panel::handlers;
use crate::panel::state::PanelState;

/// Build the panel router: the page at `/` and the JSON API under `/api`.
pub fn build_router(state: PanelState) -> Router {
    let api_routes = Router::new()
        .route("/models", get(handlers::list_models))
        .route("/personas", get(handlers::list_personas))
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/{id}/messages", post(handlers::send_message))
        .route("/sessions/{id}/save", post(handlers::save_session));

    Router::new()
        .route("/", get(handlers::index))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
