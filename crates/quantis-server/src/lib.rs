//! Quantis HTTP API server.
//!
//! Exposes `quantis-core`'s session orchestrator as a small REST API:
//! `/plan_next`, `/pack`, `/mark_served`, `/submit_attempt`,
//! `/complete_session`, plus a health check. Local bearer-token auth guards
//! every route except `/health`.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete axum router with all API routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health::health))
        .route("/plan_next", post(routes::plan::plan_next))
        .route("/pack", get(routes::plan::get_pack_route))
        .route("/mark_served", post(routes::plan::mark_served))
        .route("/submit_attempt", post(routes::plan::submit_attempt))
        .route("/complete_session", post(routes::plan::complete_session))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .nest("/api", api)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
