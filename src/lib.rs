//! # Analytics Engine Library
//!
//! Exposes the Axum router and the aggregation engine so integration tests
//! can drive an in-process server against any store adapter.

pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod period;
pub mod routes;
pub mod state;
pub mod store;

use axum::{middleware, Extension, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// Build the Axum router with all route modules and middleware.
///
/// Report routes live under `/api/analytics` behind the bearer presence
/// check; `/health` is open. The caller provides the state (and with it the
/// store); this function does not open connections or start a server.
pub fn create_app(state: AppState) -> Router {
    let analytics = Router::new()
        .merge(routes::reports::router())
        .merge(routes::insights::router())
        .layer(middleware::from_fn(routes::auth::require_bearer));

    Router::new()
        .nest("/api/analytics", analytics)
        .merge(routes::health::router())
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
