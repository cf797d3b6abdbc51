//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - Accounts payable and receivable routes over one ledger engine
//! - Bearer token authentication middleware
//! - Error to JSON response mapping

pub mod error;
pub mod middleware;
pub mod routes;

use axum::Router;
use ledgerly_db::LedgerRepository;
use ledgerly_shared::JwtService;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger record store.
    pub ledger: LedgerRepository,
    /// JWT service for token validation.
    pub jwt_service: Arc<JwtService>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
