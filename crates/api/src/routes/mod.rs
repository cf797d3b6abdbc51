//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};
use ledgerly_core::accounts::LedgerDirection;

pub mod accounts;
pub mod health;

/// Creates the API router; every ledger route sits behind the auth middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let protected_routes = LedgerDirection::ALL
        .into_iter()
        .fold(Router::new(), |router, direction| {
            router.merge(accounts::routes(direction))
        })
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
