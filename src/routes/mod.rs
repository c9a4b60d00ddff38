pub mod accounts;
pub mod send;

use axum::Router;
use axum::routing::{get, post, put};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Accounts
        .route(
            "/api/v1/accounts",
            get(accounts::list).post(accounts::create),
        )
        .route("/api/v1/accounts/test", post(accounts::test_inline))
        .route(
            "/api/v1/accounts/{id}",
            put(accounts::update).delete(accounts::deactivate),
        )
        .route("/api/v1/accounts/{id}/default", post(accounts::set_default))
        .route("/api/v1/accounts/{id}/test", post(accounts::test_stored))
        // Provider presets
        .route("/api/v1/providers", get(accounts::list_providers))
        // Dispatch
        .route("/api/v1/send", post(send::send))
}
