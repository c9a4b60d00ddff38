pub mod accounts;
pub mod attachments;
pub mod auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod providers;
pub mod resolver;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue};
use sqlx::PgPool;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::accounts::AccountRegistry;
use crate::accounts::store::AccountStore;
use crate::attachments::AttachmentStager;
use crate::config::Config;
use crate::crypto::Vault;
use crate::db::PgAccountStore;
use crate::dispatch::DispatchEngine;
use crate::resolver::ConfigResolver;
use crate::state::{AppState, SharedState};

pub fn build_app(pool: PgPool, config: Config) -> Router {
    // Key stretching happens once, here; the vault is read-only afterwards.
    let vault = Arc::new(Vault::new(&config.master_key));
    let store: Arc<dyn AccountStore> = Arc::new(PgAccountStore::new(pool.clone()));

    let registry = AccountRegistry::new(store.clone(), vault.clone());
    let resolver = ConfigResolver::new(store, vault, config.fallback_smtp.clone());
    let stager = AttachmentStager::new(
        config.attachment_dir.clone(),
        config.max_attachment_size,
    );
    let engine = DispatchEngine::new(Duration::from_secs(config.send_timeout_secs));

    if config.fallback_smtp.is_some() {
        tracing::info!("Fallback relay configured");
    }

    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        pool,
        config,
        registry,
        resolver,
        stager,
        engine,
    });

    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-content-type-options"),
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
