use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use uuid::Uuid;

use crate::accounts::{CreateAccount, UpdateAccount};
use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::models::MailAccount;
use crate::providers::{PROVIDERS, Provider};
use crate::resolver::ResolvedSmtp;
use crate::state::SharedState;

#[derive(Deserialize)]
pub struct InlineTestRequest {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    pub username: String,
    pub password: String,
}

pub async fn list(
    auth: CallerIdentity,
    State(state): State<SharedState>,
) -> Result<Json<Vec<MailAccount>>, AppError> {
    let accounts = state.registry.list(auth.user_id).await?;
    Ok(Json(accounts))
}

pub async fn create(
    auth: CallerIdentity,
    State(state): State<SharedState>,
    Json(req): Json<CreateAccount>,
) -> Result<Json<MailAccount>, AppError> {
    let account = state.registry.create(auth.user_id, req).await?;
    Ok(Json(account))
}

pub async fn update(
    auth: CallerIdentity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAccount>,
) -> Result<Json<MailAccount>, AppError> {
    let account = state.registry.update(auth.user_id, id, req).await?;
    Ok(Json(account))
}

pub async fn set_default(
    auth: CallerIdentity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.registry.set_default(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({ "message": "Default account updated" })))
}

pub async fn deactivate(
    auth: CallerIdentity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.registry.deactivate(auth.user_id, id).await?;
    Ok(Json(serde_json::json!({ "message": "Account deactivated" })))
}

/// Handshake check against a stored account; nothing is sent.
pub async fn test_stored(
    auth: CallerIdentity,
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let config = state.resolver.resolve(auth.user_id, Some(id)).await?;
    let result = state.engine.verify(&config).await;
    Ok(Json(serde_json::json!({
        "success": result.success,
        "message": result.message,
    })))
}

/// Handshake check against an inline config, for pre-save validation.
pub async fn test_inline(
    _auth: CallerIdentity,
    State(state): State<SharedState>,
    Json(req): Json<InlineTestRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.host.trim().is_empty() {
        return Err(AppError::Validation("host is required".to_string()));
    }
    if req.port == 0 {
        return Err(AppError::Validation("port must be between 1 and 65535".to_string()));
    }

    let config = ResolvedSmtp {
        host: req.host,
        port: req.port,
        secure: req.secure,
        username: req.username,
        password: req.password,
        from_name: None,
    };

    let result = state.engine.verify(&config).await;
    Ok(Json(serde_json::json!({
        "success": result.success,
        "message": result.message,
    })))
}

pub async fn list_providers(_auth: CallerIdentity) -> Json<&'static [Provider]> {
    Json(PROVIDERS)
}
