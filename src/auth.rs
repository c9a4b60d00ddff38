use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;

/// The opaque caller identity this core trusts. Session issuance lives in the
/// fronting gateway, which verifies the session and forwards the owner id and
/// display name as headers.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub display_name: Option<String>,
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<Uuid>().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing caller identity".to_string()))?;

        let display_name = parts
            .headers
            .get("x-user-name")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .filter(|v| !v.is_empty());

        Ok(CallerIdentity {
            user_id,
            display_name,
        })
    }
}
