use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named relay configuration owned by one caller. Never hard-deleted;
/// `is_active = false` is the terminal state so prior dispatch history keeps
/// its references.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MailAccount {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub secure: bool,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_enc: String,
    pub from_name: Option<String>,
    pub signature: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
