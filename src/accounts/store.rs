use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::MailAccount;

/// Insert payload. The secret arrives already encrypted; the store never sees
/// plaintext.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub owner_id: Uuid,
    pub name: String,
    pub host: String,
    pub port: i32,
    pub secure: bool,
    pub username: String,
    pub password_enc: String,
    pub from_name: Option<String>,
    pub signature: Option<String>,
    pub is_default: bool,
}

/// Partial update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<i32>,
    pub secure: Option<bool>,
    pub username: Option<String>,
    pub password_enc: Option<String>,
    pub from_name: Option<String>,
    pub signature: Option<String>,
    pub make_default: bool,
}

/// Narrow repository interface over durable account storage. The registry
/// enforces its invariants through these primitives, so the operations that
/// touch the default flag must be atomic: no reader may observe an owner with
/// zero or two defaults among active accounts.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Active accounts for an owner, default first, then newest first.
    async fn find_active_by_owner(&self, owner: Uuid) -> Result<Vec<MailAccount>, AppError>;

    /// Owner-scoped lookup; inactive accounts do not resolve.
    async fn find_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<MailAccount>, AppError>;

    async fn find_default_by_owner(&self, owner: Uuid) -> Result<Option<MailAccount>, AppError>;

    /// Oldest active account by creation time; the stable tie-break used for
    /// both resolution and default promotion.
    async fn find_oldest_active(&self, owner: Uuid) -> Result<Option<MailAccount>, AppError>;

    /// Insert a new active account. When `is_default` is set, other defaults
    /// are cleared in the same unit of work. An owner's first active account
    /// becomes default regardless of the flag.
    async fn insert(&self, new: NewAccount) -> Result<MailAccount, AppError>;

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<MailAccount>, AppError>;

    /// Demote every other active account and promote the target as one unit.
    /// Returns `false` when the id does not resolve for this owner.
    async fn set_default(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError>;

    /// Soft-deactivate. Fails with a conflict when the target is the
    /// owner's only active account; promotes the oldest remaining active
    /// account when the target was the default. All in one unit of work.
    async fn deactivate(&self, owner: Uuid, id: Uuid) -> Result<(), AppError>;
}
