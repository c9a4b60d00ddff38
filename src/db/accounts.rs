use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::accounts::store::{AccountChanges, AccountStore, NewAccount};
use crate::error::AppError;
use crate::models::MailAccount;

/// Postgres-backed account store. Every operation that can change which
/// account is the default runs inside a transaction; a partial unique index
/// on `(owner_id) WHERE is_default AND is_active` backs the invariant up at
/// the schema level.
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_active_by_owner(&self, owner: Uuid) -> Result<Vec<MailAccount>, AppError> {
        let accounts = sqlx::query_as::<_, MailAccount>(
            "SELECT * FROM mail_accounts WHERE owner_id = $1 AND is_active
             ORDER BY is_default DESC, created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    async fn find_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<MailAccount>, AppError> {
        let account = sqlx::query_as::<_, MailAccount>(
            "SELECT * FROM mail_accounts WHERE id = $1 AND owner_id = $2 AND is_active",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_default_by_owner(&self, owner: Uuid) -> Result<Option<MailAccount>, AppError> {
        let account = sqlx::query_as::<_, MailAccount>(
            "SELECT * FROM mail_accounts WHERE owner_id = $1 AND is_active AND is_default",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn find_oldest_active(&self, owner: Uuid) -> Result<Option<MailAccount>, AppError> {
        let account = sqlx::query_as::<_, MailAccount>(
            "SELECT * FROM mail_accounts WHERE owner_id = $1 AND is_active
             ORDER BY created_at ASC LIMIT 1",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn insert(&self, new: NewAccount) -> Result<MailAccount, AppError> {
        let mut tx = self.pool.begin().await?;

        if new.is_default {
            sqlx::query(
                "UPDATE mail_accounts SET is_default = false, updated_at = now()
                 WHERE owner_id = $1 AND is_active AND is_default",
            )
            .bind(new.owner_id)
            .execute(&mut *tx)
            .await?;
        }

        // An owner's first active account is always the default, whatever the
        // caller asked for.
        let account = sqlx::query_as::<_, MailAccount>(
            "INSERT INTO mail_accounts
                (id, owner_id, name, host, port, secure, username, password_enc,
                 from_name, signature, is_default)
             SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11 OR NOT EXISTS
                        (SELECT 1 FROM mail_accounts WHERE owner_id = $2 AND is_active)
             RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(new.owner_id)
        .bind(&new.name)
        .bind(&new.host)
        .bind(new.port)
        .bind(new.secure)
        .bind(&new.username)
        .bind(&new.password_enc)
        .bind(&new.from_name)
        .bind(&new.signature)
        .bind(new.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(account)
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<MailAccount>, AppError> {
        let mut tx = self.pool.begin().await?;

        if changes.make_default {
            sqlx::query(
                "UPDATE mail_accounts SET is_default = false, updated_at = now()
                 WHERE owner_id = $1 AND is_active AND is_default AND id <> $2",
            )
            .bind(owner)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let account = sqlx::query_as::<_, MailAccount>(
            "UPDATE mail_accounts SET
                name = COALESCE($3, name),
                host = COALESCE($4, host),
                port = COALESCE($5, port),
                secure = COALESCE($6, secure),
                username = COALESCE($7, username),
                password_enc = COALESCE($8, password_enc),
                from_name = COALESCE($9, from_name),
                signature = COALESCE($10, signature),
                is_default = is_default OR $11,
                updated_at = now()
             WHERE id = $1 AND owner_id = $2 AND is_active
             RETURNING *",
        )
        .bind(id)
        .bind(owner)
        .bind(&changes.name)
        .bind(&changes.host)
        .bind(changes.port)
        .bind(changes.secure)
        .bind(&changes.username)
        .bind(&changes.password_enc)
        .bind(&changes.from_name)
        .bind(&changes.signature)
        .bind(changes.make_default)
        .fetch_optional(&mut *tx)
        .await?;

        // Target didn't resolve: roll back so the demotion above never lands.
        if account.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(account)
    }

    async fn set_default(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let target = sqlx::query_as::<_, MailAccount>(
            "SELECT * FROM mail_accounts WHERE id = $1 AND owner_id = $2 AND is_active
             FOR UPDATE",
        )
        .bind(id)
        .bind(owner)
        .fetch_optional(&mut *tx)
        .await?;

        if target.is_none() {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE mail_accounts SET is_default = false, updated_at = now()
             WHERE owner_id = $2 AND is_active AND is_default AND id <> $1",
        )
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE mail_accounts SET is_default = true, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn deactivate(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        // Lock the owner's active set so racing deactivations serialize and
        // the last-account check holds at commit time.
        let active = sqlx::query_as::<_, MailAccount>(
            "SELECT * FROM mail_accounts WHERE owner_id = $1 AND is_active
             ORDER BY created_at ASC
             FOR UPDATE",
        )
        .bind(owner)
        .fetch_all(&mut *tx)
        .await?;

        let Some(target) = active.iter().find(|a| a.id == id) else {
            return Err(AppError::NotFound("Account not found".to_string()));
        };

        if active.len() == 1 {
            return Err(AppError::Conflict(
                "Cannot deactivate the only active account".to_string(),
            ));
        }

        let was_default = target.is_default;

        sqlx::query(
            "UPDATE mail_accounts SET is_active = false, is_default = false, updated_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        // `active` is ordered by creation time, so the first survivor is the
        // deterministic replacement.
        if was_default {
            if let Some(heir) = active.iter().find(|a| a.id != id) {
                sqlx::query(
                    "UPDATE mail_accounts SET is_default = true, updated_at = now()
                     WHERE id = $1",
                )
                .bind(heir.id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
