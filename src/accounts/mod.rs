pub mod store;

#[cfg(test)]
pub mod memory;

use std::sync::Arc;

use serde::Deserialize;
use uuid::Uuid;

use crate::crypto::Vault;
use crate::error::AppError;
use crate::models::MailAccount;
use store::{AccountChanges, AccountStore, NewAccount};

#[derive(Debug, Deserialize)]
pub struct CreateAccount {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub from_name: Option<String>,
    pub signature: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub secure: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: Option<String>,
    pub signature: Option<String>,
    pub is_default: Option<bool>,
}

/// CRUD over relay accounts. Holds the two rules the storage schema alone
/// cannot express: an owner with any active account has exactly one default,
/// and the last active account cannot be deactivated.
pub struct AccountRegistry {
    store: Arc<dyn AccountStore>,
    vault: Arc<Vault>,
}

impl AccountRegistry {
    pub fn new(store: Arc<dyn AccountStore>, vault: Arc<Vault>) -> Self {
        Self { store, vault }
    }

    pub async fn create(&self, owner: Uuid, req: CreateAccount) -> Result<MailAccount, AppError> {
        if req.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".to_string()));
        }
        if req.host.trim().is_empty() {
            return Err(AppError::Validation("host is required".to_string()));
        }
        if req.port == 0 {
            return Err(AppError::Validation("port must be between 1 and 65535".to_string()));
        }
        if req.username.trim().is_empty() {
            return Err(AppError::Validation("username is required".to_string()));
        }
        if req.password.is_empty() {
            return Err(AppError::Validation("password is required".to_string()));
        }

        let password_enc = self.vault.encrypt(&req.password);

        let account = self
            .store
            .insert(NewAccount {
                owner_id: owner,
                name: req.name,
                host: req.host,
                port: i32::from(req.port),
                secure: req.secure,
                username: req.username,
                password_enc,
                from_name: req.from_name,
                signature: req.signature,
                is_default: req.is_default,
            })
            .await?;

        tracing::info!(account = %account.id, "mail account created");
        Ok(account)
    }

    pub async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        req: UpdateAccount,
    ) -> Result<MailAccount, AppError> {
        if let Some(host) = &req.host {
            if host.trim().is_empty() {
                return Err(AppError::Validation("host cannot be empty".to_string()));
            }
        }
        if req.port == Some(0) {
            return Err(AppError::Validation("port must be between 1 and 65535".to_string()));
        }
        if let Some(username) = &req.username {
            if username.trim().is_empty() {
                return Err(AppError::Validation("username cannot be empty".to_string()));
            }
        }
        if req.password.as_deref() == Some("") {
            return Err(AppError::Validation("password cannot be empty".to_string()));
        }

        let password_enc = req.password.as_deref().map(|p| self.vault.encrypt(p));

        // `is_default: false` is not a direct operation; the default moves by
        // promoting another account.
        let changes = AccountChanges {
            name: req.name,
            host: req.host,
            port: req.port.map(i32::from),
            secure: req.secure,
            username: req.username,
            password_enc,
            from_name: req.from_name,
            signature: req.signature,
            make_default: req.is_default == Some(true),
        };

        self.store
            .update(owner, id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }

    pub async fn set_default(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        if self.store.set_default(owner, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound("Account not found".to_string()))
        }
    }

    pub async fn deactivate(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        self.store.deactivate(owner, id).await?;
        tracing::info!(account = %id, "mail account deactivated");
        Ok(())
    }

    pub async fn list(&self, owner: Uuid) -> Result<Vec<MailAccount>, AppError> {
        self.store.find_active_by_owner(owner).await
    }

    pub async fn get(&self, owner: Uuid, id: Uuid) -> Result<MailAccount, AppError> {
        self.store
            .find_by_id(owner, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))
    }
}
