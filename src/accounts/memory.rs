//! In-memory `AccountStore` used by the registry unit tests. Mirrors the
//! Postgres implementation's semantics, including first-account-default and
//! promotion ordering, with a monotonic clock so creation order is stable.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use uuid::Uuid;

use super::store::{AccountChanges, AccountStore, NewAccount};
use crate::error::AppError;
use crate::models::MailAccount;

pub struct MemoryAccountStore {
    accounts: Mutex<Vec<MailAccount>>,
    seq: AtomicI64,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(Vec::new()),
            seq: AtomicI64::new(0),
        }
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_active_by_owner(&self, owner: Uuid) -> Result<Vec<MailAccount>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        let mut active: Vec<MailAccount> = accounts
            .iter()
            .filter(|a| a.owner_id == owner && a.is_active)
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(active)
    }

    async fn find_by_id(&self, owner: Uuid, id: Uuid) -> Result<Option<MailAccount>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .find(|a| a.id == id && a.owner_id == owner && a.is_active)
            .cloned())
    }

    async fn find_default_by_owner(&self, owner: Uuid) -> Result<Option<MailAccount>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .find(|a| a.owner_id == owner && a.is_active && a.is_default)
            .cloned())
    }

    async fn find_oldest_active(&self, owner: Uuid) -> Result<Option<MailAccount>, AppError> {
        let accounts = self.accounts.lock().unwrap();
        Ok(accounts
            .iter()
            .filter(|a| a.owner_id == owner && a.is_active)
            .min_by_key(|a| a.created_at)
            .cloned())
    }

    async fn insert(&self, new: NewAccount) -> Result<MailAccount, AppError> {
        let mut accounts = self.accounts.lock().unwrap();

        let has_active = accounts
            .iter()
            .any(|a| a.owner_id == new.owner_id && a.is_active);
        let is_default = new.is_default || !has_active;

        if is_default {
            for a in accounts
                .iter_mut()
                .filter(|a| a.owner_id == new.owner_id && a.is_active)
            {
                a.is_default = false;
            }
        }

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let created_at = Utc::now() + TimeDelta::milliseconds(seq);

        let account = MailAccount {
            id: Uuid::now_v7(),
            owner_id: new.owner_id,
            name: new.name,
            host: new.host,
            port: new.port,
            secure: new.secure,
            username: new.username,
            password_enc: new.password_enc,
            from_name: new.from_name,
            signature: new.signature,
            is_default,
            is_active: true,
            created_at,
            updated_at: created_at,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn update(
        &self,
        owner: Uuid,
        id: Uuid,
        changes: AccountChanges,
    ) -> Result<Option<MailAccount>, AppError> {
        let mut accounts = self.accounts.lock().unwrap();

        if !accounts
            .iter()
            .any(|a| a.id == id && a.owner_id == owner && a.is_active)
        {
            return Ok(None);
        }

        if changes.make_default {
            for a in accounts
                .iter_mut()
                .filter(|a| a.owner_id == owner && a.is_active && a.id != id)
            {
                a.is_default = false;
            }
        }

        let account = accounts
            .iter_mut()
            .find(|a| a.id == id && a.owner_id == owner && a.is_active)
            .map(|a| {
                if let Some(name) = changes.name {
                    a.name = name;
                }
                if let Some(host) = changes.host {
                    a.host = host;
                }
                if let Some(port) = changes.port {
                    a.port = port;
                }
                if let Some(secure) = changes.secure {
                    a.secure = secure;
                }
                if let Some(username) = changes.username {
                    a.username = username;
                }
                if let Some(password_enc) = changes.password_enc {
                    a.password_enc = password_enc;
                }
                if let Some(from_name) = changes.from_name {
                    a.from_name = Some(from_name);
                }
                if let Some(signature) = changes.signature {
                    a.signature = Some(signature);
                }
                if changes.make_default {
                    a.is_default = true;
                }
                a.updated_at = Utc::now();
                a.clone()
            });

        Ok(account)
    }

    async fn set_default(&self, owner: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut accounts = self.accounts.lock().unwrap();

        if !accounts
            .iter()
            .any(|a| a.id == id && a.owner_id == owner && a.is_active)
        {
            return Ok(false);
        }

        for a in accounts
            .iter_mut()
            .filter(|a| a.owner_id == owner && a.is_active)
        {
            a.is_default = a.id == id;
            a.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn deactivate(&self, owner: Uuid, id: Uuid) -> Result<(), AppError> {
        let mut accounts = self.accounts.lock().unwrap();

        let mut active: Vec<Uuid> = accounts
            .iter()
            .filter(|a| a.owner_id == owner && a.is_active)
            .map(|a| a.id)
            .collect();
        active.sort_by_key(|target| {
            accounts
                .iter()
                .find(|a| a.id == *target)
                .map(|a| a.created_at)
        });

        if !active.contains(&id) {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        if active.len() == 1 {
            return Err(AppError::Conflict(
                "Cannot deactivate the only active account".to_string(),
            ));
        }

        let was_default = accounts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.is_default)
            .unwrap_or(false);

        if let Some(target) = accounts.iter_mut().find(|a| a.id == id) {
            target.is_active = false;
            target.is_default = false;
            target.updated_at = Utc::now();
        }

        if was_default {
            if let Some(heir_id) = active.iter().find(|x| **x != id) {
                if let Some(heir) = accounts.iter_mut().find(|a| a.id == *heir_id) {
                    heir.is_default = true;
                    heir.updated_at = Utc::now();
                }
            }
        }

        Ok(())
    }
}
