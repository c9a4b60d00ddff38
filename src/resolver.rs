use std::sync::Arc;

use uuid::Uuid;

use crate::accounts::store::AccountStore;
use crate::config::FallbackSmtp;
use crate::crypto::Vault;
use crate::error::AppError;
use crate::models::MailAccount;

/// A relay configuration ready to hand to the dispatch engine. The secret is
/// plaintext here and nowhere else; it lives only for the duration of the
/// send or verify call.
#[derive(Clone)]
pub struct ResolvedSmtp {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    pub username: String,
    pub password: String,
    pub from_name: Option<String>,
}

impl std::fmt::Debug for ResolvedSmtp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSmtp")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// Picks the account a send request should go through: explicit id, else the
/// owner's default, else the owner's oldest active account, else the
/// process-wide fallback relay from deployment configuration.
pub struct ConfigResolver {
    store: Arc<dyn AccountStore>,
    vault: Arc<Vault>,
    fallback: Option<FallbackSmtp>,
}

impl ConfigResolver {
    pub fn new(
        store: Arc<dyn AccountStore>,
        vault: Arc<Vault>,
        fallback: Option<FallbackSmtp>,
    ) -> Self {
        Self {
            store,
            vault,
            fallback,
        }
    }

    pub async fn resolve(
        &self,
        owner: Uuid,
        explicit: Option<Uuid>,
    ) -> Result<ResolvedSmtp, AppError> {
        if let Some(id) = explicit {
            let account = self
                .store
                .find_by_id(owner, id)
                .await?
                .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;
            return self.from_account(account);
        }

        if let Some(account) = self.store.find_default_by_owner(owner).await? {
            return self.from_account(account);
        }

        if let Some(account) = self.store.find_oldest_active(owner).await? {
            return self.from_account(account);
        }

        match &self.fallback {
            Some(f) => Ok(ResolvedSmtp {
                host: f.host.clone(),
                port: f.port,
                secure: f.secure,
                username: f.username.clone(),
                password: f.password.clone(),
                from_name: None,
            }),
            None => Err(AppError::NotFound(
                "No mail account configured".to_string(),
            )),
        }
    }

    fn from_account(&self, account: MailAccount) -> Result<ResolvedSmtp, AppError> {
        let password = self.vault.decrypt(&account.password_enc)?;
        let port = u16::try_from(account.port)
            .map_err(|_| AppError::Internal(format!("stored port {} out of range", account.port)))?;

        Ok(ResolvedSmtp {
            host: account.host,
            port,
            secure: account.secure,
            username: account.username,
            password,
            from_name: account.from_name,
        })
    }
}
