//! Account persistence port.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use shopfront_core::api::Role;
use shopfront_core::{AccountId, Email};

use crate::db::RepositoryError;
use crate::models::Account;

/// Storage of accounts and their password hashes.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create an account with a password hash.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the email is already registered
    /// - `Database` on persistence failure
    async fn create_with_password(
        &self,
        user_name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<Account, RepositoryError>;

    /// Get an account and its password hash by email.
    ///
    /// Returns `None` if the account doesn't exist or has no password set.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError>;
}

/// In-memory account store for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryAccounts {
    accounts: Arc<Mutex<HashMap<Email, (Account, String)>>>,
}

impl MemoryAccounts {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccounts {
    async fn create_with_password(
        &self,
        user_name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<Account, RepositoryError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let next_id = i32::try_from(accounts.len() + 1).unwrap_or(i32::MAX);
        let account = Account {
            id: AccountId::new(next_id),
            user_name: user_name.to_owned(),
            email: email.clone(),
            role: Role::default(),
            created_at: Utc::now(),
        };
        accounts.insert(email.clone(), (account.clone(), password_hash.to_owned()));
        Ok(account)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        Ok(self.accounts.lock().await.get(email).cloned())
    }
}
