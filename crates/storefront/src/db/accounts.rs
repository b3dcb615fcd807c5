//! Account repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use shopfront_core::api::Role;
use shopfront_core::{AccountId, Email};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Account;
use crate::services::auth::AccountStore;

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i32,
    user_name: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = RepositoryError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: AccountId::new(row.id),
            user_name: row.user_name,
            email,
            role: Role::from_db(&row.role),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountWithHashRow {
    #[sqlx(flatten)]
    account: AccountRow,
    password_hash: Option<String>,
}

/// Repository for account database operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn create_with_password(
        &self,
        user_name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<Account, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row: AccountRow = sqlx::query_as(
            r"
            INSERT INTO storefront.account (user_name, email)
            VALUES ($1, $2)
            RETURNING id, user_name, email, role, created_at
            ",
        )
        .bind(user_name)
        .bind(email.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        let account = Account::try_from(row)?;

        sqlx::query(
            r"
            INSERT INTO storefront.account_password (account_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(account.id.as_i32())
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(account)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(Account, String)>, RepositoryError> {
        let row: Option<AccountWithHashRow> = sqlx::query_as(
            r"
            SELECT a.id, a.user_name, a.email, a.role, a.created_at,
                   p.password_hash
            FROM storefront.account a
            LEFT JOIN storefront.account_password p ON a.id = p.account_id
            WHERE a.email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let Some(password_hash) = row.password_hash else {
            return Ok(None);
        };

        Ok(Some((Account::try_from(row.account)?, password_hash)))
    }
}
