//! Cart repositories.
//!
//! Both tables store lines as a JSONB document next to a `version` column.
//! Writes are conditional on the version the caller read; a write that
//! matches no row is reported as `StoreError::VersionConflict`.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use shopfront_core::{AccountId, CartLines, GuestId};

use super::RepositoryError;
use crate::services::cart::{CartStore, StoreError, StoredCart, Version};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    lines: Json<CartLines>,
    version: i64,
}

impl From<CartRow> for StoredCart {
    fn from(row: CartRow) -> Self {
        Self {
            lines: row.lines.0,
            version: row.version,
        }
    }
}

fn conflict_if_missing(version: Option<Version>) -> Result<Version, StoreError> {
    version.ok_or(StoreError::VersionConflict)
}

// =============================================================================
// Account carts
// =============================================================================

/// Durable carts of registered accounts, one per account.
#[derive(Debug, Clone)]
pub struct AccountCartRepository {
    pool: PgPool,
}

impl AccountCartRepository {
    /// Create a new account cart repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CartStore<AccountId> for AccountCartRepository {
    async fn load(&self, owner: &AccountId) -> Result<Option<StoredCart>, StoreError> {
        let row: Option<CartRow> = sqlx::query_as(
            r"
            SELECT lines, version
            FROM storefront.account_cart
            WHERE account_id = $1
            ",
        )
        .bind(owner.as_i32())
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(StoredCart::from))
    }

    async fn save(
        &self,
        owner: &AccountId,
        lines: &CartLines,
        expected: Option<Version>,
    ) -> Result<Version, StoreError> {
        let version: Option<i64> = match expected {
            None => sqlx::query_scalar(
                r"
                INSERT INTO storefront.account_cart (account_id, lines)
                VALUES ($1, $2)
                ON CONFLICT (account_id) DO NOTHING
                RETURNING version
                ",
            )
            .bind(owner.as_i32())
            .bind(Json(lines))
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?,
            Some(expected) => sqlx::query_scalar(
                r"
                UPDATE storefront.account_cart
                SET lines = $2, version = version + 1, updated_at = now()
                WHERE account_id = $1 AND version = $3
                RETURNING version
                ",
            )
            .bind(owner.as_i32())
            .bind(Json(lines))
            .bind(expected)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?,
        };

        conflict_if_missing(version)
    }
}

// =============================================================================
// Guest carts
// =============================================================================

/// Carts of anonymous sessions.
///
/// Each load or write pushes `expires_at` forward by the session lifetime, so
/// a guest cart lives exactly as long as an idle session would. Expired rows read as
/// absent and are removed by [`GuestCartRepository::purge_expired`].
#[derive(Debug, Clone)]
pub struct GuestCartRepository {
    pool: PgPool,
    ttl: Duration,
}

impl GuestCartRepository {
    /// Create a new guest cart repository whose records live for `ttl`
    /// after their last write.
    #[must_use]
    pub const fn new(pool: PgPool, ttl: Duration) -> Self {
        Self { pool, ttl }
    }

    /// Delete every expired guest cart. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.guest_cart WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl CartStore<GuestId> for GuestCartRepository {
    async fn load(&self, owner: &GuestId) -> Result<Option<StoredCart>, StoreError> {
        // Reading is activity: refresh the expiry without bumping the version.
        let row: Option<CartRow> = sqlx::query_as(
            r"
            UPDATE storefront.guest_cart
            SET expires_at = $2
            WHERE guest_id = $1 AND expires_at > now()
            RETURNING lines, version
            ",
        )
        .bind(*owner)
        .bind(Utc::now() + self.ttl)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(StoredCart::from))
    }

    async fn save(
        &self,
        owner: &GuestId,
        lines: &CartLines,
        expected: Option<Version>,
    ) -> Result<Version, StoreError> {
        let expires_at = Utc::now() + self.ttl;

        // An expired row counts as absent, so creation may take it over.
        let version: Option<i64> = match expected {
            None => sqlx::query_scalar(
                r"
                INSERT INTO storefront.guest_cart (guest_id, lines, expires_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (guest_id) DO UPDATE
                SET lines = EXCLUDED.lines,
                    version = guest_cart.version + 1,
                    expires_at = EXCLUDED.expires_at,
                    updated_at = now()
                WHERE guest_cart.expires_at <= now()
                RETURNING version
                ",
            )
            .bind(*owner)
            .bind(Json(lines))
            .bind(expires_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?,
            Some(expected) => sqlx::query_scalar(
                r"
                UPDATE storefront.guest_cart
                SET lines = $2, version = version + 1, expires_at = $3, updated_at = now()
                WHERE guest_id = $1 AND version = $4 AND expires_at > now()
                RETURNING version
                ",
            )
            .bind(*owner)
            .bind(Json(lines))
            .bind(expires_at)
            .bind(expected)
            .fetch_optional(&self.pool)
            .await
            .map_err(RepositoryError::from)?,
        };

        conflict_if_missing(version)
    }
}
