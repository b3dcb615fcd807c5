//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` and then creates the
//! tower-sessions table.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use tower_sessions_sqlx_store::PostgresStore;

use super::{CommandError, connect};

/// Migration failures.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Session store migration failed: {0}")]
    SessionStore(#[from] sqlx::Error),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the connection or any migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session table...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
