//! Command implementations.

pub mod carts;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

use shopfront_storefront::db;

/// Errors shared by commands that talk to the database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`
/// (or `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&database_url).await?)
}
