//! Session middleware configuration.
//!
//! Production sessions live in `PostgreSQL`; tests pass the tower-sessions
//! `MemoryStore` to the same builder.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shop_session";

/// The `PostgreSQL` session store. Its table is created by `migrate`.
#[must_use]
pub fn postgres_session_store(pool: &PgPool) -> PostgresStore {
    PostgresStore::new(pool.clone())
}

/// Create the session layer over `store`.
///
/// Cookies are `HttpOnly` and `SameSite=Lax`, and `Secure` when the base URL
/// is https. Sessions expire after `SESSION_EXPIRY_HOURS` of inactivity:
/// every request saves the session, pushing its expiry forward the same way
/// a cart request pushes forward the guest cart's.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::hours(i64::from(config.session_expiry_hours)),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_always_save(true)
}
