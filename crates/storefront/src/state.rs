//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{AccountCartRepository, AccountRepository, GuestCartRepository, ProductRepository};
use crate::services::auth::AccountStore;
use crate::services::cart::CartService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the cart service and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    carts: CartService,
    accounts: Arc<dyn AccountStore>,
    guest_carts: Option<GuestCartRepository>,
}

impl AppState {
    /// Create the `PostgreSQL`-backed application state.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let guest_carts = GuestCartRepository::new(pool.clone(), config.session_expiry());
        let carts = CartService::new(
            Arc::new(guest_carts.clone()),
            Arc::new(AccountCartRepository::new(pool.clone())),
            Arc::new(ProductRepository::new(pool.clone())),
            config.cart,
        );
        let accounts = Arc::new(AccountRepository::new(pool.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool: Some(pool),
                carts,
                accounts,
                guest_carts: Some(guest_carts),
            }),
        }
    }

    /// Create application state from prebuilt services, without a database.
    ///
    /// Used with the in-memory stores.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        carts: CartService,
        accounts: Arc<dyn AccountStore>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool: None,
                carts,
                accounts,
                guest_carts: None,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool, if any.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    /// Get a reference to the account store.
    #[must_use]
    pub fn accounts(&self) -> &dyn AccountStore {
        self.inner.accounts.as_ref()
    }

    /// Start the hourly purge of expired guest carts.
    ///
    /// No-op without a database.
    pub fn start_guest_cart_purge(&self) {
        let Some(repo) = self.inner.guest_carts.clone() else {
            return;
        };

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
            loop {
                interval.tick().await;
                match repo.purge_expired().await {
                    Ok(0) => {}
                    Ok(purged) => tracing::info!(purged, "Purged expired guest carts"),
                    Err(e) => tracing::warn!(error = %e, "Failed to purge expired guest carts"),
                }
            }
        });
    }
}
