//! Cart persistence port.
//!
//! One trait, two keyings: carts of anonymous sessions are keyed by
//! [`GuestId`](shopfront_core::GuestId), durable carts by
//! [`AccountId`](shopfront_core::AccountId). Writes are conditional on the
//! version that was read, so two requests racing on the same cart cannot
//! silently overwrite each other.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use shopfront_core::CartLines;

use crate::db::RepositoryError;

/// Monotonic version of a stored cart record.
pub type Version = i64;

/// A cart record as loaded from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCart {
    pub lines: CartLines,
    pub version: Version,
}

/// Errors from cart stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The record changed (or appeared) since it was read.
    #[error("cart was modified concurrently")]
    VersionConflict,

    /// The backing store failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage of cart records keyed by owner.
#[async_trait]
pub trait CartStore<K: Sync + ?Sized>: Send + Sync {
    /// Load the owner's cart record, if one exists.
    ///
    /// # Errors
    ///
    /// - `Repository` on persistence failure
    async fn load(&self, owner: &K) -> Result<Option<StoredCart>, StoreError>;

    /// Write the owner's lines and return the new version.
    ///
    /// `expected` is the version that was read: `None` creates the record
    /// and fails if one already exists, `Some(v)` replaces it only if it is
    /// still at `v`.
    ///
    /// # Errors
    ///
    /// - `VersionConflict` if the precondition does not hold
    /// - `Repository` on persistence failure
    async fn save(
        &self,
        owner: &K,
        lines: &CartLines,
        expected: Option<Version>,
    ) -> Result<Version, StoreError>;
}

/// In-memory cart store for tests and local runs.
///
/// With a TTL, records behave like guest carts: each load or save pushes
/// their expiry forward, and expired records read as absent.
#[derive(Debug, Clone)]
pub struct MemoryCartStore<K> {
    carts: Arc<Mutex<HashMap<K, Entry>>>,
    ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
struct Entry {
    cart: StoredCart,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

impl<K> Default for MemoryCartStore<K> {
    fn default() -> Self {
        Self {
            carts: Arc::new(Mutex::new(HashMap::new())),
            ttl: None,
        }
    }
}

impl<K> MemoryCartStore<K> {
    /// Creates an empty store whose records never expire.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store whose records expire `ttl` after their last
    /// load or save.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::default()
        }
    }

    fn expiry(&self, now: Instant) -> Option<Instant> {
        self.ttl.map(|ttl| now + ttl)
    }
}

impl<K: Clone> MemoryCartStore<K> {
    /// Owners of every live cart, in no particular order.
    pub async fn owners(&self) -> Vec<K> {
        let now = Instant::now();
        self.carts
            .lock()
            .await
            .iter()
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(owner, _)| owner.clone())
            .collect()
    }
}

#[async_trait]
impl<K> CartStore<K> for MemoryCartStore<K>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
{
    async fn load(&self, owner: &K) -> Result<Option<StoredCart>, StoreError> {
        let now = Instant::now();
        let mut carts = self.carts.lock().await;
        match carts.get_mut(owner) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = self.expiry(now);
                Ok(Some(entry.cart.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn save(
        &self,
        owner: &K,
        lines: &CartLines,
        expected: Option<Version>,
    ) -> Result<Version, StoreError> {
        let now = Instant::now();
        let mut carts = self.carts.lock().await;
        // An expired record counts as absent, so creation may take it over.
        let existing = carts.get(owner);
        let current = existing
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.cart.version);
        if current != expected {
            return Err(StoreError::VersionConflict);
        }
        let version = existing.map_or(1, |entry| entry.cart.version + 1);
        carts.insert(
            owner.clone(),
            Entry {
                cart: StoredCart {
                    lines: lines.clone(),
                    version,
                },
                expires_at: self.expiry(now),
            },
        );
        Ok(version)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{AccountId, GuestId, ProductId, Quantity};

    use super::*;

    fn lines(product: &str, quantity: u32) -> CartLines {
        let mut lines = CartLines::new();
        lines
            .add(&ProductId::parse(product).unwrap(), Quantity::new(quantity).unwrap())
            .unwrap();
        lines
    }

    #[test]
    fn cart_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn CartStore<GuestId>) {}
    }

    #[tokio::test]
    async fn test_create_then_conditional_update() {
        let store = MemoryCartStore::<AccountId>::new();
        let owner = AccountId::new(1);

        assert!(store.load(&owner).await.unwrap().is_none());

        let v1 = store.save(&owner, &lines("P1", 1), None).await.unwrap();
        assert_eq!(v1, 1);

        let v2 = store.save(&owner, &lines("P1", 2), Some(v1)).await.unwrap();
        assert_eq!(v2, 2);

        let stored = store.load(&owner).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.lines, lines("P1", 2));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryCartStore::<AccountId>::new();
        let owner = AccountId::new(1);
        let v1 = store.save(&owner, &lines("P1", 1), None).await.unwrap();
        store.save(&owner, &lines("P1", 2), Some(v1)).await.unwrap();

        let err = store.save(&owner, &lines("P1", 9), Some(v1)).await;
        assert!(matches!(err, Err(StoreError::VersionConflict)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_is_refreshed_by_loads_and_saves() {
        let store = MemoryCartStore::<GuestId>::with_ttl(Duration::from_secs(60));
        let owner = GuestId::generate();
        let v1 = store.save(&owner, &lines("P1", 1), None).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.load(&owner).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(45)).await;
        assert!(store.load(&owner).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.load(&owner).await.unwrap().is_none());
        assert!(store.owners().await.is_empty());

        // A stale writer cannot resurrect it, but a fresh create can.
        let err = store.save(&owner, &lines("P1", 2), Some(v1)).await;
        assert!(matches!(err, Err(StoreError::VersionConflict)));
        store.save(&owner, &lines("P2", 1), None).await.unwrap();
        assert_eq!(store.load(&owner).await.unwrap().unwrap().lines, lines("P2", 1));
    }

    #[tokio::test]
    async fn test_create_over_existing_is_rejected() {
        let store = MemoryCartStore::<GuestId>::new();
        let owner = GuestId::generate();
        store.save(&owner, &lines("P1", 1), None).await.unwrap();

        let err = store.save(&owner, &lines("P2", 1), None).await;
        assert!(matches!(err, Err(StoreError::VersionConflict)));
    }
}
