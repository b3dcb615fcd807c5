//! Cart reconciliation service.
//!
//! Every operation takes the request's [`Identity`] and routes through a
//! [`CartSlot`] to the store of that identity's kind. All mutations share one
//! read-modify-write loop:
//!
//! 1. load the record (`None` when absent)
//! 2. apply the mutation to the loaded lines
//! 3. populate from the catalog, dropping lines whose product is gone
//! 4. write back only if the lines changed, conditional on the version read
//! 5. on a version conflict, start over against fresh state
//!
//! Populated lines are built at read time and never persisted.

mod catalog;
mod error;
mod store;

use std::sync::Arc;

use tracing::instrument;

use shopfront_core::{
    AccountId, CartLines, GuestId, Identity, PopulatedCartLine, ProductId, Quantity,
};

pub use catalog::{MemoryCatalog, ProductCatalog};
pub use error::CartError;
pub use store::{CartStore, MemoryCartStore, StoreError, StoredCart, Version};

/// Tunables of the cart service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartPolicy {
    /// Reject adds and updates that would exceed current stock.
    pub enforce_stock: bool,
    /// Total write attempts per operation before reporting a conflict.
    pub max_write_attempts: u32,
}

impl Default for CartPolicy {
    fn default() -> Self {
        Self {
            enforce_stock: true,
            max_write_attempts: 3,
        }
    }
}

/// The cart record an operation acts on.
#[derive(Clone, Copy)]
enum CartSlot<'a> {
    Guest(&'a dyn CartStore<GuestId>, GuestId),
    Account(&'a dyn CartStore<AccountId>, AccountId),
}

impl CartSlot<'_> {
    async fn load(&self) -> Result<Option<StoredCart>, StoreError> {
        match self {
            Self::Guest(store, id) => store.load(id).await,
            Self::Account(store, id) => store.load(id).await,
        }
    }

    async fn save(
        &self,
        lines: &CartLines,
        expected: Option<Version>,
    ) -> Result<Version, StoreError> {
        match self {
            Self::Guest(store, id) => store.save(id, lines, expected).await,
            Self::Account(store, id) => store.save(id, lines, expected).await,
        }
    }
}

/// Cart service shared by all handlers.
#[derive(Clone)]
pub struct CartService {
    guests: Arc<dyn CartStore<GuestId>>,
    accounts: Arc<dyn CartStore<AccountId>>,
    catalog: Arc<dyn ProductCatalog>,
    policy: CartPolicy,
}

impl CartService {
    /// Create a cart service over the given stores.
    #[must_use]
    pub fn new(
        guests: Arc<dyn CartStore<GuestId>>,
        accounts: Arc<dyn CartStore<AccountId>>,
        catalog: Arc<dyn ProductCatalog>,
        policy: CartPolicy,
    ) -> Self {
        Self {
            guests,
            accounts,
            catalog,
            policy,
        }
    }

    /// Add `quantity` units of a product, creating the cart if needed.
    ///
    /// # Errors
    ///
    /// - `ProductNotFound` if the product does not resolve
    /// - `InsufficientStock` if stock is enforced and the combined quantity
    ///   exceeds it
    /// - `Conflict` if write attempts are exhausted
    #[instrument(skip_all, fields(identity = %identity, product_id = %product_id))]
    pub async fn add_item(
        &self,
        identity: Identity,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<Vec<PopulatedCartLine>, CartError> {
        let product = self
            .catalog
            .find(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        let enforce_stock = self.policy.enforce_stock;

        self.apply(self.slot(identity), |cart| {
            let mut lines = cart.unwrap_or_default();
            let total = lines.add(product_id, quantity)?;
            if enforce_stock && !product.has_stock_for(total) {
                return Err(CartError::InsufficientStock {
                    available: product.total_stock,
                });
            }
            Ok(lines)
        })
        .await
    }

    /// The identity's cart, populated. Lines of deleted products are
    /// dropped and the pruned cart is saved. Never creates a record.
    ///
    /// # Errors
    ///
    /// Returns `Storage` on persistence or catalog failure.
    #[instrument(skip_all, fields(identity = %identity))]
    pub async fn fetch_items(
        &self,
        identity: Identity,
    ) -> Result<Vec<PopulatedCartLine>, CartError> {
        self.apply(self.slot(identity), |cart| Ok(cart.unwrap_or_default()))
            .await
    }

    /// Set a line to exactly `quantity` units.
    ///
    /// If the product has been deleted the line is removed instead and
    /// `ProductNotFound` is returned once the removal is saved.
    ///
    /// # Errors
    ///
    /// - `CartNotFound` if the identity has no cart record
    /// - `ItemNotFound` if the cart has no line for the product
    /// - `ProductNotFound` if the product no longer resolves
    /// - `InsufficientStock` if stock is enforced and `quantity` exceeds it
    #[instrument(skip_all, fields(identity = %identity, product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        identity: Identity,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<Vec<PopulatedCartLine>, CartError> {
        let slot = self.slot(identity);

        let Some(product) = self.catalog.find(product_id).await? else {
            self.apply(slot, |cart| remove_line(cart, product_id)).await?;
            tracing::info!("Removed line of a deleted product");
            return Err(CartError::ProductNotFound);
        };
        let enforce_stock = self.policy.enforce_stock;

        self.apply(slot, |cart| {
            let mut lines = cart.ok_or(CartError::CartNotFound)?;
            lines.set_quantity(product_id, quantity)?;
            if enforce_stock && !product.has_stock_for(quantity) {
                return Err(CartError::InsufficientStock {
                    available: product.total_stock,
                });
            }
            Ok(lines)
        })
        .await
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// - `CartNotFound` if the identity has no cart record
    /// - `ItemNotFound` if the cart has no line for the product
    #[instrument(skip_all, fields(identity = %identity, product_id = %product_id))]
    pub async fn remove_item(
        &self,
        identity: Identity,
        product_id: &ProductId,
    ) -> Result<Vec<PopulatedCartLine>, CartError> {
        self.apply(self.slot(identity), |cart| remove_line(cart, product_id))
            .await
    }

    /// Fold `lines` into the account's cart additively, creating it if
    /// needed. Returns the account cart, populated.
    ///
    /// Not idempotent: merging the same lines twice adds them twice.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a merged quantity overflows
    /// - `Conflict` if write attempts are exhausted
    #[instrument(skip_all, fields(account_id = %account, lines = lines.len()))]
    pub async fn merge_on_authentication(
        &self,
        lines: &CartLines,
        account: AccountId,
    ) -> Result<Vec<PopulatedCartLine>, CartError> {
        self.apply(CartSlot::Account(self.accounts.as_ref(), account), |cart| {
            let mut merged = cart.unwrap_or_default();
            merged.merge(lines.as_slice())?;
            Ok(merged)
        })
        .await
    }

    /// Move a guest's cart into an account on sign-in, leaving the guest
    /// cart empty. Returns the number of lines moved.
    ///
    /// The guest lines are claimed first by emptying the record at the
    /// version they were read at, so a line added meanwhile is either part of
    /// the claim or still in the guest cart. If the merge then fails, the
    /// claimed lines are put back.
    ///
    /// # Errors
    ///
    /// Same as [`Self::merge_on_authentication`].
    #[instrument(skip_all, fields(guest_id = %guest, account_id = %account))]
    pub async fn absorb_guest_cart(
        &self,
        guest: GuestId,
        account: AccountId,
    ) -> Result<usize, CartError> {
        let Some(claimed) = self.claim_guest_lines(guest).await? else {
            return Ok(0);
        };

        if let Err(err) = self.merge_on_authentication(&claimed, account).await {
            self.restore_guest_lines(guest, &claimed).await;
            return Err(err);
        }

        tracing::info!(merged = claimed.len(), "Guest cart merged into account");
        Ok(claimed.len())
    }

    /// Empty the guest cart and return the lines it held, or `None` if
    /// there was nothing to take.
    async fn claim_guest_lines(&self, guest: GuestId) -> Result<Option<CartLines>, CartError> {
        let empty = CartLines::new();
        let mut attempt = 1;
        loop {
            let Some(stored) = self.guests.load(&guest).await? else {
                return Ok(None);
            };
            if stored.lines.is_empty() {
                return Ok(None);
            }

            match self.guests.save(&guest, &empty, Some(stored.version)).await {
                Ok(_) => return Ok(Some(stored.lines)),
                Err(StoreError::VersionConflict) if attempt < self.max_attempts() => {
                    tracing::debug!(attempt, "Guest cart changed while claiming, retrying");
                    attempt += 1;
                }
                Err(StoreError::VersionConflict) => return Err(CartError::Conflict),
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn restore_guest_lines(&self, guest: GuestId, lines: &CartLines) {
        let slot = CartSlot::Guest(self.guests.as_ref(), guest);
        let restored = self
            .apply(slot, |cart| {
                let mut merged = cart.unwrap_or_default();
                merged.merge(lines.as_slice())?;
                Ok(merged)
            })
            .await;
        if let Err(err) = restored {
            tracing::error!(error = %err, lines = lines.len(), "Failed to restore guest cart lines");
        }
    }

    fn slot(&self, identity: Identity) -> CartSlot<'_> {
        match identity {
            Identity::Anonymous(id) => CartSlot::Guest(self.guests.as_ref(), id),
            Identity::Authenticated(id) => CartSlot::Account(self.accounts.as_ref(), id),
        }
    }

    fn max_attempts(&self) -> u32 {
        self.policy.max_write_attempts.max(1)
    }

    async fn apply<F>(
        &self,
        slot: CartSlot<'_>,
        mut mutate: F,
    ) -> Result<Vec<PopulatedCartLine>, CartError>
    where
        F: FnMut(Option<CartLines>) -> Result<CartLines, CartError> + Send,
    {
        let mut attempt = 1;
        loop {
            let (previous, expected) = match slot.load().await? {
                Some(cart) => (Some(cart.lines), Some(cart.version)),
                None => (None, None),
            };

            let mut lines = mutate(previous.clone())?;
            let populated = self.populate_and_prune(&mut lines).await?;

            let changed = previous
                .as_ref()
                .map_or(!lines.is_empty(), |prev| prev != &lines);
            if !changed {
                return Ok(populated);
            }

            match slot.save(&lines, expected).await {
                Ok(version) => {
                    tracing::debug!(version, "Cart saved");
                    return Ok(populated);
                }
                Err(StoreError::VersionConflict) if attempt < self.max_attempts() => {
                    tracing::debug!(attempt, "Cart version conflict, retrying");
                    attempt += 1;
                }
                Err(StoreError::VersionConflict) => {
                    tracing::warn!(attempt, "Cart write attempts exhausted");
                    return Err(CartError::Conflict);
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Join lines with current product data, dropping lines whose product
    /// no longer resolves. One catalog round trip.
    async fn populate_and_prune(
        &self,
        lines: &mut CartLines,
    ) -> Result<Vec<PopulatedCartLine>, CartError> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ProductId> = lines.iter().map(|line| line.product_id.clone()).collect();
        let products = self.catalog.find_many(&ids).await?;

        let before = lines.len();
        lines.retain(|line| products.contains_key(&line.product_id));
        if lines.len() < before {
            tracing::info!(pruned = before - lines.len(), "Pruned lines of deleted products");
        }

        Ok(lines
            .iter()
            .filter_map(|line| {
                products
                    .get(&line.product_id)
                    .map(|product| PopulatedCartLine::new(line, product.snapshot()))
            })
            .collect())
    }
}

fn remove_line(cart: Option<CartLines>, product_id: &ProductId) -> Result<CartLines, CartError> {
    let mut lines = cart.ok_or(CartError::CartNotFound)?;
    lines.remove(product_id)?;
    Ok(lines)
}

/// Validate a request's product id and quantity.
///
/// # Errors
///
/// Returns `InvalidInput("Invalid data provided!")` if either is missing,
/// the id is malformed, or the quantity is not positive.
pub fn parse_item(
    product_id: Option<&str>,
    quantity: Option<i64>,
) -> Result<(ProductId, Quantity), CartError> {
    let product_id = parse_product_id(product_id.unwrap_or_default())?;
    let quantity = quantity
        .and_then(|q| Quantity::try_from(q).ok())
        .ok_or_else(CartError::invalid_data)?;
    Ok((product_id, quantity))
}

/// Validate a product id taken from a path or body.
///
/// # Errors
///
/// Returns `InvalidInput("Invalid data provided!")` if it is malformed.
pub fn parse_product_id(product_id: &str) -> Result<ProductId, CartError> {
    ProductId::parse(product_id).map_err(|_| CartError::invalid_data())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shopfront_core::{CartLine, Product};

    use super::*;
    use crate::db::RepositoryError;

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn product(id: &str, stock: u32) -> Product {
        Product {
            id: pid(id),
            title: format!("Product {id}"),
            image: None,
            price: Decimal::new(1999, 2),
            sale_price: None,
            total_stock: stock,
        }
    }

    struct Harness {
        guests: MemoryCartStore<GuestId>,
        accounts: MemoryCartStore<AccountId>,
        catalog: MemoryCatalog,
        service: CartService,
    }

    fn harness(policy: CartPolicy) -> Harness {
        let guests = MemoryCartStore::new();
        let accounts = MemoryCartStore::new();
        let catalog = MemoryCatalog::with_products([product("P1", 10), product("P2", 10)]);
        let service = CartService::new(
            Arc::new(guests.clone()),
            Arc::new(accounts.clone()),
            Arc::new(catalog.clone()),
            policy,
        );
        Harness {
            guests,
            accounts,
            catalog,
            service,
        }
    }

    fn quantities(lines: &[PopulatedCartLine]) -> Vec<(String, u32)> {
        lines
            .iter()
            .map(|l| (l.product_id.to_string(), l.quantity.get()))
            .collect()
    }

    fn guest() -> Identity {
        Identity::Anonymous(GuestId::generate())
    }

    #[tokio::test]
    async fn test_add_to_empty_cart_then_fetch() {
        let h = harness(CartPolicy::default());
        let who = guest();

        let added = h.service.add_item(who, &pid("P1"), qty(2)).await.unwrap();
        assert_eq!(quantities(&added), vec![("P1".into(), 2)]);

        let fetched = h.service.fetch_items(who).await.unwrap();
        assert_eq!(fetched, added);
        assert_eq!(fetched[0].title, "Product P1");
    }

    #[tokio::test]
    async fn test_add_is_additive_and_update_is_absolute() {
        let h = harness(CartPolicy::default());
        let who = Identity::Authenticated(AccountId::new(1));

        h.service.add_item(who, &pid("P1"), qty(2)).await.unwrap();
        let lines = h.service.add_item(who, &pid("P1"), qty(3)).await.unwrap();
        assert_eq!(quantities(&lines), vec![("P1".into(), 5)]);

        let lines = h.service.update_quantity(who, &pid("P1"), qty(4)).await.unwrap();
        assert_eq!(quantities(&lines), vec![("P1".into(), 4)]);
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_rejected_without_creating_cart() {
        let h = harness(CartPolicy::default());
        let guest_id = GuestId::generate();

        let err = h
            .service
            .add_item(Identity::Anonymous(guest_id), &pid("NOPE"), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound));
        assert!(h.guests.load(&guest_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_and_remove_on_absent_cart() {
        let h = harness(CartPolicy::default());
        let who = guest();

        let err = h.service.update_quantity(who, &pid("P1"), qty(1)).await.unwrap_err();
        assert!(matches!(err, CartError::CartNotFound));

        let err = h.service.remove_item(who, &pid("P1")).await.unwrap_err();
        assert!(matches!(err, CartError::CartNotFound));
    }

    #[tokio::test]
    async fn test_emptied_cart_reports_item_not_found() {
        let h = harness(CartPolicy::default());
        let who = guest();

        h.service.add_item(who, &pid("P1"), qty(1)).await.unwrap();
        let lines = h.service.remove_item(who, &pid("P1")).await.unwrap();
        assert!(lines.is_empty());

        let err = h.service.update_quantity(who, &pid("P1"), qty(1)).await.unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
        let err = h.service.remove_item(who, &pid("P1")).await.unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound));
    }

    #[tokio::test]
    async fn test_fetch_never_creates_a_record() {
        let h = harness(CartPolicy::default());
        let account = AccountId::new(9);

        let lines = h.service.fetch_items(Identity::Authenticated(account)).await.unwrap();
        assert!(lines.is_empty());
        assert!(h.accounts.load(&account).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fetch_prunes_deleted_products_and_persists() {
        let h = harness(CartPolicy::default());
        let guest_id = GuestId::generate();
        let who = Identity::Anonymous(guest_id);

        h.service.add_item(who, &pid("P1"), qty(1)).await.unwrap();
        h.service.add_item(who, &pid("P2"), qty(1)).await.unwrap();
        h.catalog.delete(&pid("P2")).await;

        let first = h.service.fetch_items(who).await.unwrap();
        assert_eq!(quantities(&first), vec![("P1".into(), 1)]);
        let stored = h.guests.load(&guest_id).await.unwrap().unwrap();
        assert!(!stored.lines.contains(&pid("P2")));

        let second = h.service.fetch_items(who).await.unwrap();
        assert_eq!(first, second);
        let again = h.guests.load(&guest_id).await.unwrap().unwrap();
        assert_eq!(again.version, stored.version);
    }

    #[tokio::test]
    async fn test_update_of_deleted_product_removes_line() {
        let h = harness(CartPolicy::default());
        let account = AccountId::new(3);
        let who = Identity::Authenticated(account);

        h.service.add_item(who, &pid("P1"), qty(1)).await.unwrap();
        h.service.add_item(who, &pid("P2"), qty(1)).await.unwrap();
        h.catalog.delete(&pid("P2")).await;

        let err = h.service.update_quantity(who, &pid("P2"), qty(3)).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound));

        let stored = h.accounts.load(&account).await.unwrap().unwrap();
        assert_eq!(stored.lines.len(), 1);
        assert!(stored.lines.contains(&pid("P1")));
    }

    #[tokio::test]
    async fn test_stock_is_enforced_on_combined_and_absolute_quantity() {
        let h = harness(CartPolicy::default());
        let who = guest();

        h.service.add_item(who, &pid("P1"), qty(8)).await.unwrap();
        let err = h.service.add_item(who, &pid("P1"), qty(3)).await.unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 10 }));
        assert_eq!(err.to_string(), "Only 10 units available");

        let err = h.service.update_quantity(who, &pid("P1"), qty(11)).await.unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 10 }));

        let lines = h.service.fetch_items(who).await.unwrap();
        assert_eq!(quantities(&lines), vec![("P1".into(), 8)]);
    }

    #[tokio::test]
    async fn test_stock_is_advisory_when_not_enforced() {
        let h = harness(CartPolicy {
            enforce_stock: false,
            ..CartPolicy::default()
        });
        let lines = h.service.add_item(guest(), &pid("P1"), qty(50)).await.unwrap();
        assert_eq!(quantities(&lines), vec![("P1".into(), 50)]);
    }

    #[tokio::test]
    async fn test_merge_adds_matching_and_appends_new_lines() {
        let h = harness(CartPolicy::default());
        let account = AccountId::new(5);
        h.service
            .add_item(Identity::Authenticated(account), &pid("P1"), qty(3))
            .await
            .unwrap();

        let session_lines = CartLines::from(vec![
            CartLine::new(pid("P1"), qty(2)),
            CartLine::new(pid("P2"), qty(1)),
        ]);
        let merged = h
            .service
            .merge_on_authentication(&session_lines, account)
            .await
            .unwrap();
        assert_eq!(
            quantities(&merged),
            vec![("P1".into(), 5), ("P2".into(), 1)]
        );
    }

    #[tokio::test]
    async fn test_absorb_guest_cart_moves_lines_and_empties_guest() {
        let h = harness(CartPolicy::default());
        let guest_id = GuestId::generate();
        let account = AccountId::new(7);

        h.service
            .add_item(Identity::Anonymous(guest_id), &pid("P1"), qty(2))
            .await
            .unwrap();

        let moved = h.service.absorb_guest_cart(guest_id, account).await.unwrap();
        assert_eq!(moved, 1);

        let account_lines = h
            .service
            .fetch_items(Identity::Authenticated(account))
            .await
            .unwrap();
        assert_eq!(quantities(&account_lines), vec![("P1".into(), 2)]);

        let guest_cart = h.guests.load(&guest_id).await.unwrap().unwrap();
        assert!(guest_cart.lines.is_empty());

        assert_eq!(h.service.absorb_guest_cart(guest_id, account).await.unwrap(), 0);
    }

    /// Store that lets a competing writer in just before the first save.
    struct RacingStore {
        inner: MemoryCartStore<GuestId>,
        raced: AtomicBool,
        competitor: CartLine,
    }

    #[async_trait]
    impl CartStore<GuestId> for RacingStore {
        async fn load(&self, owner: &GuestId) -> Result<Option<StoredCart>, StoreError> {
            self.inner.load(owner).await
        }

        async fn save(
            &self,
            owner: &GuestId,
            lines: &CartLines,
            expected: Option<Version>,
        ) -> Result<Version, StoreError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                let current = self.inner.load(owner).await?;
                let version = current.as_ref().map(|c| c.version);
                let mut theirs = current.map(|c| c.lines).unwrap_or_default();
                theirs
                    .add(&self.competitor.product_id, self.competitor.quantity)
                    .unwrap();
                self.inner.save(owner, &theirs, version).await?;
            }
            self.inner.save(owner, lines, expected).await
        }
    }

    #[tokio::test]
    async fn test_version_conflict_is_retried_against_fresh_state() {
        let inner = MemoryCartStore::new();
        let store = RacingStore {
            inner: inner.clone(),
            raced: AtomicBool::new(false),
            competitor: CartLine::new(pid("P2"), qty(1)),
        };
        let service = CartService::new(
            Arc::new(store),
            Arc::new(MemoryCartStore::new()),
            Arc::new(MemoryCatalog::with_products([product("P1", 10), product("P2", 10)])),
            CartPolicy::default(),
        );
        let guest_id = GuestId::generate();

        let lines = service
            .add_item(Identity::Anonymous(guest_id), &pid("P1"), qty(1))
            .await
            .unwrap();

        assert_eq!(
            quantities(&lines),
            vec![("P2".into(), 1), ("P1".into(), 1)]
        );
        let stored = inner.load(&guest_id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    /// Store whose writes always lose the race.
    struct ContendedStore;

    #[async_trait]
    impl CartStore<GuestId> for ContendedStore {
        async fn load(&self, _owner: &GuestId) -> Result<Option<StoredCart>, StoreError> {
            Ok(None)
        }

        async fn save(
            &self,
            _owner: &GuestId,
            _lines: &CartLines,
            _expected: Option<Version>,
        ) -> Result<Version, StoreError> {
            Err(StoreError::VersionConflict)
        }
    }

    #[tokio::test]
    async fn test_exhausted_attempts_report_conflict() {
        let service = CartService::new(
            Arc::new(ContendedStore),
            Arc::new(MemoryCartStore::new()),
            Arc::new(MemoryCatalog::with_products([product("P1", 10)])),
            CartPolicy::default(),
        );

        let err = service
            .add_item(guest(), &pid("P1"), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Conflict));
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_both_kept() {
        let h = harness(CartPolicy::default());
        let who = guest();

        let p1 = pid("P1");
        let p2 = pid("P2");
        let (a, b) = tokio::join!(
            h.service.add_item(who, &p1, qty(1)),
            h.service.add_item(who, &p2, qty(1)),
        );
        a.unwrap();
        b.unwrap();

        let lines = h.service.fetch_items(who).await.unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetching_keeps_an_idle_guest_cart_alive() {
        let guests = MemoryCartStore::with_ttl(std::time::Duration::from_secs(3600));
        let service = CartService::new(
            Arc::new(guests.clone()),
            Arc::new(MemoryCartStore::new()),
            Arc::new(MemoryCatalog::with_products([product("P1", 10)])),
            CartPolicy::default(),
        );
        let guest_id = GuestId::generate();
        let who = Identity::Anonymous(guest_id);
        service.add_item(who, &pid("P1"), qty(1)).await.unwrap();

        for _ in 0..3 {
            tokio::time::advance(std::time::Duration::from_secs(50 * 60)).await;
            let lines = service.fetch_items(who).await.unwrap();
            assert_eq!(quantities(&lines), vec![("P1".into(), 1)]);
        }

        tokio::time::advance(std::time::Duration::from_secs(61 * 60)).await;
        assert!(service.fetch_items(who).await.unwrap().is_empty());
        assert!(guests.load(&guest_id).await.unwrap().is_none());
    }

    /// Guest store where another request adds a line right after the
    /// first load.
    struct LateAddStore {
        inner: MemoryCartStore<GuestId>,
        added: AtomicBool,
        late: CartLine,
    }

    #[async_trait]
    impl CartStore<GuestId> for LateAddStore {
        async fn load(&self, owner: &GuestId) -> Result<Option<StoredCart>, StoreError> {
            let seen = self.inner.load(owner).await?;
            if !self.added.swap(true, Ordering::SeqCst) {
                let mut lines = seen.as_ref().map(|c| c.lines.clone()).unwrap_or_default();
                lines.add(&self.late.product_id, self.late.quantity).unwrap();
                self.inner
                    .save(owner, &lines, seen.as_ref().map(|c| c.version))
                    .await?;
            }
            Ok(seen)
        }

        async fn save(
            &self,
            owner: &GuestId,
            lines: &CartLines,
            expected: Option<Version>,
        ) -> Result<Version, StoreError> {
            self.inner.save(owner, lines, expected).await
        }
    }

    #[tokio::test]
    async fn test_absorb_keeps_lines_added_while_merging() {
        let guests = MemoryCartStore::new();
        let accounts = MemoryCartStore::new();
        let guest_id = GuestId::generate();
        let account = AccountId::new(4);
        guests
            .save(&guest_id, &CartLines::from(vec![CartLine::new(pid("P1"), qty(2))]), None)
            .await
            .unwrap();

        let service = CartService::new(
            Arc::new(LateAddStore {
                inner: guests.clone(),
                added: AtomicBool::new(false),
                late: CartLine::new(pid("P2"), qty(4)),
            }),
            Arc::new(accounts.clone()),
            Arc::new(MemoryCatalog::with_products([product("P1", 10), product("P2", 10)])),
            CartPolicy::default(),
        );

        let moved = service.absorb_guest_cart(guest_id, account).await.unwrap();
        assert_eq!(moved, 2);

        let account_cart = accounts.load(&account).await.unwrap().unwrap();
        assert_eq!(
            account_cart.lines,
            CartLines::from(vec![
                CartLine::new(pid("P1"), qty(2)),
                CartLine::new(pid("P2"), qty(4)),
            ])
        );
        let guest_cart = guests.load(&guest_id).await.unwrap().unwrap();
        assert!(guest_cart.lines.is_empty());
    }

    /// Account store that is down.
    struct UnavailableStore;

    #[async_trait]
    impl CartStore<AccountId> for UnavailableStore {
        async fn load(&self, _owner: &AccountId) -> Result<Option<StoredCart>, StoreError> {
            Err(RepositoryError::NotFound.into())
        }

        async fn save(
            &self,
            _owner: &AccountId,
            _lines: &CartLines,
            _expected: Option<Version>,
        ) -> Result<Version, StoreError> {
            Err(RepositoryError::NotFound.into())
        }
    }

    #[tokio::test]
    async fn test_failed_merge_puts_guest_lines_back() {
        let guests = MemoryCartStore::new();
        let guest_id = GuestId::generate();
        let service = CartService::new(
            Arc::new(guests.clone()),
            Arc::new(UnavailableStore),
            Arc::new(MemoryCatalog::with_products([product("P1", 10)])),
            CartPolicy::default(),
        );
        service
            .add_item(Identity::Anonymous(guest_id), &pid("P1"), qty(3))
            .await
            .unwrap();

        let err = service
            .absorb_guest_cart(guest_id, AccountId::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::Storage(_)));

        let guest_cart = guests.load(&guest_id).await.unwrap().unwrap();
        assert_eq!(
            guest_cart.lines,
            CartLines::from(vec![CartLine::new(pid("P1"), qty(3))])
        );
    }

    #[test]
    fn test_parse_item_rejects_missing_and_non_positive() {
        assert!(parse_item(Some("P1"), Some(1)).is_ok());
        for (id, q) in [
            (None, Some(1)),
            (Some("P1"), None),
            (Some("P1"), Some(0)),
            (Some("P1"), Some(-2)),
            (Some(""), Some(1)),
        ] {
            let err = parse_item(id, q).unwrap_err();
            assert_eq!(err.to_string(), CartError::INVALID_DATA);
        }
    }
}
