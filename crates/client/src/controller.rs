//! Cart controller: guard, request, reduce.

use shopfront_core::{Product, ProductId, Quantity};

use crate::api::{CartApi, CartSnapshot};
use crate::error::ApiError;
use crate::guard::{self, CartIntent, Plan, ProductCache};
use crate::state::{CartAction, CartState};

/// Owns the cached cart for one shopper.
#[derive(Debug)]
pub struct CartController {
    api: CartApi,
    state: CartState,
    products: ProductCache,
}

impl CartController {
    /// Create a controller with an empty cache.
    #[must_use]
    pub fn new(api: CartApi) -> Self {
        Self {
            api,
            state: CartState::default(),
            products: ProductCache::new(),
        }
    }

    /// Current cart state.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// The underlying API client, for sign-in calls.
    #[must_use]
    pub const fn api(&self) -> &CartApi {
        &self.api
    }

    /// Remember products seen while browsing, for stock checks.
    pub fn remember_products(&mut self, products: impl IntoIterator<Item = Product>) {
        self.products.replace(products);
    }

    /// Reload the cart from the server.
    pub async fn refresh(&mut self) -> &CartState {
        self.state.apply(CartAction::Requested);
        let result = self.api.fetch_items().await;
        self.finish(result)
    }

    /// Add units of a product.
    pub async fn add(&mut self, product_id: ProductId, quantity: Quantity) -> &CartState {
        self.submit(CartIntent::Add {
            product_id,
            quantity,
        })
        .await
    }

    /// Add one unit to a line.
    pub async fn increment(&mut self, product_id: ProductId) -> &CartState {
        self.submit(CartIntent::Increment(product_id)).await
    }

    /// Take one unit off a line.
    pub async fn decrement(&mut self, product_id: ProductId) -> &CartState {
        self.submit(CartIntent::Decrement(product_id)).await
    }

    /// Remove a line.
    pub async fn remove(&mut self, product_id: &ProductId) -> &CartState {
        self.state.apply(CartAction::Requested);
        let result = self.api.remove_item(product_id).await;
        self.finish(result)
    }

    async fn submit(&mut self, intent: CartIntent) -> &CartState {
        let result = match guard::plan(intent, &self.state, &self.products) {
            Plan::Blocked { notice } => {
                if let Some(message) = notice {
                    self.state.apply(CartAction::Advised { message });
                }
                return &self.state;
            }
            Plan::Add {
                product_id,
                quantity,
            } => {
                self.state.apply(CartAction::Requested);
                self.api.add_item(&product_id, quantity).await
            }
            Plan::Update {
                product_id,
                quantity,
            } => {
                self.state.apply(CartAction::Requested);
                self.api.update_quantity(&product_id, quantity).await
            }
            Plan::Remove { product_id, notice } => {
                self.state.apply(CartAction::Requested);
                let result = self.api.remove_item(&product_id).await;
                if let Some(message) = notice {
                    self.finish(result);
                    self.state.apply(CartAction::Advised { message });
                    return &self.state;
                }
                result
            }
        };
        self.finish(result)
    }

    fn finish(&mut self, result: Result<CartSnapshot, ApiError>) -> &CartState {
        match result {
            Ok(snapshot) => self.state.apply(CartAction::Succeeded {
                lines: snapshot.lines,
                owner: snapshot.owner,
            }),
            Err(err) => {
                tracing::debug!(error = %err, "Cart request failed");
                self.state.apply(CartAction::Failed {
                    message: err.notice(),
                });
            }
        }
        &self.state
    }
}
