//! Pre-submit checks against locally cached product data.
//!
//! The server has the final say on stock. These checks only save a round
//! trip when the client already knows the answer.

use std::collections::HashMap;

use shopfront_core::{Product, ProductId, Quantity};

use crate::state::CartState;

/// Advisory shown when a cached line's product has left the catalog.
pub const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Products the client has seen while browsing, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProductCache {
    products: HashMap<ProductId, Product>,
}

impl ProductCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cached product list.
    pub fn replace(&mut self, products: impl IntoIterator<Item = Product>) {
        self.products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
    }

    /// Add or refresh one product.
    pub fn insert(&mut self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    /// Look up a product.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.products.get(id)
    }
}

/// What the shopper asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartIntent {
    /// Add units from a product page.
    Add {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Plus button on a cart line.
    Increment(ProductId),
    /// Minus button on a cart line.
    Decrement(ProductId),
}

/// The request to send, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    Add {
        product_id: ProductId,
        quantity: Quantity,
    },
    Update {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Remove the line; `notice` explains why when it was not asked for.
    Remove {
        product_id: ProductId,
        notice: Option<String>,
    },
    /// Send nothing.
    Blocked { notice: Option<String> },
}

fn over_stock(product: &Product, wanted: u32) -> Option<Plan> {
    (wanted > product.total_stock).then(|| Plan::Blocked {
        notice: Some(format!("Only {} units available", product.total_stock)),
    })
}

/// Decide which request, if any, an intent turns into.
#[must_use]
pub fn plan(intent: CartIntent, cart: &CartState, products: &ProductCache) -> Plan {
    match intent {
        CartIntent::Add {
            product_id,
            quantity,
        } => {
            // Without cached stock the server decides.
            if let Some(product) = products.get(&product_id) {
                let in_cart = cart.line(&product_id).map_or(0, |l| l.quantity.get());
                if let Some(blocked) =
                    over_stock(product, in_cart.saturating_add(quantity.get()))
                {
                    return blocked;
                }
            }
            Plan::Add {
                product_id,
                quantity,
            }
        }
        CartIntent::Increment(product_id) => {
            let Some(product) = products.get(&product_id) else {
                return Plan::Remove {
                    product_id,
                    notice: Some(PRODUCT_NOT_FOUND.to_string()),
                };
            };
            // The server only updates existing lines.
            let Some(line) = cart.line(&product_id) else {
                return over_stock(product, 1).unwrap_or(Plan::Add {
                    product_id,
                    quantity: Quantity::ONE,
                });
            };
            let next = line.quantity.saturating_add(Quantity::ONE);
            over_stock(product, next.get()).unwrap_or(Plan::Update {
                product_id,
                quantity: next,
            })
        }
        CartIntent::Decrement(product_id) => {
            if products.get(&product_id).is_none() {
                return Plan::Remove {
                    product_id,
                    notice: Some(PRODUCT_NOT_FOUND.to_string()),
                };
            }
            let current = cart.line(&product_id).map_or(0, |l| l.quantity.get());
            match Quantity::new(current.saturating_sub(1)) {
                Some(quantity) => Plan::Update {
                    product_id,
                    quantity,
                },
                // Below one is a removal, which the shopper asks for explicitly.
                None => Plan::Blocked { notice: None },
            }
        }
    }
}
