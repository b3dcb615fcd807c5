//! Product lookup results.
//!
//! The catalog itself is managed elsewhere; carts only ever read a product's
//! current display fields and stock through this type.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::ProductSnapshot;
use crate::types::{ProductId, Quantity};

/// A product as returned by the product lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Catalog identifier.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Image URL, if any.
    pub image: Option<String>,
    /// List price.
    pub price: Decimal,
    /// Sale price; only meaningful when greater than zero.
    pub sale_price: Option<Decimal>,
    /// Units available.
    pub total_stock: u32,
}

impl Product {
    /// The fields joined onto a cart line at read time.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            title: self.title.clone(),
            image: self.image.clone(),
            price: self.price,
            sale_price: self.sale_price,
        }
    }

    /// Whether `quantity` units can be supplied from current stock.
    #[must_use]
    pub const fn has_stock_for(&self, quantity: Quantity) -> bool {
        quantity.get() <= self.total_stock
    }
}
