//! Cart lines and the arithmetic applied to them.
//!
//! A cart is an ordered list of [`CartLine`]s with at most one line per
//! product. Two kinds of quantity change exist and must not be confused:
//!
//! - [`CartLines::add`] and [`CartLines::merge`] are **additive**: the new
//!   quantity is added to whatever the line already holds.
//! - [`CartLines::set_quantity`] is **absolute**: the line ends up holding
//!   exactly the given quantity.
//!
//! Populated lines ([`PopulatedCartLine`]) join a stored line with live
//! product fields. They are built for responses only and never persisted, so
//! price changes show up on the next read.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProductId, Quantity};

/// A stored cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product this line refers to.
    pub product_id: ProductId,
    /// Units of the product; never zero.
    pub quantity: Quantity,
}

impl CartLine {
    /// Create a line.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// Errors from line arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// No line exists for the product.
    #[error("no line for product {0}")]
    ItemNotFound(ProductId),
    /// The resulting quantity would not fit.
    #[error("quantity overflow for product {0}")]
    Overflow(ProductId),
}

/// The lines of one cart, unique by product id.
///
/// Deserializing folds duplicate product ids into a single line (quantities
/// added, saturating), so a hand-edited or legacy document cannot break the
/// uniqueness invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct CartLines(Vec<CartLine>);

impl CartLines {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[CartLine] {
        &self.0
    }

    /// Number of lines (not units).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Quantity currently held for a product.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> Option<Quantity> {
        self.line(product_id).map(|line| line.quantity)
    }

    /// Whether a line exists for a product.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.line(product_id).is_some()
    }

    /// Add `quantity` units of a product: increments an existing line or
    /// appends a new one. Returns the line's resulting quantity.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::Overflow`] if the sum does not fit; the cart is
    /// left unchanged.
    pub fn add(&mut self, product_id: &ProductId, quantity: Quantity) -> Result<Quantity, LineError> {
        match self.0.iter_mut().find(|line| &line.product_id == product_id) {
            Some(line) => {
                line.quantity = line
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| LineError::Overflow(product_id.clone()))?;
                Ok(line.quantity)
            }
            None => {
                self.0.push(CartLine::new(product_id.clone(), quantity));
                Ok(quantity)
            }
        }
    }

    /// Set a line to exactly `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::ItemNotFound`] if there is no line for the product.
    pub fn set_quantity(&mut self, product_id: &ProductId, quantity: Quantity) -> Result<(), LineError> {
        let line = self
            .0
            .iter_mut()
            .find(|line| &line.product_id == product_id)
            .ok_or_else(|| LineError::ItemNotFound(product_id.clone()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Remove the line for a product, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::ItemNotFound`] if there is no line for the product.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<CartLine, LineError> {
        let i = self
            .position(product_id)
            .ok_or_else(|| LineError::ItemNotFound(product_id.clone()))?;
        Ok(self.0.remove(i))
    }

    /// Fold another cart's lines into this one additively: matching lines
    /// have their quantities summed, the rest are appended in order.
    ///
    /// Returns the number of lines taken from `incoming`.
    ///
    /// # Errors
    ///
    /// Returns [`LineError::Overflow`] if any sum does not fit; the cart is
    /// left unchanged.
    pub fn merge(&mut self, incoming: &[CartLine]) -> Result<usize, LineError> {
        let mut merged = self.clone();
        for line in incoming {
            merged.add(&line.product_id, line.quantity)?;
        }
        *self = merged;
        Ok(incoming.len())
    }

    /// Keep only the lines for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&CartLine) -> bool) {
        self.0.retain(|line| keep(line));
    }

    /// Iterate over the lines.
    pub fn iter(&self) -> std::slice::Iter<'_, CartLine> {
        self.0.iter()
    }

    fn line(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.0.iter().find(|line| &line.product_id == product_id)
    }

    fn position(&self, product_id: &ProductId) -> Option<usize> {
        self.0.iter().position(|line| &line.product_id == product_id)
    }
}

impl From<Vec<CartLine>> for CartLines {
    fn from(lines: Vec<CartLine>) -> Self {
        let mut folded: Vec<CartLine> = Vec::with_capacity(lines.len());
        for line in lines {
            match folded.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
                None => folded.push(line),
            }
        }
        Self(folded)
    }
}

impl From<CartLines> for Vec<CartLine> {
    fn from(lines: CartLines) -> Self {
        lines.0
    }
}

impl<'a> IntoIterator for &'a CartLines {
    type Item = &'a CartLine;
    type IntoIter = std::slice::Iter<'a, CartLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Live product fields joined onto a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub title: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
}

/// A cart line joined with its product's current display fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedCartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub title: String,
    pub image: Option<String>,
    pub price: Decimal,
    pub sale_price: Option<Decimal>,
}

impl PopulatedCartLine {
    /// Join a stored line with a product snapshot.
    #[must_use]
    pub fn new(line: &CartLine, snapshot: ProductSnapshot) -> Self {
        Self {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            title: snapshot.title,
            image: snapshot.image,
            price: snapshot.price,
            sale_price: snapshot.sale_price,
        }
    }

    /// Price charged per unit: the sale price when it is set and positive,
    /// the list price otherwise.
    #[must_use]
    pub fn unit_price(&self) -> Decimal {
        match self.sale_price {
            Some(sale) if sale > Decimal::ZERO => sale,
            _ => self.price,
        }
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity.get())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::parse(s).unwrap()
    }

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[test]
    fn test_add_is_additive() {
        let mut cart = CartLines::new();
        assert_eq!(cart.add(&pid("p1"), qty(2)).unwrap(), qty(2));
        assert_eq!(cart.add(&pid("p1"), qty(3)).unwrap(), qty(5));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.quantity_of(&pid("p1")), Some(qty(5)));
    }

    #[test]
    fn test_set_quantity_is_absolute() {
        let mut cart = CartLines::new();
        cart.add(&pid("p1"), qty(2)).unwrap();
        cart.add(&pid("p1"), qty(3)).unwrap();
        cart.set_quantity(&pid("p1"), qty(4)).unwrap();
        assert_eq!(cart.quantity_of(&pid("p1")), Some(qty(4)));
    }

    #[test]
    fn test_set_and_remove_missing_line() {
        let mut cart = CartLines::new();
        assert_eq!(
            cart.set_quantity(&pid("p1"), qty(1)),
            Err(LineError::ItemNotFound(pid("p1")))
        );
        assert_eq!(
            cart.remove(&pid("p1")),
            Err(LineError::ItemNotFound(pid("p1")))
        );
    }

    #[test]
    fn test_remove_keeps_order_of_others() {
        let mut cart = CartLines::new();
        cart.add(&pid("a"), qty(1)).unwrap();
        cart.add(&pid("b"), qty(1)).unwrap();
        cart.add(&pid("c"), qty(1)).unwrap();
        cart.remove(&pid("b")).unwrap();
        let ids: Vec<&str> = cart.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[test]
    fn test_merge_adds_matching_and_appends_new() {
        let mut account = CartLines::new();
        account.add(&pid("p1"), qty(3)).unwrap();

        let session = vec![
            CartLine::new(pid("p1"), qty(2)),
            CartLine::new(pid("p2"), qty(1)),
        ];
        assert_eq!(account.merge(&session).unwrap(), 2);
        assert_eq!(account.quantity_of(&pid("p1")), Some(qty(5)));
        assert_eq!(account.quantity_of(&pid("p2")), Some(qty(1)));
    }

    #[test]
    fn test_merge_overflow_leaves_cart_untouched() {
        let mut account = CartLines::new();
        account.add(&pid("p1"), qty(u32::MAX)).unwrap();
        let before = account.clone();
        let session = vec![
            CartLine::new(pid("p2"), qty(1)),
            CartLine::new(pid("p1"), qty(1)),
        ];
        assert_eq!(account.merge(&session), Err(LineError::Overflow(pid("p1"))));
        assert_eq!(account, before);
    }

    #[test]
    fn test_deserialize_folds_duplicates() {
        let cart: CartLines = serde_json::from_str(
            r#"[{"productId":"p1","quantity":2},{"productId":"p2","quantity":1},{"productId":"p1","quantity":4}]"#,
        )
        .unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.quantity_of(&pid("p1")), Some(qty(6)));
    }

    #[test]
    fn test_unit_price_prefers_positive_sale_price() {
        let line = CartLine::new(pid("p1"), qty(3));
        let mut snapshot = ProductSnapshot {
            title: "Mug".to_string(),
            image: None,
            price: Decimal::new(1000, 2),
            sale_price: Some(Decimal::new(750, 2)),
        };
        let populated = PopulatedCartLine::new(&line, snapshot.clone());
        assert_eq!(populated.unit_price(), Decimal::new(750, 2));
        assert_eq!(populated.line_total(), Decimal::new(2250, 2));

        snapshot.sale_price = Some(Decimal::ZERO);
        let populated = PopulatedCartLine::new(&line, snapshot);
        assert_eq!(populated.unit_price(), Decimal::new(1000, 2));
    }

    #[test]
    fn test_populated_line_wire_shape() {
        let line = CartLine::new(pid("p1"), qty(2));
        let populated = PopulatedCartLine::new(
            &line,
            ProductSnapshot {
                title: "Mug".to_string(),
                image: Some("https://cdn.example.com/mug.png".to_string()),
                price: Decimal::new(1000, 2),
                sale_price: None,
            },
        );
        let json = serde_json::to_value(&populated).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["title"], "Mug");
        assert!(json.get("salePrice").is_some());
    }
}
