//! Cart error types.

use thiserror::Error;

use shopfront_core::LineError;

use super::store::StoreError;
use crate::db::RepositoryError;

/// Errors that can occur during cart operations.
///
/// The `Display` text of the client-facing variants is the message returned
/// in the response envelope.
#[derive(Debug, Error)]
pub enum CartError {
    /// Missing or malformed product id or quantity.
    #[error("{0}")]
    InvalidInput(String),

    /// The product does not resolve.
    #[error("Product not found")]
    ProductNotFound,

    /// No cart record exists for the identity.
    #[error("Cart not found")]
    CartNotFound,

    /// The cart has no line for the product.
    #[error("Item not found")]
    ItemNotFound,

    /// The resulting quantity exceeds current stock.
    #[error("Only {available} units available")]
    InsufficientStock {
        /// Units in stock.
        available: u32,
    },

    /// Write attempts were exhausted by concurrent modifications.
    #[error("Cart was modified concurrently, please retry")]
    Conflict,

    /// Persistence or product lookup failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl CartError {
    /// Message used for every invalid body, as clients expect it verbatim.
    pub const INVALID_DATA: &'static str = "Invalid data provided!";

    /// The generic invalid-input error.
    #[must_use]
    pub fn invalid_data() -> Self {
        Self::InvalidInput(Self::INVALID_DATA.to_owned())
    }
}

impl From<LineError> for CartError {
    fn from(err: LineError) -> Self {
        match err {
            LineError::ItemNotFound(_) => Self::ItemNotFound,
            LineError::Overflow(_) => Self::InvalidInput("Quantity is too large".to_owned()),
        }
    }
}

impl From<RepositoryError> for CartError {
    fn from(err: RepositoryError) -> Self {
        Self::Storage(StoreError::Repository(err))
    }
}
