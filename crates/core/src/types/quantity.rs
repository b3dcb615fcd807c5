//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when building a [`Quantity`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Zero or negative quantities are never stored.
    #[error("quantity must be at least 1")]
    NotPositive,
    /// The value does not fit in a quantity.
    #[error("quantity is too large")]
    TooLarge,
}

/// A line quantity; always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A quantity of one.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, returning `None` for zero.
    #[must_use]
    pub const fn new(value: u32) -> Option<Self> {
        match NonZeroU32::new(value) {
            Some(n) => Some(Self(n)),
            None => None,
        }
    }

    /// Get the quantity as a plain integer.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add two quantities, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.get()).map(Self)
    }

    /// Add two quantities, clamping at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.get()))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(QuantityError::NotPositive)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(QuantityError::NotPositive);
        }
        let value = u32::try_from(value).map_err(|_| QuantityError::TooLarge)?;
        Self::try_from(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.get()
    }
}
