//! Newtype ids for the three kinds of cart owner and line key.
//!
//! - [`AccountId`] - database id of a registered account (integer)
//! - [`GuestId`] - random id minted for an anonymous session
//! - [`ProductId`] - catalog identifier carried in cart lines
//!
//! A guest id cannot be passed where an account id is expected.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Implements `sqlx` `Type`, `Encode` and `Decode` for a single-field newtype
/// by delegating to the wrapped type.
///
/// Database values are assumed valid; validation happens on the way in.
#[cfg(feature = "postgres")]
macro_rules! impl_pg_transparent {
    ($name:ident, $inner:ty) => {
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                Ok(Self(<$inner as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?))
            }
        }

        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::core::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <$inner as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

// =============================================================================
// AccountId
// =============================================================================

/// Id of a registered account; owns at most one durable cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i32);

impl AccountId {
    /// Wrap a raw database id.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Get the underlying i32 value.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for AccountId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

// =============================================================================
// GuestId
// =============================================================================

/// Id of an anonymous shopper, minted once per session and stored in it.
///
/// The guest cart is keyed by this value, so it lives exactly as long as the
/// session that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuestId(Uuid);

impl GuestId {
    /// Mint a fresh random guest id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for GuestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ProductId
// =============================================================================

/// Errors that can occur when parsing a [`ProductId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductIdError {
    /// The input was empty or whitespace.
    #[error("product id cannot be empty")]
    Empty,
    /// The input is longer than [`ProductId::MAX_LENGTH`].
    #[error("product id must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("product id contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Catalog identifier of a product, unique within a cart's lines.
///
/// Accepts ASCII letters, digits, `-` and `_` (document ids such as
/// `65f1c0ffee0123456789abcd` as well as short seeds like `P1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Maximum length of a product id.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `ProductId`, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, or contains
    /// characters other than ASCII alphanumerics, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, ProductIdError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ProductIdError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(ProductIdError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ProductIdError::InvalidCharacter(c));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ProductId {
    type Err = ProductIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProductId {
    type Error = ProductIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl_pg_transparent!(AccountId, i32);
#[cfg(feature = "postgres")]
impl_pg_transparent!(GuestId, Uuid);
#[cfg(feature = "postgres")]
impl_pg_transparent!(ProductId, String);
