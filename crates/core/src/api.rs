//! JSON shapes of the REST surface, shared by server and client.
//!
//! Every response is an [`ApiResponse`] envelope:
//!
//! ```json
//! { "success": true, "data": [ ... ], "userId": 7 }
//! { "success": false, "message": "Item not found" }
//! ```
//!
//! `userId` is present only when the cart belongs to a signed-in account.

use serde::{Deserialize, Serialize};

use crate::cart::PopulatedCartLine;
use crate::types::{AccountId, Email};

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<AccountId>,
}

impl<T> ApiResponse<T> {
    /// A successful response carrying `data`.
    #[must_use]
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            user_id: None,
        }
    }

    /// A successful response with only a message.
    #[must_use]
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            user_id: None,
        }
    }

    /// A failed response with a user-facing message.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            user_id: None,
        }
    }

    /// Attach a message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Mark the owning account (or none, for a guest).
    #[must_use]
    pub fn with_owner(mut self, owner: Option<AccountId>) -> Self {
        self.user_id = owner;
        self
    }
}

/// Envelope of every cart endpoint.
pub type CartResponse = ApiResponse<Vec<PopulatedCartLine>>;

/// Body of `POST /cart/add` and `PUT /cart/update`.
///
/// Fields are optional so that a missing product id or quantity is reported
/// as invalid input rather than a deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
}

impl CartItemRequest {
    /// Build a request body.
    #[must_use]
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id.into()),
            quantity: Some(quantity),
        }
    }
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub user_name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse the stored representation, defaulting unknown values to `User`.
    #[must_use]
    pub fn from_db(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// Signed-in account as reported by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: AccountId,
    pub email: Email,
    pub user_name: String,
    pub role: Role,
}
