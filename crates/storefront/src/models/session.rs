//! Session-related types.
//!
//! Types stored in the session for identity resolution.

use serde::{Deserialize, Serialize};

use shopfront_core::{AccountId, Email};

/// Session-stored account identity.
///
/// Minimal data stored in the session to identify the signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// Account database ID.
    pub id: AccountId,
    /// Account email address.
    pub email: Email,
    /// Display name.
    pub user_name: String,
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in account.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous shopper's guest cart id.
    pub const GUEST_ID: &str = "guest_id";
}
