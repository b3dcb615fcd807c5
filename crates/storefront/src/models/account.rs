//! Account domain type.
//!
//! Separate from the row types in `db::accounts`; values here are validated.

use chrono::{DateTime, Utc};

use shopfront_core::AccountId;
use shopfront_core::Email;
use shopfront_core::api::{AuthUser, Role};

/// A registered shopper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Unique account ID.
    pub id: AccountId,
    /// Display name chosen at registration.
    pub user_name: String,
    /// Sign-in email address.
    pub email: Email,
    /// Account role.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// The account as reported by the auth endpoints.
    #[must_use]
    pub fn to_auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            email: self.email.clone(),
            user_name: self.user_name.clone(),
            role: self.role,
        }
    }
}
