//! Per-request identity context.

use core::fmt;

use crate::types::{AccountId, GuestId};

/// Who a cart request acts for.
///
/// Resolved once per request from the session. Every cart operation is
/// parameterized by it and only ever touches the store of its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    /// An anonymous shopper; the cart lives with the session.
    Anonymous(GuestId),
    /// A signed-in account; the cart is durable.
    Authenticated(AccountId),
}

impl Identity {
    /// The account id, when signed in.
    #[must_use]
    pub const fn account(&self) -> Option<AccountId> {
        match self {
            Self::Authenticated(id) => Some(*id),
            Self::Anonymous(_) => None,
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous(id) => write!(f, "guest:{id}"),
            Self::Authenticated(id) => write!(f, "account:{id}"),
        }
    }
}
