//! Business logic services for storefront.
//!
//! # Services
//!
//! - `cart` - Cart reconciliation for guests and accounts
//! - `auth` - Password registration and sign-in

pub mod auth;
pub mod cart;
