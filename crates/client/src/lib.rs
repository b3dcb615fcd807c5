//! Shopfront Client - client-side cart cache and API client.
//!
//! The server owns the cart; the client keeps a copy of the last response and
//! replaces it wholesale on every successful mutation.
//!
//! # Modules
//!
//! - [`state`] - `CartState` and its reducer
//! - [`guard`] - Pre-submit stock checks against cached product data
//! - [`api`] - Typed `reqwest` client for the cart and auth endpoints
//! - [`controller`] - Ties the three together, one round trip per mutation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod controller;
pub mod error;
pub mod guard;
pub mod state;

pub use api::CartApi;
pub use controller::CartController;
pub use error::ApiError;
pub use guard::{CartIntent, Plan, ProductCache};
pub use state::{CartAction, CartState};
