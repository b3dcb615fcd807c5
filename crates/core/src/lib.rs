//! Shopfront Core - Shared cart types.
//!
//! This crate provides the types shared by every Shopfront component:
//! - `storefront` - REST server that owns cart reconciliation
//! - `client` - Client-side cart cache and typed API client
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Cart line arithmetic (increment, absolute set,
//! removal, additive merge) lives here so the server and client agree on it.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, quantities and emails
//! - [`cart`] - Cart lines, populated lines and line arithmetic
//! - [`product`] - Product lookup results
//! - [`identity`] - Per-request identity context
//! - [`api`] - JSON envelope and request bodies of the REST surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod identity;
pub mod product;
pub mod types;

pub use cart::{CartLine, CartLines, LineError, PopulatedCartLine, ProductSnapshot};
pub use identity::Identity;
pub use product::Product;
pub use types::*;
