//! Integration tests for Shopfront.
//!
//! These talk HTTP to a running storefront seeded with the products in
//! `fixtures/products.yaml`, and are ignored by default.
//!
//! # Running Tests
//!
//! ```bash
//! cargo run -p shopfront-cli -- migrate
//! cargo run -p shopfront-cli -- seed products crates/integration-tests/fixtures/products.yaml
//! cargo run -p shopfront-storefront &
//! cargo test -p shopfront-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_BASE_URL` selects the server (default `http://localhost:3000`).

use reqwest::{Client, Method, StatusCode};
use serde_json::Value;

/// Base URL for the storefront API.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// A shopper: one cookie jar against the storefront.
#[derive(Debug, Clone)]
pub struct Shopper {
    client: Client,
    base_url: String,
}

impl Shopper {
    /// Create a shopper with an empty cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create HTTP client"),
            base_url: storefront_base_url(),
        }
    }

    /// Send a request and decode the JSON envelope.
    ///
    /// # Panics
    ///
    /// Panics if the server cannot be reached or does not answer with JSON.
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = self
            .client
            .request(method, format!("{}{path}", self.base_url));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.expect("Failed to reach storefront");
        let status = response.status();
        let body = response.json().await.expect("Response is not JSON");
        (status, body)
    }
}

impl Default for Shopper {
    fn default() -> Self {
        Self::new()
    }
}

/// A unique email for a throwaway account.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", uuid::Uuid::new_v4())
}
