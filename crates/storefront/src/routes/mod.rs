//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Liveness
//! GET    /health/ready                    - Readiness (database ping)
//!
//! # Cart (JSON envelope, identity from the session)
//! POST   /api/shop/cart/add               - Add units of a product
//! GET    /api/shop/cart/get               - Fetch (and prune) the cart
//! PUT    /api/shop/cart/update            - Set a line's quantity
//! DELETE /api/shop/cart/delete/{productId} - Remove a line
//!
//! # Auth
//! POST   /api/auth/register               - Create account, merge guest cart, sign in
//! POST   /api/auth/login                  - Verify password, merge guest cart, sign in
//! POST   /api/auth/logout                 - Destroy the session
//! ```

pub mod auth;
pub mod cart;
pub mod health;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::state::AppState;

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/get", get(cart::fetch))
        .route("/update", put(cart::update))
        .route("/delete/{product_id}", delete(cart::remove))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Create the full application router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/shop/cart", cart_routes())
        .nest("/api/auth", auth_routes())
}
