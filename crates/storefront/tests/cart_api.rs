//! Router tests over in-memory stores.
//!
//! Each test drives the full middleware stack with `oneshot`, carrying the
//! session cookie between requests the way a browser would.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use shopfront_core::{AccountId, GuestId, Product, ProductId};
use shopfront_storefront::app;
use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::services::auth::MemoryAccounts;
use shopfront_storefront::services::cart::{
    CartPolicy, CartService, CartStore, MemoryCartStore, MemoryCatalog,
};
use shopfront_storefront::state::AppState;

struct TestApp {
    router: Router,
    catalog: MemoryCatalog,
    guests: Arc<MemoryCartStore<GuestId>>,
    accounts: Arc<MemoryCartStore<AccountId>>,
    cookie: Option<String>,
}

fn product(id: &str, price: i64, stock: u32) -> Product {
    Product {
        id: ProductId::parse(id).unwrap(),
        title: format!("Product {id}"),
        image: Some(format!("https://cdn.example/{id}.jpg")),
        price: Decimal::new(price, 2),
        sale_price: None,
        total_stock: stock,
    }
}

fn config() -> StorefrontConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("STOREFRONT_DATABASE_URL", "postgres://unused/shop"),
        ("STOREFRONT_BASE_URL", "http://localhost:3000"),
    ]);
    StorefrontConfig::from_lookup(&|key| vars.get(key).map(|v| (*v).to_string())).unwrap()
}

impl TestApp {
    fn new() -> Self {
        let catalog = MemoryCatalog::with_products([
            product("P1", 1000, 10),
            product("P2", 550, 3),
        ]);
        let guests = Arc::new(MemoryCartStore::<GuestId>::new());
        let accounts = Arc::new(MemoryCartStore::<AccountId>::new());

        let carts = CartService::new(
            guests.clone(),
            accounts.clone(),
            Arc::new(catalog.clone()),
            CartPolicy::default(),
        );
        let state = AppState::from_parts(config(), carts, Arc::new(MemoryAccounts::new()));

        Self {
            router: app(state, MemoryStore::default()),
            catalog,
            guests,
            accounts,
            cookie: None,
        }
    }

    async fn send(&mut self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        // Health endpoints answer in plain text.
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn send_raw(&mut self, method: &str, uri: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn add(&mut self, product_id: &str, quantity: i64) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/shop/cart/add",
            Some(json!({ "productId": product_id, "quantity": quantity })),
        )
        .await
    }

    async fn register(&mut self, email: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            "/api/auth/register",
            Some(json!({ "userName": "Shopper", "email": email, "password": "correct horse" })),
        )
        .await
    }
}

fn quantities(body: &Value) -> Vec<(String, u64)> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|line| {
            (
                line["productId"].as_str().unwrap().to_string(),
                line["quantity"].as_u64().unwrap(),
            )
        })
        .collect()
}

#[tokio::test]
async fn health_is_ok() {
    let mut app = TestApp::new();
    let (status, _) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_bodies_are_invalid_data() {
    let mut app = TestApp::new();

    let (status, body) = app.send_raw("POST", "/api/shop/cart/add", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "success": false, "message": "Invalid data provided!" })
    );

    let (status, body) = app
        .send("POST", "/api/shop/cart/add", Some(json!({ "productId": "P1" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid data provided!");

    let (status, _) = app.add("P1", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.add("P1", -3).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn guest_add_fetch_update_delete() {
    let mut app = TestApp::new();

    let (status, body) = app.add("P1", 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body.get("userId").is_none());
    assert_eq!(quantities(&body), vec![("P1".to_string(), 2)]);
    assert_eq!(body["data"][0]["title"], "Product P1");
    assert!(app.cookie.is_some(), "first cart request issues a session");

    let (_, body) = app.add("P1", 3).await;
    assert_eq!(quantities(&body), vec![("P1".to_string(), 5)]);

    let (status, body) = app.send("GET", "/api/shop/cart/get", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quantities(&body), vec![("P1".to_string(), 5)]);

    let (status, body) = app
        .send(
            "PUT",
            "/api/shop/cart/update",
            Some(json!({ "productId": "P1", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quantities(&body), vec![("P1".to_string(), 1)]);

    let (status, body) = app.send("DELETE", "/api/shop/cart/delete/P1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn not_found_messages() {
    let mut app = TestApp::new();

    let (status, body) = app.add("NOPE", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (status, body) = app.send("DELETE", "/api/shop/cart/delete/P1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cart not found");

    app.add("P1", 1).await;
    let (status, body) = app
        .send(
            "PUT",
            "/api/shop/cart/update",
            Some(json!({ "productId": "P2", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Item not found");
}

#[tokio::test]
async fn stock_is_enforced() {
    let mut app = TestApp::new();

    let (status, body) = app.add("P2", 4).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only 3 units available");

    app.add("P2", 3).await;
    let (status, _) = app.add("P2", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn fetch_prunes_deleted_products() {
    let mut app = TestApp::new();
    app.add("P1", 1).await;
    app.add("P2", 1).await;

    app.catalog.delete(&ProductId::parse("P1").unwrap()).await;

    let (_, body) = app.send("GET", "/api/shop/cart/get", None).await;
    assert_eq!(quantities(&body), vec![("P2".to_string(), 1)]);
}

#[tokio::test]
async fn sessions_do_not_share_carts() {
    let mut first = TestApp::new();
    first.add("P1", 2).await;

    let mut second = TestApp {
        router: first.router.clone(),
        catalog: first.catalog.clone(),
        guests: first.guests.clone(),
        accounts: first.accounts.clone(),
        cookie: None,
    };
    let (status, body) = second.send("GET", "/api/shop/cart/get", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn register_merges_guest_cart_into_account() {
    let mut app = TestApp::new();
    app.add("P1", 2).await;
    let guest_cookie = app.cookie.clone();

    let (status, body) = app.register("shopper@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Registration successful");
    let account_id = body["userId"].as_i64().unwrap();
    assert_ne!(app.cookie, guest_cookie, "session id is cycled on sign-in");

    let (_, body) = app.send("GET", "/api/shop/cart/get", None).await;
    assert_eq!(body["userId"], account_id);
    assert_eq!(quantities(&body), vec![("P1".to_string(), 2)]);

    let account = AccountId::new(i32::try_from(account_id).unwrap());
    let stored = app.accounts.load(&account).await.unwrap().unwrap();
    assert_eq!(stored.lines.len(), 1);

    // The guest record that fed the merge is left empty.
    for guest in app.guests.owners().await {
        let cart = app.guests.load(&guest).await.unwrap().unwrap();
        assert!(cart.lines.is_empty());
    }
}

#[tokio::test]
async fn login_adds_guest_lines_to_existing_account_cart() {
    let mut app = TestApp::new();
    app.register("returning@example.com").await;
    app.add("P1", 1).await;

    let (status, body) = app.send("POST", "/api/auth/logout", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged out successfully!");
    app.cookie = None;

    app.add("P1", 2).await;
    app.add("P2", 1).await;

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "returning@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logged in successfully");

    let (_, body) = app.send("GET", "/api/shop/cart/get", None).await;
    assert_eq!(
        quantities(&body),
        vec![("P1".to_string(), 3), ("P2".to_string(), 1)]
    );
}

#[tokio::test]
async fn auth_failures() {
    let mut app = TestApp::new();

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "ghost@example.com", "password": "whatever1" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found! Please register first");

    app.register("taken@example.com").await;
    let (status, body) = app.register("taken@example.com").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists with this email!");

    let (status, body) = app
        .send(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "taken@example.com", "password": "wrong password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials!");
}

#[tokio::test]
async fn every_request_extends_the_session() {
    let mut app = TestApp::new();
    app.add("P1", 1).await;
    let first = app.cookie.clone().unwrap();

    let request = Request::builder()
        .uri("/api/shop/cart/get")
        .header(header::COOKIE, &first)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with(&first));
    assert!(set_cookie.contains("Max-Age="));
}

#[tokio::test]
async fn responses_carry_request_id() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}
