//! Typed client for the storefront REST API.
//!
//! The session cookie is kept by `reqwest`'s cookie store, so one `CartApi`
//! is one shopper.

use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use shopfront_core::api::{
    ApiResponse, AuthUser, CartItemRequest, CartResponse, LoginRequest, RegisterRequest,
};
use shopfront_core::{AccountId, PopulatedCartLine, ProductId, Quantity};

use crate::error::ApiError;

/// A cart as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub lines: Vec<PopulatedCartLine>,
    /// Account owning the cart; `None` for a guest cart.
    pub owner: Option<AccountId>,
}

/// Storefront API client.
#[derive(Debug, Clone)]
pub struct CartApi {
    client: Client,
    base_url: Url,
}

impl CartApi {
    /// Create a client for the server at `base_url`, with its own cookie jar.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` does not parse, or
    /// `ApiError::Request` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::Request(e.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Create a client over an existing `reqwest::Client`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` does not parse.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// `POST /api/shop/cart/add`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, ApiError> {
        let body = CartItemRequest::new(product_id.as_str(), i64::from(quantity.get()));
        self.cart(Method::POST, "api/shop/cart/add", Some(&body))
            .await
    }

    /// `GET /api/shop/cart/get`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self))]
    pub async fn fetch_items(&self) -> Result<CartSnapshot, ApiError> {
        self.cart::<()>(Method::GET, "api/shop/cart/get", None).await
    }

    /// `PUT /api/shop/cart/update`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: Quantity,
    ) -> Result<CartSnapshot, ApiError> {
        let body = CartItemRequest::new(product_id.as_str(), i64::from(quantity.get()));
        self.cart(Method::PUT, "api/shop/cart/update", Some(&body))
            .await
    }

    /// `DELETE /api/shop/cart/delete/{productId}`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> Result<CartSnapshot, ApiError> {
        let path = format!("api/shop/cart/delete/{product_id}");
        self.cart::<()>(Method::DELETE, &path, None).await
    }

    /// `POST /api/auth/register`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthUser, ApiError> {
        self.send(Method::POST, "api/auth/register", Some(request))
            .await?
            .data
            .ok_or_else(|| ApiError::Response("missing account in response".to_string()))
    }

    /// `POST /api/auth/login`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthUser, ApiError> {
        self.send(Method::POST, "api/auth/login", Some(request))
            .await?
            .data
            .ok_or_else(|| ApiError::Response("missing account in response".to_string()))
    }

    /// `POST /api/auth/logout`
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails or the server reports a failure.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.send::<(), serde_json::Value>(Method::POST, "api/auth/logout", None)
            .await
            .map(|_| ())
    }

    async fn cart<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<CartSnapshot, ApiError> {
        let envelope: CartResponse = self.send(method, path, body).await?;
        Ok(CartSnapshot {
            lines: envelope.data.unwrap_or_default(),
            owner: envelope.user_id,
        })
    }

    async fn send<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Request(e.to_string()))?;
        let status = response.status();

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Response(e.to_string()))?;

        if !envelope.success || !status.is_success() {
            let message = envelope
                .message
                .unwrap_or_else(|| "Unknown error".to_string());
            warn!(status = status.as_u16(), message = %message, "Storefront request failed");
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        debug!(status = status.as_u16(), "Storefront request succeeded");
        Ok(envelope)
    }
}
