//! Cart route handlers.
//!
//! Identity comes from the session via [`CartIdentity`]; request bodies never
//! name an owner. Every success returns the populated lines, with `userId`
//! set when the cart belongs to an account.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::instrument;

use shopfront_core::api::{ApiResponse, CartItemRequest, CartResponse};
use shopfront_core::{Identity, PopulatedCartLine};

use crate::error::Result;
use crate::middleware::CartIdentity;
use crate::services::cart::{parse_item, parse_product_id};
use crate::state::AppState;

fn respond(identity: Identity, lines: Vec<PopulatedCartLine>) -> Json<CartResponse> {
    Json(ApiResponse::ok(lines).with_owner(identity.account()))
}

/// `POST /api/shop/cart/add`
#[instrument(skip_all, fields(identity = %identity))]
pub async fn add(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
    payload: std::result::Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(body) = payload?;
    let (product_id, quantity) = parse_item(body.product_id.as_deref(), body.quantity)?;

    let lines = state
        .carts()
        .add_item(identity, &product_id, quantity)
        .await?;

    Ok(respond(identity, lines))
}

/// `GET /api/shop/cart/get`
#[instrument(skip_all, fields(identity = %identity))]
pub async fn fetch(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
) -> Result<Json<CartResponse>> {
    let lines = state.carts().fetch_items(identity).await?;
    Ok(respond(identity, lines))
}

/// `PUT /api/shop/cart/update`
#[instrument(skip_all, fields(identity = %identity))]
pub async fn update(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
    payload: std::result::Result<Json<CartItemRequest>, JsonRejection>,
) -> Result<Json<CartResponse>> {
    let Json(body) = payload?;
    let (product_id, quantity) = parse_item(body.product_id.as_deref(), body.quantity)?;

    let lines = state
        .carts()
        .update_quantity(identity, &product_id, quantity)
        .await?;

    Ok(respond(identity, lines))
}

/// `DELETE /api/shop/cart/delete/{product_id}`
#[instrument(skip_all, fields(identity = %identity, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    CartIdentity(identity): CartIdentity,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>> {
    let product_id = parse_product_id(&product_id)?;

    let lines = state.carts().remove_item(identity, &product_id).await?;

    Ok(respond(identity, lines))
}
