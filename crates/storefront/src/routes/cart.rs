//! Cart route handlers.
//!
//! Every change is applied through the visitor's store and the cart slice is
//! written back to the session so a new store starts from the same cart.

use axum::{Json, extract::Path, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crown_core::{Price, ProductId};

use super::categories::loaded_catalog;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::Visitor;
use crate::models::{CartItem, Product};
use crate::store::{
    CartAction, RootState, select_cart_count, select_cart_items, select_cart_total,
    select_categories, select_is_cart_open,
};

/// Cart contents with the derived count and total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub is_cart_open: bool,
    pub items: Vec<CartItem>,
    pub count: u32,
    pub total: Price,
}

impl From<&RootState> for CartView {
    fn from(state: &RootState) -> Self {
        Self {
            is_cart_open: select_is_cart_open(state),
            items: select_cart_items(state).to_vec(),
            count: select_cart_count(state),
            total: select_cart_total(state),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOpenRequest {
    pub is_cart_open: bool,
}

async fn apply(visitor: &Visitor, action: CartAction) -> Result<Json<CartView>> {
    visitor.store().dispatch(action);
    visitor.persist().await?;
    Ok(Json(visitor.store().select(|s| CartView::from(s))))
}

fn cart_line(visitor: &Visitor, id: ProductId) -> Result<Product> {
    visitor
        .store()
        .select(|s| {
            select_cart_items(s)
                .iter()
                .find(|item| item.id == id)
                .map(CartItem::product)
        })
        .ok_or_else(|| AppError::NotFound(format!("product {id} in cart")))
}

/// Current cart.
pub async fn show(visitor: Visitor) -> Json<CartView> {
    Json(visitor.store().select(|s| CartView::from(s)))
}

/// Add one unit of a catalog product.
#[instrument(skip(visitor), fields(visitor = %visitor.id))]
pub async fn add_item(
    visitor: Visitor,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let state = loaded_catalog(&visitor).await?;
    let product = select_categories(&state)
        .iter()
        .flat_map(|category| category.items.iter())
        .find(|product| product.id == request.product_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {}", request.product_id)))?;

    add_breadcrumb(
        "cart",
        "Added item to cart",
        Some(&[("product_id", &product.id.to_string())]),
    );
    apply(&visitor, CartAction::AddItemToCart(product)).await
}

/// Remove one unit; the line goes away when its quantity reaches zero.
#[instrument(skip(visitor), fields(visitor = %visitor.id))]
pub async fn remove_item(visitor: Visitor, Path(id): Path<ProductId>) -> Result<Json<CartView>> {
    let product = cart_line(&visitor, id)?;
    apply(&visitor, CartAction::RemoveItemFromCart(product)).await
}

/// Remove a whole line regardless of quantity.
#[instrument(skip(visitor), fields(visitor = %visitor.id))]
pub async fn clear_item(visitor: Visitor, Path(id): Path<ProductId>) -> Result<Json<CartView>> {
    let product = cart_line(&visitor, id)?;
    apply(&visitor, CartAction::ClearItemFromCart(product)).await
}

/// Open or close the cart drawer.
pub async fn set_open(
    visitor: Visitor,
    Json(request): Json<CartOpenRequest>,
) -> Result<Json<CartView>> {
    apply(&visitor, CartAction::SetIsCartOpen(request.is_cart_open)).await
}

/// Empty the cart.
pub async fn clear(visitor: Visitor) -> Result<StatusCode> {
    visitor.store().dispatch(CartAction::ClearCart);
    visitor.persist().await?;
    Ok(StatusCode::NO_CONTENT)
}
