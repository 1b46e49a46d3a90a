//! Cart slice. This is the only slice persisted between requests.

use crown_core::Price;
use serde::{Deserialize, Serialize};

use super::RootState;
use super::action::{Action, CartAction};
use crate::models::{CartItem, Product};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub is_cart_open: bool,
    pub cart_items: Vec<CartItem>,
}

pub fn reducer(state: CartState, action: &Action) -> CartState {
    let Action::Cart(action) = action else {
        return state;
    };

    match action {
        CartAction::SetIsCartOpen(is_cart_open) => CartState {
            is_cart_open: *is_cart_open,
            ..state
        },
        CartAction::AddItemToCart(product) => CartState {
            cart_items: add_cart_item(state.cart_items, product),
            ..state
        },
        CartAction::RemoveItemFromCart(product) => CartState {
            cart_items: remove_cart_item(state.cart_items, product),
            ..state
        },
        CartAction::ClearItemFromCart(product) => CartState {
            cart_items: clear_cart_item(state.cart_items, product),
            ..state
        },
        CartAction::ClearCart => CartState {
            cart_items: Vec::new(),
            ..state
        },
    }
}

fn add_cart_item(mut items: Vec<CartItem>, product: &Product) -> Vec<CartItem> {
    match items.iter_mut().find(|item| item.id == product.id) {
        Some(item) => item.quantity += 1,
        None => items.push(CartItem::single(product)),
    }
    items
}

fn remove_cart_item(mut items: Vec<CartItem>, product: &Product) -> Vec<CartItem> {
    if let Some(position) = items.iter().position(|item| item.id == product.id) {
        match items.get_mut(position) {
            Some(item) if item.quantity > 1 => item.quantity -= 1,
            _ => {
                items.remove(position);
            }
        }
    }
    items
}

fn clear_cart_item(mut items: Vec<CartItem>, product: &Product) -> Vec<CartItem> {
    items.retain(|item| item.id != product.id);
    items
}

#[must_use]
pub fn select_cart_items(state: &RootState) -> &[CartItem] {
    &state.cart.cart_items
}

#[must_use]
pub const fn select_is_cart_open(state: &RootState) -> bool {
    state.cart.is_cart_open
}

/// Total number of units in the cart.
#[must_use]
pub fn select_cart_count(state: &RootState) -> u32 {
    select_cart_items(state).iter().map(|item| item.quantity).sum()
}

#[must_use]
pub fn select_cart_total(state: &RootState) -> Price {
    select_cart_items(state).iter().map(CartItem::line_total).sum()
}
