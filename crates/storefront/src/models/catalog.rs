//! Catalogue and cart types.

use serde::{Deserialize, Serialize};

use crown_core::{Price, ProductId};

/// A product listed in a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image_url: String,
    pub price: Price,
}

/// A category document: a title and the products shown under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub items: Vec<Product>,
}

impl Category {
    /// Key used for lookups and as the document ID: the lower-cased title.
    #[must_use]
    pub fn key(&self) -> String {
        self.title.to_lowercase()
    }
}

/// A product in the cart with its quantity.
///
/// Quantity is always at least 1; an item whose quantity would drop to 0 is
/// removed from the cart instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub image_url: String,
    pub price: Price,
    pub quantity: u32,
}

impl CartItem {
    /// A cart line holding a single unit of `product`.
    #[must_use]
    pub fn single(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            price: product.price,
            quantity: 1,
        }
    }

    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.times(self.quantity)
    }

    /// The product this line holds.
    #[must_use]
    pub fn product(&self) -> Product {
        Product {
            id: self.id,
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
        }
    }
}
