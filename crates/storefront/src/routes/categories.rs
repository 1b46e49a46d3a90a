//! Catalog route handlers.

use std::collections::BTreeMap;

use axum::{Json, extract::Path};
use tracing::instrument;

use super::STORE_TIMEOUT;
use crate::error::{AppError, Result};
use crate::middleware::Visitor;
use crate::models::Product;
use crate::store::{
    CategoriesAction, RootState, select_categories, select_categories_map, select_category_items,
};

/// Wait for the visitor's catalog, retrying a failed fetch once per request.
pub async fn loaded_catalog(visitor: &Visitor) -> Result<RootState> {
    let store = visitor.store();
    if store.select(|s| !s.categories.is_loading && s.categories.error.is_some()) {
        store.dispatch(CategoriesAction::FetchCategoriesStart);
    }

    let state = store
        .settled(|s| !s.categories.is_loading, STORE_TIMEOUT)
        .await?;
    match &state.categories.error {
        Some(error) => Err(AppError::Action(error.clone())),
        None => Ok(state),
    }
}

/// Every category's items keyed by lower-cased title.
#[instrument(skip(visitor), fields(visitor = %visitor.id))]
pub async fn index(visitor: Visitor) -> Result<Json<BTreeMap<String, Vec<Product>>>> {
    let state = loaded_catalog(&visitor).await?;
    Ok(Json(select_categories_map(&state)))
}

/// Items of one category.
#[instrument(skip(visitor), fields(visitor = %visitor.id))]
pub async fn show(visitor: Visitor, Path(title): Path<String>) -> Result<Json<Vec<Product>>> {
    let state = loaded_catalog(&visitor).await?;
    let key = title.to_lowercase();
    if !select_categories(&state).iter().any(|c| c.key() == key) {
        return Err(AppError::NotFound(format!("category '{title}'")));
    }
    Ok(Json(select_category_items(&state, &title)))
}
