//! Categories slice and the catalog selectors.

use std::collections::BTreeMap;

use serde::Serialize;

use super::RootState;
use super::action::{Action, ActionError, CategoriesAction};
use crate::models::{Category, Product};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoriesState {
    pub categories: Vec<Category>,
    pub is_loading: bool,
    pub error: Option<ActionError>,
}

pub fn reducer(state: CategoriesState, action: &Action) -> CategoriesState {
    let Action::Categories(action) = action else {
        return state;
    };

    match action {
        CategoriesAction::FetchCategoriesStart => CategoriesState {
            is_loading: true,
            error: None,
            ..state
        },
        CategoriesAction::FetchCategoriesSuccess(categories) => CategoriesState {
            categories: categories.clone(),
            is_loading: false,
            error: None,
        },
        CategoriesAction::FetchCategoriesFailed(error) => CategoriesState {
            is_loading: false,
            error: Some(error.clone()),
            ..state
        },
    }
}

#[must_use]
pub fn select_categories(state: &RootState) -> &[Category] {
    &state.categories.categories
}

#[must_use]
pub const fn select_categories_is_loading(state: &RootState) -> bool {
    state.categories.is_loading
}

#[must_use]
pub const fn select_categories_error(state: &RootState) -> Option<&ActionError> {
    state.categories.error.as_ref()
}

/// Items of every category keyed by lower-cased title.
#[must_use]
pub fn select_categories_map(state: &RootState) -> BTreeMap<String, Vec<Product>> {
    select_categories(state)
        .iter()
        .map(|category| (category.key(), category.items.clone()))
        .collect()
}

/// Items of one category, matched case-insensitively; empty when unknown.
#[must_use]
pub fn select_category_items(state: &RootState, title: &str) -> Vec<Product> {
    let title = title.to_lowercase();
    select_categories(state)
        .iter()
        .find(|category| category.key() == title)
        .map(|category| category.items.clone())
        .unwrap_or_default()
}
