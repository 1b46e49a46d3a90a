//! Demo catalog.
//!
//! Served by the in-memory backend. The same file can be written to a fresh
//! Firebase project with `Backend::add_collection_and_documents`.

use crate::models::Category;

const SHOP_DATA: &str = include_str!("../data/shop-data.json");

/// The bundled demo categories.
///
/// # Errors
///
/// Returns an error if the bundled JSON does not match [`Category`].
pub fn demo_catalog() -> Result<Vec<Category>, serde_json::Error> {
    serde_json::from_str(SHOP_DATA)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_demo_catalog_parses() {
        let catalog = demo_catalog().unwrap();
        let keys: Vec<_> = catalog.iter().map(Category::key).collect();
        assert_eq!(keys, vec!["hats", "sneakers", "jackets", "womens", "mens"]);
        assert!(catalog.iter().all(|c| !c.items.is_empty()));
    }

    #[test]
    fn test_demo_product_ids_are_unique() {
        let catalog = demo_catalog().unwrap();
        let ids: Vec<_> = catalog
            .iter()
            .flat_map(|c| c.items.iter().map(|p| p.id))
            .collect();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
