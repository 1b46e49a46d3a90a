//! Catalog effect handlers.

use tracing::{debug, warn};

use super::{SagaContext, SagaTask, take_latest};
use crate::store::{ActionError, ActionKind, CategoriesAction};

pub async fn fetch_categories_async(ctx: &SagaContext) {
    match ctx.backend.get_categories_and_documents().await {
        Ok(categories) => {
            debug!(count = categories.len(), "Fetched categories");
            ctx.store
                .dispatch(CategoriesAction::FetchCategoriesSuccess(categories));
        }
        Err(e) => {
            warn!(error = %e, "Fetching categories failed");
            ctx.store
                .dispatch(CategoriesAction::FetchCategoriesFailed(ActionError::from(e)));
        }
    }
}

#[must_use]
pub fn on_fetch_categories(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::FetchCategoriesStart, |ctx, _| async move {
        fetch_categories_async(&ctx).await;
    })
}

#[must_use]
pub fn categories_saga(ctx: &SagaContext) -> Vec<SagaTask> {
    vec![on_fetch_categories(ctx)]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crown_core::{Price, ProductId};

    use crate::backend::memory::Operation;
    use crate::backend::{BackendError, MemoryBackend};
    use crate::models::{Category, Product};
    use crate::store::{Action, Store, select_categories_map};

    fn settles(action: &Action) -> bool {
        matches!(
            action.kind(),
            ActionKind::FetchCategoriesSuccess | ActionKind::FetchCategoriesFailed
        )
    }

    fn category(title: &str, id: i64) -> Category {
        Category {
            title: title.to_string(),
            image_url: None,
            items: vec![Product {
                id: ProductId::new(id),
                name: format!("{title} {id}"),
                image_url: format!("https://example.com/{id}.png"),
                price: Price::from_whole(20),
            }],
        }
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let backend = MemoryBackend::new();
        backend
            .seed_categories(vec![category("Hats", 1), category("Jackets", 2)])
            .await;
        let ctx = SagaContext::new(Arc::new(Store::default()), Arc::new(backend));
        let _tasks = categories_saga(&ctx);

        let settled = ctx
            .store
            .dispatch_and_wait(
                CategoriesAction::FetchCategoriesStart,
                settles,
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(settled.kind(), ActionKind::FetchCategoriesSuccess);

        let state = ctx.store.get_state();
        assert!(!state.categories.is_loading);
        let map = select_categories_map(&state);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["hats", "jackets"]);
    }

    #[tokio::test]
    async fn test_fetch_failure() {
        let backend = MemoryBackend::new();
        backend
            .fail_next(
                Operation::GetCategories,
                BackendError::Firestore {
                    status: "UNAVAILABLE".to_string(),
                    message: "try again".to_string(),
                },
            )
            .await;
        let ctx = SagaContext::new(Arc::new(Store::default()), Arc::new(backend));
        let _tasks = categories_saga(&ctx);

        let settled = ctx
            .store
            .dispatch_and_wait(
                CategoriesAction::FetchCategoriesStart,
                settles,
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(settled.kind(), ActionKind::FetchCategoriesFailed);

        let state = ctx.store.get_state();
        assert!(!state.categories.is_loading);
        assert!(state.categories.error.is_some());
    }
}
