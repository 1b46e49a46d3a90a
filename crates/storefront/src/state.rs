//! Application state shared across handlers.
//!
//! Every visitor gets their own [`Store`] with the effect handlers running
//! against their own backend session. Stores live in a `moka` cache keyed by
//! the visitor ID kept in the HTTP session and are dropped (handlers
//! included) after `STOREFRONT_SESSION_IDLE_SECS` without a request.

use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{FirebaseClient, MemoryBackend, SharedBackend};
use crate::config::{BackendKind, StorefrontConfig};
use crate::sagas::{SagaTask, root_saga};
use crate::store::{CategoriesAction, PersistedState, RootState, Store, UserAction};

/// Most visitor stores kept at once.
const MAX_VISITORS: u64 = 10_000;

/// Error creating the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("firebase backend selected but not configured")]
    MissingFirebaseConfig,
    #[error("invalid demo catalog: {0}")]
    Catalog(#[from] serde_json::Error),
}

/// Where per-visitor backends come from.
#[derive(Clone)]
pub enum BackendProvider {
    Firebase(FirebaseClient),
    Memory(MemoryBackend),
}

impl BackendProvider {
    /// A fresh, signed-out backend session for one visitor.
    #[must_use]
    pub fn session(&self) -> SharedBackend {
        match self {
            Self::Firebase(client) => Arc::new(client.session()),
            Self::Memory(backend) => Arc::new(backend.session()),
        }
    }
}

/// One visitor's store and the effect handlers feeding it.
pub struct VisitorStore {
    store: Arc<Store>,
    _sagas: Vec<SagaTask>,
}

impl VisitorStore {
    /// Start a store from the persisted cart and kick off the session check
    /// and the catalog fetch.
    #[must_use]
    pub fn start(backend: SharedBackend, persisted: Option<PersistedState>) -> Self {
        let preloaded = persisted.map_or_else(RootState::default, |p| {
            RootState::default().rehydrate(p)
        });
        let store = Arc::new(Store::new(preloaded));
        let sagas = root_saga(Arc::clone(&store), backend);

        store.dispatch(UserAction::CheckUserSession);
        store.dispatch(CategoriesAction::FetchCategoriesStart);

        Self {
            store,
            _sagas: sagas,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    backends: BackendProvider,
    visitors: Cache<Uuid, Arc<VisitorStore>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the Firebase backend is selected without its
    /// configuration, or if the demo catalog fails to load.
    pub async fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let backends = match config.backend {
            BackendKind::Firebase => {
                let firebase = config
                    .firebase
                    .as_ref()
                    .ok_or(StateError::MissingFirebaseConfig)?;
                BackendProvider::Firebase(FirebaseClient::new(firebase))
            }
            BackendKind::Memory => {
                let backend = MemoryBackend::new();
                backend
                    .seed_categories(crate::seed::demo_catalog()?)
                    .await;
                BackendProvider::Memory(backend)
            }
        };
        Ok(Self::with_backends(config, backends))
    }

    /// Create the state around an existing backend provider.
    #[must_use]
    pub fn with_backends(config: StorefrontConfig, backends: BackendProvider) -> Self {
        let visitors = Cache::builder()
            .max_capacity(MAX_VISITORS)
            .time_to_idle(config.session_idle)
            .eviction_listener(|visitor: Arc<Uuid>, _, cause| {
                debug!(visitor = %visitor, ?cause, "Visitor store dropped");
            })
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                backends,
                visitors,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn backends(&self) -> &BackendProvider {
        &self.inner.backends
    }

    /// The visitor's store, started from `persisted` if none is running.
    pub async fn visitor_store(
        &self,
        visitor: Uuid,
        persisted: Option<PersistedState>,
    ) -> Arc<Store> {
        let visitor_store = self
            .inner
            .visitors
            .get_with(visitor, async {
                info!(visitor = %visitor, "Starting visitor store");
                Arc::new(VisitorStore::start(self.inner.backends.session(), persisted))
            })
            .await;
        Arc::clone(visitor_store.store())
    }

    /// Stop a visitor's store and effect handlers.
    pub async fn drop_visitor(&self, visitor: Uuid) {
        self.inner.visitors.invalidate(&visitor).await;
    }

    /// Number of running visitor stores.
    pub async fn visitor_count(&self) -> u64 {
        self.inner.visitors.run_pending_tasks().await;
        self.inner.visitors.entry_count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crown_core::{Price, ProductId};

    use crate::models::CartItem;
    use crate::store::{CartState, select_cart_count};

    fn memory_config() -> StorefrontConfig {
        StorefrontConfig::from_vars(&|key| match key {
            "STOREFRONT_BASE_URL" => Some("http://localhost:3000".to_string()),
            "STOREFRONT_BACKEND" => Some("memory".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_visitor_store_is_reused() {
        let state = AppState::new(memory_config()).await.unwrap();
        let visitor = Uuid::new_v4();

        let first = state.visitor_store(visitor, None).await;
        let second = state.visitor_store(visitor, None).await;
        assert!(Arc::ptr_eq(&first, &second));

        let other = state.visitor_store(Uuid::new_v4(), None).await;
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[tokio::test]
    async fn test_new_store_fetches_catalog_and_rehydrates_cart() {
        let state = AppState::new(memory_config()).await.unwrap();
        let persisted = PersistedState {
            cart: CartState {
                is_cart_open: false,
                cart_items: vec![CartItem {
                    id: ProductId::new(1),
                    name: "Brown Brim".to_string(),
                    image_url: "https://i.ibb.co/ZYW3VTp/brown-brim.png".to_string(),
                    price: Price::from_whole(25),
                    quantity: 3,
                }],
            },
        };

        let store = state.visitor_store(Uuid::new_v4(), Some(persisted)).await;
        assert_eq!(store.select(select_cart_count), 3);

        let settled = store
            .settled(
                |s| !s.categories.is_loading && !s.categories.categories.is_empty(),
                Duration::from_secs(2),
            )
            .await
            .unwrap();
        assert_eq!(settled.categories.categories.len(), 5);
    }

    #[tokio::test]
    async fn test_drop_visitor_stops_store() {
        let state = AppState::new(memory_config()).await.unwrap();
        let visitor = Uuid::new_v4();

        let first = state.visitor_store(visitor, None).await;
        assert_eq!(state.visitor_count().await, 1);

        state.drop_visitor(visitor).await;
        assert_eq!(state.visitor_count().await, 0);

        let restarted = state.visitor_store(visitor, None).await;
        assert!(!Arc::ptr_eq(&first, &restarted));
    }

    #[tokio::test]
    async fn test_firebase_requires_config() {
        let mut config = memory_config();
        config.backend = BackendKind::Firebase;
        assert!(matches!(
            AppState::new(config).await,
            Err(StateError::MissingFirebaseConfig)
        ));
    }
}
