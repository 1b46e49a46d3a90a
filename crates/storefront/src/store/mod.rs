//! Application state container.
//!
//! # Architecture
//!
//! - [`RootState`] is the whole state tree, one field per slice
//! - each slice exposes a pure by-value reducer and its selectors
//! - [`Store`] owns the current `RootState`, applies intents under a lock and
//!   broadcasts every applied intent to the effect handlers
//!
//! Only the cart slice survives between requests: [`RootState::persisted`]
//! extracts it and [`RootState::rehydrate`] puts it back.

mod action;
pub mod cart;
pub mod categories;
pub mod user;

pub use action::{Action, ActionError, ActionKind, CartAction, CategoriesAction, UserAction};
pub use cart::{
    CartState, select_cart_count, select_cart_items, select_cart_total, select_is_cart_open,
};
pub use categories::{
    CategoriesState, select_categories, select_categories_error, select_categories_is_loading,
    select_categories_map, select_category_items,
};
pub use user::{UserState, select_current_user, select_user_error, select_user_is_loading};

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered intents per subscriber before it starts lagging.
const CHANNEL_CAPACITY: usize = 256;

/// Errors waiting on the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Timed out after {0:?} waiting for the store to settle")]
    Timeout(Duration),

    #[error("Store channel closed")]
    Closed,
}

/// The whole state tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootState {
    pub user: UserState,
    pub categories: CategoriesState,
    pub cart: CartState,
}

/// The persisted part of [`RootState`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub cart: CartState,
}

impl RootState {
    #[must_use]
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            cart: self.cart.clone(),
        }
    }

    #[must_use]
    pub fn rehydrate(self, persisted: PersistedState) -> Self {
        Self {
            cart: persisted.cart,
            ..self
        }
    }
}

/// Route an intent to every slice.
#[must_use]
pub fn root_reducer(state: RootState, action: &Action) -> RootState {
    RootState {
        user: user::reducer(state.user, action),
        categories: categories::reducer(state.categories, action),
        cart: cart::reducer(state.cart, action),
    }
}

/// State container with an intent broadcast.
pub struct Store {
    state: RwLock<RootState>,
    tx: broadcast::Sender<Action>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(RootState::default())
    }
}

impl Store {
    #[must_use]
    pub fn new(preloaded: RootState) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(preloaded),
            tx,
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn get_state(&self) -> RootState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run a selector against the current state without cloning the tree.
    pub fn select<T>(&self, selector: impl FnOnce(&RootState) -> T) -> T {
        selector(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Apply `action`, then publish it to subscribers.
    pub fn dispatch(&self, action: impl Into<Action>) {
        self.apply(action.into(), false);
    }

    /// Reduce and publish under one write lock so subscribers see intents in
    /// the order they were applied. With `subscribe`, the returned receiver
    /// is created under the same lock and yields `action` first.
    fn apply(&self, action: Action, subscribe: bool) -> Option<broadcast::Receiver<Action>> {
        let kind = action.kind();
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let rx = subscribe.then(|| self.tx.subscribe());
        *state = root_reducer(std::mem::take(&mut *state), &action);
        // No receivers just means no effect handlers are running.
        let _ = self.tx.send(action);
        drop(state);

        debug!(action = %kind, "Dispatched");
        rx
    }

    /// Every intent dispatched from now on, after it has been applied.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Action> {
        self.tx.subscribe()
    }

    /// Dispatch `action` and wait for the first later intent matching `settle`.
    ///
    /// Only intents published after `action` itself are considered, even
    /// when other callers dispatch intents of the same kind concurrently.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Timeout` if nothing matches within `timeout`.
    pub async fn dispatch_and_wait(
        &self,
        action: impl Into<Action>,
        settle: impl Fn(&Action) -> bool,
        timeout: Duration,
    ) -> Result<Action, StoreError> {
        let mut rx = self
            .apply(action.into(), true)
            .ok_or(StoreError::Closed)?;

        let wait = async {
            // The receiver was created under the dispatch lock: its first
            // message is our own intent.
            recv(&mut rx).await?;
            loop {
                let next = recv(&mut rx).await?;
                if settle(&next) {
                    return Ok(next);
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| StoreError::Timeout(timeout))?
    }

    /// Wait until `predicate` holds for the state, checking after every intent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Timeout` if the predicate does not hold within
    /// `timeout`.
    pub async fn settled(
        &self,
        predicate: impl Fn(&RootState) -> bool,
        timeout: Duration,
    ) -> Result<RootState, StoreError> {
        let mut rx = self.subscribe();
        let wait = async {
            loop {
                let state = self.get_state();
                if predicate(&state) {
                    return Ok(state);
                }
                recv(&mut rx).await?;
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| StoreError::Timeout(timeout))?
    }
}

/// Receive the next intent, skipping over any lag.
async fn recv(rx: &mut broadcast::Receiver<Action>) -> Result<Action, StoreError> {
    loop {
        match rx.recv().await {
            Ok(action) => return Ok(action),
            Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return Err(StoreError::Closed),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crown_core::{Price, ProductId};

    use crate::models::Product;

    fn hat() -> Product {
        Product {
            id: ProductId::new(1),
            name: "Brown Brim".to_string(),
            image_url: "https://i.ibb.co/ZYW3VTp/brown-brim.png".to_string(),
            price: Price::from_whole(25),
        }
    }

    #[test]
    fn test_dispatch_reduces_state() {
        let store = Store::default();
        store.dispatch(CartAction::AddItemToCart(hat()));
        store.dispatch(CartAction::AddItemToCart(hat()));
        assert_eq!(store.select(select_cart_count), 2);
        assert_eq!(store.get_state().cart.cart_items.len(), 1);
    }

    #[test]
    fn test_root_reducer_routes_to_every_slice() {
        let state = root_reducer(RootState::default(), &CategoriesAction::FetchCategoriesStart.into());
        assert!(state.categories.is_loading);
        assert!(!state.user.is_loading);
        assert_eq!(state.cart, CartState::default());
    }

    #[tokio::test]
    async fn test_subscribers_see_applied_intents() {
        let store = Store::default();
        let mut rx = store.subscribe();
        store.dispatch(CartAction::SetIsCartOpen(true));

        let action = rx.recv().await.unwrap();
        assert_eq!(action.kind(), ActionKind::SetIsCartOpen);
        assert!(store.select(select_is_cart_open));
    }

    #[tokio::test]
    async fn test_dispatch_and_wait_times_out() {
        let store = Store::default();
        let err = store
            .dispatch_and_wait(
                UserAction::SignOutStart,
                |a| a.kind() == ActionKind::SignOutSuccess,
                Duration::from_millis(20),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout(_)));
        assert!(store.get_state().user.is_loading);
    }

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            image_url: String::new(),
            price: Price::from_whole(1),
        }
    }

    #[test]
    fn test_concurrent_dispatch_broadcasts_in_applied_order() {
        for _ in 0..200 {
            let store = Arc::new(Store::default());
            let mut rx = store.subscribe();

            let threads: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    std::thread::spawn(move || {
                        for i in 0..25 {
                            store.dispatch(CartAction::SetIsCartOpen((t + i) % 2 == 0));
                        }
                    })
                })
                .collect();
            for thread in threads {
                thread.join().unwrap();
            }

            let mut replayed = RootState::default();
            while let Ok(action) = rx.try_recv() {
                replayed = root_reducer(replayed, &action);
            }
            assert_eq!(replayed.cart, store.get_state().cart);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dispatch_and_wait_skips_intents_applied_before_its_own() {
        let store = Arc::new(Store::default());
        let applied = Arc::new(std::sync::Mutex::new(Vec::new()));

        // Records every add in applied order and answers it with a clear.
        let mut rx = store.subscribe();
        let responder = {
            let store = Arc::clone(&store);
            let applied = Arc::clone(&applied);
            tokio::spawn(async move {
                while let Ok(action) = rx.recv().await {
                    if let Action::Cart(CartAction::AddItemToCart(product)) = action {
                        applied.lock().unwrap().push(product.id);
                        store.dispatch(CartAction::ClearItemFromCart(product));
                    }
                }
            })
        };

        let waiters: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mut observed = Vec::new();
                    for round in 0..20 {
                        let own = product(w * 100 + round);
                        let seen = std::sync::Mutex::new(Vec::new());
                        store
                            .dispatch_and_wait(
                                CartAction::AddItemToCart(own.clone()),
                                |a| match a {
                                    Action::Cart(CartAction::AddItemToCart(p)) => {
                                        seen.lock().unwrap().push(p.id);
                                        false
                                    }
                                    Action::Cart(CartAction::ClearItemFromCart(p)) => p.id == own.id,
                                    _ => false,
                                },
                                Duration::from_secs(2),
                            )
                            .await
                            .unwrap();
                        observed.push((own.id, seen.into_inner().unwrap()));
                    }
                    observed
                })
            })
            .collect();

        let mut observed = Vec::new();
        for waiter in waiters {
            observed.extend(waiter.await.unwrap());
        }
        responder.abort();

        let applied = applied.lock().unwrap();
        let position = |id| applied.iter().position(|p| *p == id).unwrap();
        for (own, seen) in observed {
            for other in seen {
                assert!(
                    position(other) > position(own),
                    "settle saw an add applied no later than its own"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_settled_returns_immediately_when_true() {
        let store = Store::default();
        let state = store
            .settled(|s| !s.categories.is_loading, Duration::from_millis(20))
            .await
            .unwrap();
        assert!(state.categories.categories.is_empty());
    }

    #[test]
    fn test_persist_and_rehydrate_cart_only() {
        let store = Store::default();
        store.dispatch(CartAction::AddItemToCart(hat()));
        store.dispatch(CategoriesAction::FetchCategoriesStart);
        let persisted = store.get_state().persisted();

        let json = serde_json::to_string(&persisted).unwrap();
        let restored: PersistedState = serde_json::from_str(&json).unwrap();

        let state = RootState::default().rehydrate(restored);
        assert_eq!(state.cart.cart_items.len(), 1);
        assert!(!state.categories.is_loading);
    }
}
