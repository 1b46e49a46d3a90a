//! Effect handlers.
//!
//! Each watcher listens on the store's intent broadcast and runs a handler
//! for one [`ActionKind`] with take-latest semantics: a new matching intent
//! aborts the handler still running for the previous one. Handlers talk to
//! the [`Backend`](crate::backend::Backend) and report back by dispatching
//! success or failure intents.

pub mod categories;
pub mod user;

pub use categories::{categories_saga, fetch_categories_async, on_fetch_categories};
pub use user::{
    get_snapshot_from_user_auth, is_user_authenticated, on_check_user_session,
    on_email_sign_in_start, on_google_sign_in_start, on_sign_out_start, on_sign_up_start,
    on_sign_up_success, sign_in_after_sign_up, sign_in_with_email, sign_in_with_google, sign_out,
    sign_up, user_sagas,
};

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::SharedBackend;
use crate::store::{Action, ActionKind, Store};

/// What every handler gets: the store to dispatch to and the backend.
#[derive(Clone)]
pub struct SagaContext {
    pub store: Arc<Store>,
    pub backend: SharedBackend,
}

impl SagaContext {
    #[must_use]
    pub fn new(store: Arc<Store>, backend: SharedBackend) -> Self {
        Self { store, backend }
    }
}

/// A running watcher. Dropping it stops the watcher and its in-flight handler.
pub struct SagaTask {
    kind: ActionKind,
    handle: JoinHandle<()>,
}

impl SagaTask {
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        self.kind
    }
}

impl Drop for SagaTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Aborts the wrapped task when dropped.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run `handler` for every `kind` intent, cancelling the previous run.
///
/// Subscribes before returning, so intents dispatched right after this call
/// are seen.
pub fn take_latest<F, Fut>(ctx: &SagaContext, kind: ActionKind, handler: F) -> SagaTask
where
    F: Fn(SagaContext, Action) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut rx = ctx.store.subscribe();
    let ctx = ctx.clone();

    let handle = tokio::spawn(async move {
        let mut in_flight: Option<AbortOnDrop> = None;
        loop {
            match rx.recv().await {
                Ok(action) if action.kind() == kind => {
                    if in_flight.as_ref().is_some_and(|task| !task.0.is_finished()) {
                        debug!(action = %kind, "Superseding in-flight handler");
                    }
                    // Replacing the guard aborts the previous run.
                    in_flight = Some(AbortOnDrop(tokio::spawn(handler(ctx.clone(), action))));
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(action = %kind, skipped, "Watcher lagged behind the store");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    SagaTask { kind, handle }
}

/// Start every watcher the storefront needs.
#[must_use]
pub fn root_saga(store: Arc<Store>, backend: SharedBackend) -> Vec<SagaTask> {
    let ctx = SagaContext::new(store, backend);
    let mut tasks = user_sagas(&ctx);
    tasks.extend(categories_saga(&ctx));
    tasks
}
