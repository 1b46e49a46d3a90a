//! Visitor extractor.
//!
//! Resolves the browser session to the visitor's running [`Store`], starting
//! one (rehydrated from the persisted cart) on the first request.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;
use tracing::Span;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::session::keys;
use crate::state::AppState;
use crate::store::{PersistedState, Store};

/// The current visitor and their store.
///
/// # Example
///
/// ```rust,ignore
/// async fn cart_count(visitor: Visitor) -> String {
///     visitor.store().select(select_cart_count).to_string()
/// }
/// ```
pub struct Visitor {
    pub id: Uuid,
    store: Arc<Store>,
    session: Session,
}

impl Visitor {
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Save the persisted slice of the store into the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn persist(&self) -> Result<(), AppError> {
        self.session
            .insert(keys::PERSISTED_STATE, self.store.get_state().persisted())
            .await?;
        Ok(())
    }
}

impl FromRequestParts<AppState> for Visitor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let id = if let Some(id) = session.get::<Uuid>(keys::VISITOR_ID).await? {
            id
        } else {
            let id = Uuid::new_v4();
            session.insert(keys::VISITOR_ID, id).await?;
            id
        };
        Span::current().record("visitor_id", tracing::field::display(id));

        let persisted = session
            .get::<PersistedState>(keys::PERSISTED_STATE)
            .await?;
        let store = state.visitor_store(id, persisted).await;

        Ok(Self { id, store, session })
    }
}
