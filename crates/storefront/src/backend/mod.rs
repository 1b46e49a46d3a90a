//! Identity and document backend.
//!
//! The storefront never talks to the backend directly: effect handlers go
//! through the [`Backend`] trait. Two implementations ship with the crate:
//!
//! - [`FirebaseBackend`] - Identity Toolkit and Firestore over REST, one
//!   instance per visitor (it holds that visitor's signed-in identity)
//! - [`MemoryBackend`] - in-process accounts and documents for local
//!   development and tests
//!
//! # Collections
//!
//! - `users/{uid}` - one document per user, created on first sign-in
//! - `categories/{title}` - one document per category with its items

mod error;
pub mod firebase;
pub mod memory;

pub use error::{AuthErrorCode, BackendError};
pub use firebase::{FirebaseBackend, FirebaseClient};
pub use memory::MemoryBackend;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crown_core::Email;

use crate::models::{AdditionalDetails, AuthUser, Category, UserCredential, UserSnapshot};

/// Collection holding category documents.
pub const CATEGORIES_COLLECTION: &str = "categories";

/// Collection holding user documents.
pub const USERS_COLLECTION: &str = "users";

/// Operations the storefront needs from its identity/document backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The user signed in on this backend instance, if any.
    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError>;

    /// Exchange a Google ID token for a signed-in user.
    async fn sign_in_with_google(
        &self,
        id_token: &SecretString,
    ) -> Result<UserCredential, BackendError>;

    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserCredential, BackendError>;

    /// Create an account; the new user is signed in on success.
    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserCredential, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Fetch `users/{uid}`, creating it first if it does not exist.
    async fn create_user_document_from_auth(
        &self,
        user: &AuthUser,
        details: &AdditionalDetails,
    ) -> Result<UserSnapshot, BackendError>;

    /// Every document in the categories collection.
    async fn get_categories_and_documents(&self) -> Result<Vec<Category>, BackendError>;

    /// Write `categories` into `collection` in one batch, each keyed by its
    /// lower-cased title.
    async fn add_collection_and_documents(
        &self,
        collection: &str,
        categories: &[Category],
    ) -> Result<(), BackendError>;
}

/// Shared handle to a backend.
pub type SharedBackend = Arc<dyn Backend>;

/// Validate email/password input before it reaches the backend.
///
/// # Errors
///
/// Returns `BackendError::InvalidEmail` for a malformed email and an
/// `auth/missing-password` error for an empty password.
pub fn validate_credentials(email: &str, password: &SecretString) -> Result<Email, BackendError> {
    let email = Email::parse(email)?;
    if password.expose_secret().is_empty() {
        return Err(BackendError::auth(
            AuthErrorCode::MissingPassword,
            "password must not be empty",
        ));
    }
    Ok(email)
}
