//! In-process backend.
//!
//! Keeps accounts, user documents and collections in memory behind a
//! `tokio::sync::RwLock`. Data is shared between clones; the signed-in user
//! is per [`MemoryBackend::session`], matching how each visitor gets their
//! own identity on the real backend.
//!
//! Failures and latency can be scripted per operation, which is what the
//! effect-handler tests use to drive the failure paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use uuid::Uuid;

use crown_core::{Email, UserId};

use super::{AuthErrorCode, Backend, BackendError, CATEGORIES_COLLECTION, validate_credentials};
use crate::models::{
    AdditionalDetails, AuthUser, Category, UserCredential, UserDocument, UserSnapshot,
};

/// Minimum password length accepted on sign-up.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Backend operations, used to script failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CurrentUser,
    SignInWithGoogle,
    SignInWithPassword,
    CreateUser,
    SignOut,
    CreateUserDocument,
    GetCategories,
    AddCollection,
}

struct Account {
    uid: UserId,
    password: SecretString,
    display_name: Option<String>,
}

/// Accounts are matched on the whole address, case-insensitively.
fn account_key(email: &Email) -> String {
    email.as_str().to_lowercase()
}

#[derive(Default)]
struct Shared {
    accounts: HashMap<String, Account>,
    google_tokens: HashMap<String, AuthUser>,
    users: HashMap<UserId, UserDocument>,
    collections: HashMap<String, BTreeMap<String, Category>>,
    failures: HashMap<Operation, BackendError>,
    calls: HashMap<Operation, usize>,
    latency: Duration,
}

/// In-memory implementation of [`Backend`].
#[derive(Clone, Default)]
pub struct MemoryBackend {
    shared: Arc<RwLock<Shared>>,
    current: Arc<RwLock<Option<AuthUser>>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle sharing this backend's data with its own signed-in user.
    #[must_use]
    pub fn session(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Seed the categories collection.
    pub async fn seed_categories(&self, categories: Vec<Category>) {
        let mut shared = self.shared.write().await;
        let collection = shared
            .collections
            .entry(CATEGORIES_COLLECTION.to_string())
            .or_default();
        for category in categories {
            collection.insert(category.key(), category);
        }
    }

    /// Register an email/password account without signing it in.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidEmail` if `email` does not parse.
    pub async fn add_account(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<AuthUser, BackendError> {
        let email = Email::parse(email)?;
        let uid = UserId::new(Uuid::new_v4().simple().to_string());
        let mut shared = self.shared.write().await;
        shared.accounts.insert(
            account_key(&email),
            Account {
                uid: uid.clone(),
                password: SecretString::from(password),
                display_name: display_name.map(str::to_string),
            },
        );
        Ok(AuthUser {
            uid,
            email: Some(email),
            display_name: display_name.map(str::to_string),
        })
    }

    /// Accept `id_token` as a Google sign-in for the given identity.
    pub async fn register_google_token(&self, id_token: &str, user: AuthUser) {
        self.shared
            .write()
            .await
            .google_tokens
            .insert(id_token.to_string(), user);
    }

    /// Make the next call of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: Operation, error: BackendError) {
        self.shared.write().await.failures.insert(operation, error);
    }

    /// Delay every operation by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        self.shared.write().await.latency = latency;
    }

    /// Number of times `operation` has been called.
    pub async fn calls(&self, operation: Operation) -> usize {
        self.shared
            .read()
            .await
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    /// The stored document for `uid`, if one was created.
    pub async fn user_document(&self, uid: &UserId) -> Option<UserDocument> {
        self.shared.read().await.users.get(uid).cloned()
    }

    /// Record the call, apply latency, then surface any scripted failure.
    async fn enter(&self, operation: Operation) -> Result<(), BackendError> {
        let latency = {
            let mut shared = self.shared.write().await;
            *shared.calls.entry(operation).or_insert(0) += 1;
            shared.latency
        };
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.shared.write().await.failures.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn sign_in(&self, user: AuthUser) -> UserCredential {
        *self.current.write().await = Some(user.clone());
        UserCredential { user }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        self.enter(Operation::CurrentUser).await?;
        Ok(self.current.read().await.clone())
    }

    async fn sign_in_with_google(
        &self,
        id_token: &SecretString,
    ) -> Result<UserCredential, BackendError> {
        self.enter(Operation::SignInWithGoogle).await?;
        let user = self
            .shared
            .read()
            .await
            .google_tokens
            .get(id_token.expose_secret())
            .cloned()
            .ok_or_else(|| {
                BackendError::auth(AuthErrorCode::InvalidCredential, "INVALID_IDP_RESPONSE")
            })?;
        Ok(self.sign_in(user).await)
    }

    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserCredential, BackendError> {
        self.enter(Operation::SignInWithPassword).await?;
        let email = validate_credentials(email, password)?;
        let user = {
            let shared = self.shared.read().await;
            let account = shared
                .accounts
                .get(&account_key(&email))
                .ok_or_else(|| BackendError::auth(AuthErrorCode::UserNotFound, "EMAIL_NOT_FOUND"))?;
            if account.password.expose_secret() != password.expose_secret() {
                return Err(BackendError::auth(
                    AuthErrorCode::WrongPassword,
                    "INVALID_PASSWORD",
                ));
            }
            AuthUser {
                uid: account.uid.clone(),
                email: Some(email.clone()),
                display_name: account.display_name.clone(),
            }
        };
        Ok(self.sign_in(user).await)
    }

    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserCredential, BackendError> {
        self.enter(Operation::CreateUser).await?;
        let email = validate_credentials(email, password)?;
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(BackendError::auth(
                AuthErrorCode::WeakPassword,
                "WEAK_PASSWORD : Password should be at least 6 characters",
            ));
        }
        let user = {
            let mut shared = self.shared.write().await;
            if shared.accounts.contains_key(&account_key(&email)) {
                return Err(BackendError::auth(
                    AuthErrorCode::EmailAlreadyInUse,
                    "EMAIL_EXISTS",
                ));
            }
            let uid = UserId::new(Uuid::new_v4().simple().to_string());
            shared.accounts.insert(
                account_key(&email),
                Account {
                    uid: uid.clone(),
                    password: password.clone(),
                    display_name: None,
                },
            );
            AuthUser {
                uid,
                email: Some(email),
                display_name: None,
            }
        };
        Ok(self.sign_in(user).await)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.enter(Operation::SignOut).await?;
        *self.current.write().await = None;
        Ok(())
    }

    async fn create_user_document_from_auth(
        &self,
        user: &AuthUser,
        details: &AdditionalDetails,
    ) -> Result<UserSnapshot, BackendError> {
        self.enter(Operation::CreateUserDocument).await?;
        let mut shared = self.shared.write().await;
        let data = shared
            .users
            .entry(user.uid.clone())
            .or_insert_with(|| UserDocument::for_new_user(user, details, Utc::now()))
            .clone();
        Ok(UserSnapshot {
            id: user.uid.clone(),
            data,
        })
    }

    async fn get_categories_and_documents(&self) -> Result<Vec<Category>, BackendError> {
        self.enter(Operation::GetCategories).await?;
        Ok(self
            .shared
            .read()
            .await
            .collections
            .get(CATEGORIES_COLLECTION)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_collection_and_documents(
        &self,
        collection: &str,
        categories: &[Category],
    ) -> Result<(), BackendError> {
        self.enter(Operation::AddCollection).await?;
        let mut shared = self.shared.write().await;
        let docs = shared.collections.entry(collection.to_string()).or_default();
        for category in categories {
            docs.insert(category.key(), category.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crown_core::{Price, ProductId};

    use crate::models::Product;

    fn hats() -> Category {
        Category {
            title: "Hats".to_string(),
            image_url: None,
            items: vec![Product {
                id: ProductId::new(1),
                name: "Brown Brim".to_string(),
                image_url: "https://i.ibb.co/ZYW3VTp/brown-brim.png".to_string(),
                price: Price::from_whole(25),
            }],
        }
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let backend = MemoryBackend::new();
        let password = SecretString::from("s3cret-pw");

        let created = backend
            .create_user_with_email_and_password("jane@example.com", &password)
            .await
            .unwrap();
        assert_eq!(
            backend.current_user().await.unwrap().unwrap().uid,
            created.user.uid
        );

        backend.sign_out().await.unwrap();
        assert!(backend.current_user().await.unwrap().is_none());

        let signed_in = backend
            .sign_in_with_email_and_password("jane@example.com", &password)
            .await
            .unwrap();
        assert_eq!(signed_in.user.uid, created.user.uid);
    }

    #[tokio::test]
    async fn test_duplicate_sign_up_is_rejected() {
        let backend = MemoryBackend::new();
        backend
            .add_account("jane@example.com", "s3cret-pw", None)
            .await
            .unwrap();

        let err = backend
            .create_user_with_email_and_password("jane@example.com", &SecretString::from("other-pw"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "auth/email-already-in-use");
    }

    #[tokio::test]
    async fn test_account_email_ignores_case() {
        let backend = MemoryBackend::new();
        let created = backend
            .add_account("Jane@Example.com", "s3cret-pw", None)
            .await
            .unwrap();

        let err = backend
            .create_user_with_email_and_password("jane@example.com", &SecretString::from("other-pw"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "auth/email-already-in-use");

        let signed_in = backend
            .sign_in_with_email_and_password("JANE@example.com", &SecretString::from("s3cret-pw"))
            .await
            .unwrap();
        assert_eq!(signed_in.user.uid, created.uid);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user() {
        let backend = MemoryBackend::new();
        backend
            .add_account("jane@example.com", "s3cret-pw", None)
            .await
            .unwrap();

        let err = backend
            .sign_in_with_email_and_password("jane@example.com", &SecretString::from("nope-nope"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "auth/wrong-password");

        let err = backend
            .sign_in_with_email_and_password("bob@example.com", &SecretString::from("whatever"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "auth/user-not-found");
    }

    #[tokio::test]
    async fn test_user_document_is_created_once() {
        let backend = MemoryBackend::new();
        let user = backend
            .add_account("jane@example.com", "s3cret-pw", None)
            .await
            .unwrap();

        let first = backend
            .create_user_document_from_auth(&user, &AdditionalDetails::with_display_name("Jane"))
            .await
            .unwrap();
        let second = backend
            .create_user_document_from_auth(&user, &AdditionalDetails::with_display_name("Other"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(second.data.display_name.as_deref(), Some("Jane"));
    }

    #[tokio::test]
    async fn test_sessions_share_data_but_not_identity() {
        let backend = MemoryBackend::new();
        backend
            .add_account("jane@example.com", "s3cret-pw", None)
            .await
            .unwrap();
        backend
            .sign_in_with_email_and_password("jane@example.com", &SecretString::from("s3cret-pw"))
            .await
            .unwrap();

        let other = backend.session();
        assert!(other.current_user().await.unwrap().is_none());
        other
            .sign_in_with_email_and_password("jane@example.com", &SecretString::from("s3cret-pw"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_collections_are_keyed_by_lowercase_title() {
        let backend = MemoryBackend::new();
        backend
            .add_collection_and_documents(CATEGORIES_COLLECTION, &[hats()])
            .await
            .unwrap();
        backend
            .add_collection_and_documents(CATEGORIES_COLLECTION, &[hats()])
            .await
            .unwrap();

        let categories = backend.get_categories_and_documents().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].key(), "hats");
    }

    #[tokio::test]
    async fn test_scripted_failure_fires_once() {
        let backend = MemoryBackend::new();
        backend
            .fail_next(
                Operation::GetCategories,
                BackendError::Unexpected("boom".to_string()),
            )
            .await;

        assert!(backend.get_categories_and_documents().await.is_err());
        assert!(backend.get_categories_and_documents().await.is_ok());
        assert_eq!(backend.calls(Operation::GetCategories).await, 2);
    }
}
