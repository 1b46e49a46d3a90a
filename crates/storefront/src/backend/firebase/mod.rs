//! Firebase backend over REST.
//!
//! # Architecture
//!
//! - [`FirebaseClient`] is shared by the whole process: HTTP client,
//!   endpoints, API key and a `moka` cache of the categories listing
//!   (5 minute TTL)
//! - [`FirebaseBackend`] is created per visitor via
//!   [`FirebaseClient::session`] and holds that visitor's ID and refresh
//!   tokens
//!
//! Both services can be pointed at the local emulator suite via
//! `FIREBASE_AUTH_EMULATOR_HOST` and `FIREBASE_FIRESTORE_EMULATOR_HOST`.

mod auth;
pub mod firestore;

pub use auth::AuthSession;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{
    AuthErrorCode, Backend, BackendError, CATEGORIES_COLLECTION, USERS_COLLECTION,
    validate_credentials,
};
use crate::config::FirebaseConfig;
use crate::models::{
    AdditionalDetails, AuthUser, Category, UserCredential, UserDocument, UserSnapshot,
};
use firestore::{Document, Fields, ListDocumentsResponse, Value, encode_fields};

/// Page size used when listing a collection.
const LIST_PAGE_SIZE: &str = "300";

/// Seconds to wait when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

// =============================================================================
// FirebaseClient
// =============================================================================

/// Shared Firebase REST client.
#[derive(Clone)]
pub struct FirebaseClient {
    inner: Arc<FirebaseClientInner>,
}

struct FirebaseClientInner {
    http: reqwest::Client,
    api_key: SecretString,
    identity_base: String,
    token_endpoint: String,
    firestore_base: String,
    database: String,
    request_uri: String,
    cache: Cache<String, Vec<Category>>,
}

impl FirebaseClient {
    /// Create a new client.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        let (identity_base, token_endpoint) = config.auth_emulator_host.as_ref().map_or_else(
            || {
                (
                    "https://identitytoolkit.googleapis.com/v1/".to_string(),
                    "https://securetoken.googleapis.com/v1/token".to_string(),
                )
            },
            |host| {
                (
                    format!("http://{host}/identitytoolkit.googleapis.com/v1/"),
                    format!("http://{host}/securetoken.googleapis.com/v1/token"),
                )
            },
        );
        let firestore_base = config.firestore_emulator_host.as_ref().map_or_else(
            || "https://firestore.googleapis.com/v1/".to_string(),
            |host| format!("http://{host}/v1/"),
        );

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(FirebaseClientInner {
                http: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                identity_base,
                token_endpoint,
                firestore_base,
                database: format!(
                    "projects/{}/databases/(default)/documents",
                    config.project_id
                ),
                request_uri: config.request_uri.clone(),
                cache,
            }),
        }
    }

    /// A backend handle for one visitor, starting signed out.
    #[must_use]
    pub fn session(&self) -> FirebaseBackend {
        FirebaseBackend {
            client: self.clone(),
            session: RwLock::new(None),
        }
    }

    fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    fn request_uri(&self) -> &str {
        &self.inner.request_uri
    }

    fn with_key(&self, url: &str) -> Result<Url, BackendError> {
        Ok(Url::parse_with_params(
            url,
            &[("key", self.inner.api_key.expose_secret())],
        )?)
    }

    fn identity_url(&self, method: &str) -> Result<Url, BackendError> {
        self.with_key(&format!("{}{method}", self.inner.identity_base))
    }

    fn token_url(&self) -> Result<Url, BackendError> {
        self.with_key(&self.inner.token_endpoint)
    }

    /// Full resource name of a document.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}", self.inner.database)
    }

    fn document_url(&self, path: &str) -> Result<Url, BackendError> {
        self.with_key(&format!(
            "{}{}/{path}",
            self.inner.firestore_base, self.inner.database
        ))
    }

    /// Send a Firestore request, authenticated as the visitor when signed in.
    async fn firestore_send(
        &self,
        request: reqwest::RequestBuilder,
        id_token: Option<&SecretString>,
    ) -> Result<reqwest::Response, BackendError> {
        let request = match id_token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        };
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited(retry_after(&response)));
        }
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            return Ok(response);
        }

        let text = response.text().await?;
        let error = serde_json::from_str::<FirestoreErrorEnvelope>(&text).map_or_else(
            |_| BackendError::Firestore {
                status: status.as_str().to_string(),
                message: text.chars().take(200).collect(),
            },
            |envelope| BackendError::Firestore {
                status: envelope.error.status,
                message: envelope.error.message,
            },
        );
        warn!(status = %status, error = %error, "Firestore request failed");
        Err(error)
    }

    /// Fetch a document; `None` if it does not exist.
    #[instrument(skip(self, id_token))]
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
        id_token: Option<&SecretString>,
    ) -> Result<Option<Document>, BackendError> {
        let url = self.document_url(&format!("{collection}/{id}"))?;
        let response = self
            .firestore_send(self.http().get(url), id_token)
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.json().await?))
    }

    /// Create a document, failing if it already exists.
    #[instrument(skip(self, fields, id_token))]
    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        id_token: Option<&SecretString>,
    ) -> Result<Document, BackendError> {
        let mut url = self.document_url(&format!("{collection}/{id}"))?;
        url.query_pairs_mut()
            .append_pair("currentDocument.exists", "false");
        let response = self
            .firestore_send(
                self.http().patch(url).json(&json!({ "fields": fields })),
                id_token,
            )
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(format!("{collection}/{id}")));
        }
        Ok(response.json().await?)
    }

    /// Every document in a collection, following page tokens.
    #[instrument(skip(self, id_token))]
    async fn list_documents(
        &self,
        collection: &str,
        id_token: Option<&SecretString>,
    ) -> Result<Vec<Document>, BackendError> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.document_url(collection)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", LIST_PAGE_SIZE);
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let response = self
                .firestore_send(self.http().get(url), id_token)
                .await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                break;
            }
            let page: ListDocumentsResponse = response.json().await?;
            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = documents.len(), "Listed documents");
        Ok(documents)
    }

    /// Write documents in one atomic commit.
    #[instrument(skip(self, writes, id_token), fields(count = writes.len()))]
    async fn commit(
        &self,
        writes: Vec<(String, Fields)>,
        id_token: Option<&SecretString>,
    ) -> Result<(), BackendError> {
        let url = self.with_key(&format!(
            "{}{}:commit",
            self.inner.firestore_base, self.inner.database
        ))?;
        let writes: Vec<_> = writes
            .into_iter()
            .map(|(name, fields)| json!({ "update": { "name": name, "fields": fields } }))
            .collect();
        self.firestore_send(
            self.http().post(url).json(&json!({ "writes": writes })),
            id_token,
        )
        .await?;
        Ok(())
    }

    /// All category documents, cached.
    async fn categories(&self, id_token: Option<&SecretString>) -> Result<Vec<Category>, BackendError> {
        if let Some(categories) = self.inner.cache.get(CATEGORIES_COLLECTION).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = self
            .list_documents(CATEGORIES_COLLECTION, id_token)
            .await?
            .iter()
            .map(Document::decode)
            .collect::<Result<Vec<Category>, _>>()?;

        self.inner
            .cache
            .insert(CATEGORIES_COLLECTION.to_string(), categories.clone())
            .await;
        Ok(categories)
    }
}

#[derive(Deserialize)]
struct FirestoreErrorEnvelope {
    error: FirestoreErrorBody,
}

#[derive(Deserialize)]
struct FirestoreErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Seconds from a `Retry-After` header, defaulting to one second.
fn retry_after(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

// =============================================================================
// FirebaseBackend
// =============================================================================

/// Per-visitor Firebase backend.
pub struct FirebaseBackend {
    client: FirebaseClient,
    session: RwLock<Option<AuthSession>>,
}

impl FirebaseBackend {
    async fn id_token(&self) -> Option<SecretString> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.id_token.clone())
    }

    async fn establish(&self, session: AuthSession) -> UserCredential {
        let user = session.user.clone();
        info!(uid = %user.uid, "Signed in");
        *self.session.write().await = Some(session);
        UserCredential { user }
    }
}

#[async_trait]
impl Backend for FirebaseBackend {
    async fn current_user(&self) -> Result<Option<AuthUser>, BackendError> {
        let Some(session) = self.session.read().await.clone() else {
            return Ok(None);
        };

        match self.client.lookup(&session.id_token).await {
            Ok(user) => Ok(user),
            Err(BackendError::Auth {
                code: AuthErrorCode::SessionExpired,
                ..
            }) => {
                debug!(uid = %session.user.uid, "ID token expired, refreshing");
                match self.client.refresh(&session).await {
                    Ok(refreshed) => {
                        let user = self.client.lookup(&refreshed.id_token).await?;
                        *self.session.write().await = Some(refreshed);
                        Ok(user)
                    }
                    Err(BackendError::Auth {
                        code: AuthErrorCode::SessionExpired,
                        ..
                    }) => {
                        *self.session.write().await = None;
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_google(
        &self,
        id_token: &SecretString,
    ) -> Result<UserCredential, BackendError> {
        let session = self.client.sign_in_with_google_id_token(id_token).await?;
        Ok(self.establish(session).await)
    }

    async fn sign_in_with_email_and_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserCredential, BackendError> {
        let email = validate_credentials(email, password)?;
        let session = self.client.sign_in_with_password(&email, password).await?;
        Ok(self.establish(session).await)
    }

    async fn create_user_with_email_and_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<UserCredential, BackendError> {
        let email = validate_credentials(email, password)?;
        let session = self.client.sign_up(&email, password).await?;
        Ok(self.establish(session).await)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.session.write().await.take() {
            info!(uid = %session.user.uid, "Signed out");
        }
        Ok(())
    }

    async fn create_user_document_from_auth(
        &self,
        user: &AuthUser,
        details: &AdditionalDetails,
    ) -> Result<UserSnapshot, BackendError> {
        let token = self.id_token().await;
        let uid = user.uid.as_str();

        if let Some(document) = self
            .client
            .get_document(USERS_COLLECTION, uid, token.as_ref())
            .await?
        {
            return Ok(UserSnapshot {
                id: user.uid.clone(),
                data: document.decode()?,
            });
        }

        let data = UserDocument::for_new_user(user, details, Utc::now());
        let mut fields = encode_fields(&data)?;
        fields.insert("createdAt".to_string(), Value::from(data.created_at));

        let document = match self
            .client
            .create_document(USERS_COLLECTION, uid, fields, token.as_ref())
            .await
        {
            Ok(document) => {
                info!(uid = %user.uid, "Created user document");
                document
            }
            // Another sign-in created it between our read and write.
            Err(e) if e.is_already_exists() => {
                debug!(uid = %user.uid, "User document already created, reading it");
                self.client
                    .get_document(USERS_COLLECTION, uid, token.as_ref())
                    .await?
                    .ok_or_else(|| BackendError::NotFound(format!("{USERS_COLLECTION}/{uid}")))?
            }
            Err(e) => return Err(e),
        };

        Ok(UserSnapshot {
            id: user.uid.clone(),
            data: document.decode()?,
        })
    }

    async fn get_categories_and_documents(&self) -> Result<Vec<Category>, BackendError> {
        let token = self.id_token().await;
        self.client.categories(token.as_ref()).await
    }

    async fn add_collection_and_documents(
        &self,
        collection: &str,
        categories: &[Category],
    ) -> Result<(), BackendError> {
        let token = self.id_token().await;
        let writes = categories
            .iter()
            .map(|category| {
                Ok((
                    self.client.document_name(collection, &category.key()),
                    encode_fields(category)?,
                ))
            })
            .collect::<Result<Vec<_>, BackendError>>()?;

        self.client.commit(writes, token.as_ref()).await?;
        self.client.inner.cache.invalidate(collection).await;
        info!(collection, count = categories.len(), "Batch write done");
        Ok(())
    }
}
