//! Identity Toolkit (Firebase Auth) REST calls.
//!
//! Endpoints used:
//!
//! - `accounts:signUp` - create an email/password account
//! - `accounts:signInWithPassword` - email/password sign-in
//! - `accounts:signInWithIdp` - exchange a Google ID token
//! - `accounts:lookup` - resolve an ID token to its user
//! - `securetoken.googleapis.com/v1/token` - refresh an expired ID token

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crown_core::{Email, UserId};

use super::FirebaseClient;
use crate::backend::{AuthErrorCode, BackendError};
use crate::models::AuthUser;

/// Tokens and identity of a signed-in visitor.
#[derive(Clone)]
pub struct AuthSession {
    pub user: AuthUser,
    pub id_token: SecretString,
    pub refresh_token: SecretString,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_idp_credential: bool,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    id_token: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    grant_type: &'static str,
    refresh_token: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
    id_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

/// The token endpoint answers in `snake_case`.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn auth_user(local_id: String, email: Option<String>, display_name: Option<String>) -> AuthUser {
    AuthUser {
        uid: UserId::new(local_id),
        email: email.as_deref().and_then(|e| Email::parse(e).ok()),
        display_name: display_name.filter(|n| !n.is_empty()),
    }
}

impl From<SignInResponse> for AuthSession {
    fn from(response: SignInResponse) -> Self {
        Self {
            user: auth_user(response.local_id, response.email, response.display_name),
            id_token: SecretString::from(response.id_token),
            refresh_token: SecretString::from(response.refresh_token),
        }
    }
}

impl FirebaseClient {
    /// POST to an Identity Toolkit endpoint and decode the response.
    async fn identity_post<B, R>(&self, url: Url, body: &B) -> Result<R, BackendError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .http()
            .post(url)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BackendError::RateLimited(super::retry_after(&response)));
        }

        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            debug!(status = %status, message = %message, "identity toolkit rejected request");
            return Err(BackendError::auth(
                AuthErrorCode::from_identity_toolkit(&message),
                message,
            ));
        }

        Ok(serde_json::from_str(&text)?)
    }

    #[instrument(skip(self, password))]
    pub(super) async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let response: SignInResponse = self
            .identity_post(self.identity_url("accounts:signUp")?, &body)
            .await?;
        Ok(response.into())
    }

    #[instrument(skip(self, password))]
    pub(super) async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let body = PasswordRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            return_secure_token: true,
        };
        let response: SignInResponse = self
            .identity_post(self.identity_url("accounts:signInWithPassword")?, &body)
            .await?;
        Ok(response.into())
    }

    #[instrument(skip_all)]
    pub(super) async fn sign_in_with_google_id_token(
        &self,
        id_token: &SecretString,
    ) -> Result<AuthSession, BackendError> {
        let body = IdpRequest {
            post_body: format!("id_token={}&providerId=google.com", id_token.expose_secret()),
            request_uri: self.request_uri(),
            return_idp_credential: true,
            return_secure_token: true,
        };
        let response: SignInResponse = self
            .identity_post(self.identity_url("accounts:signInWithIdp")?, &body)
            .await?;
        Ok(response.into())
    }

    /// Resolve an ID token to its user; `None` if the account is gone.
    #[instrument(skip_all)]
    pub(super) async fn lookup(
        &self,
        id_token: &SecretString,
    ) -> Result<Option<AuthUser>, BackendError> {
        let body = LookupRequest {
            id_token: id_token.expose_secret(),
        };
        let response: LookupResponse = self
            .identity_post(self.identity_url("accounts:lookup")?, &body)
            .await?;
        Ok(response
            .users
            .into_iter()
            .next()
            .map(|u| auth_user(u.local_id, u.email, u.display_name)))
    }

    /// Exchange a refresh token for a fresh ID token.
    #[instrument(skip_all)]
    pub(super) async fn refresh(
        &self,
        session: &AuthSession,
    ) -> Result<AuthSession, BackendError> {
        let body = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: session.refresh_token.expose_secret(),
        };
        let response: RefreshResponse = self.identity_post(self.token_url()?, &body).await?;
        Ok(AuthSession {
            user: session.user.clone(),
            id_token: SecretString::from(response.id_token),
            refresh_token: SecretString::from(response.refresh_token),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sign_in_response_to_session() {
        let response: SignInResponse = serde_json::from_value(json!({
            "kind": "identitytoolkit#VerifyPasswordResponse",
            "localId": "ZY1rJK0eYLg",
            "email": "jane@example.com",
            "displayName": "",
            "idToken": "eyJhbGciOi...",
            "registered": true,
            "refreshToken": "AEu4IL0...",
            "expiresIn": "3600"
        }))
        .unwrap();

        let session = AuthSession::from(response);
        assert_eq!(session.user.uid.as_str(), "ZY1rJK0eYLg");
        assert_eq!(session.user.email.unwrap().as_str(), "jane@example.com");
        assert!(session.user.display_name.is_none());
        assert_eq!(session.id_token.expose_secret(), "eyJhbGciOi...");
    }

    #[test]
    fn test_session_debug_redacts_tokens() {
        let session = AuthSession {
            user: auth_user("u1".to_string(), None, None),
            id_token: SecretString::from("id-token-value"),
            refresh_token: SecretString::from("refresh-token-value"),
        };
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("id-token-value"));
        assert!(!debug.contains("refresh-token-value"));
    }

    #[test]
    fn test_error_envelope() {
        let envelope: ErrorEnvelope = serde_json::from_value(json!({
            "error": {"code": 400, "message": "EMAIL_EXISTS", "errors": []}
        }))
        .unwrap();
        assert_eq!(
            AuthErrorCode::from_identity_toolkit(&envelope.error.message),
            AuthErrorCode::EmailAlreadyInUse
        );
    }
}
