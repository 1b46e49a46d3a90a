//! Backend error types.

use thiserror::Error;

use crown_core::EmailError;

/// Authentication failure codes, named the way the identity provider's
/// client libraries name them (`auth/...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthErrorCode {
    EmailAlreadyInUse,
    WrongPassword,
    UserNotFound,
    InvalidCredential,
    WeakPassword,
    InvalidEmail,
    MissingPassword,
    TooManyRequests,
    UserDisabled,
    OperationNotAllowed,
    SessionExpired,
    Internal,
}

impl AuthErrorCode {
    /// The `auth/...` code string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailAlreadyInUse => "auth/email-already-in-use",
            Self::WrongPassword => "auth/wrong-password",
            Self::UserNotFound => "auth/user-not-found",
            Self::InvalidCredential => "auth/invalid-credential",
            Self::WeakPassword => "auth/weak-password",
            Self::InvalidEmail => "auth/invalid-email",
            Self::MissingPassword => "auth/missing-password",
            Self::TooManyRequests => "auth/too-many-requests",
            Self::UserDisabled => "auth/user-disabled",
            Self::OperationNotAllowed => "auth/operation-not-allowed",
            Self::SessionExpired => "auth/user-token-expired",
            Self::Internal => "auth/internal-error",
        }
    }

    /// Map an Identity Toolkit error message to a code.
    ///
    /// Messages look like `EMAIL_EXISTS` or
    /// `WEAK_PASSWORD : Password should be at least 6 characters`; only the
    /// part before ` : ` is significant.
    #[must_use]
    pub fn from_identity_toolkit(message: &str) -> Self {
        let reason = message.split(" : ").next().unwrap_or(message).trim();
        match reason {
            "EMAIL_EXISTS" => Self::EmailAlreadyInUse,
            "INVALID_PASSWORD" => Self::WrongPassword,
            "EMAIL_NOT_FOUND" => Self::UserNotFound,
            "INVALID_LOGIN_CREDENTIALS" | "INVALID_IDP_RESPONSE" => Self::InvalidCredential,
            "WEAK_PASSWORD" => Self::WeakPassword,
            "INVALID_EMAIL" => Self::InvalidEmail,
            "MISSING_PASSWORD" => Self::MissingPassword,
            "TOO_MANY_ATTEMPTS_TRY_LATER" => Self::TooManyRequests,
            "USER_DISABLED" => Self::UserDisabled,
            "OPERATION_NOT_ALLOWED" | "PASSWORD_LOGIN_DISABLED" => Self::OperationNotAllowed,
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
                Self::SessionExpired
            }
            _ => Self::Internal,
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur when talking to the identity/document backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The identity provider rejected the request.
    #[error("{code}: {message}")]
    Auth {
        code: AuthErrorCode,
        message: String,
    },

    /// Email failed validation before any request was made.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Document not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The document store returned an error status.
    #[error("Document store error {status}: {message}")]
    Firestore { status: String, message: String },

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A response did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl BackendError {
    /// Shorthand for an authentication failure.
    #[must_use]
    pub fn auth(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self::Auth {
            code,
            message: message.into(),
        }
    }

    /// Whether a create was refused because the document already exists.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(
            self,
            Self::Firestore { status, .. } if status == "ALREADY_EXISTS" || status == "FAILED_PRECONDITION"
        )
    }

    /// Machine-readable error code carried into `*Failed` intents.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Http(_) => "auth/network-request-failed".to_string(),
            Self::Parse(_) | Self::Url(_) | Self::Unexpected(_) => "internal".to_string(),
            Self::Auth { code, .. } => code.as_str().to_string(),
            Self::InvalidEmail(_) => AuthErrorCode::InvalidEmail.as_str().to_string(),
            Self::NotFound(_) => "firestore/not-found".to_string(),
            Self::RateLimited(_) => AuthErrorCode::TooManyRequests.as_str().to_string(),
            Self::Firestore { status, .. } => {
                format!("firestore/{}", status.to_lowercase().replace('_', "-"))
            }
        }
    }
}
