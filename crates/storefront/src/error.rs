//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::store::{ActionError, StoreError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// An effect handler reported a failure intent.
    #[error("{0}")]
    Action(#[from] ActionError),

    /// The visitor's store did not settle in time.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reading or writing the HTTP session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Action(err) => action_status(&err.code),
            Self::Store(StoreError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Store(StoreError::Closed) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &str {
        match self {
            Self::Action(err) => &err.code,
            Self::Store(_) => "store/timeout",
            Self::Session(_) | Self::Internal(_) => "internal",
            Self::NotFound(_) => "not-found",
            Self::BadRequest(_) => "bad-request",
        }
    }
}

fn action_status(code: &str) -> StatusCode {
    match code {
        "auth/email-already-in-use" => StatusCode::CONFLICT,
        "auth/wrong-password"
        | "auth/user-not-found"
        | "auth/invalid-credential"
        | "auth/user-token-expired"
        | "auth/user-disabled" => StatusCode::UNAUTHORIZED,
        "auth/invalid-email" | "auth/weak-password" | "auth/missing-password" => {
            StatusCode::BAD_REQUEST
        }
        "auth/too-many-requests" => StatusCode::TOO_MANY_REQUESTS,
        "auth/operation-not-allowed" => StatusCode::FORBIDDEN,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Action(err) => match status {
                StatusCode::UNAUTHORIZED => "Invalid credentials".to_string(),
                StatusCode::CONFLICT => "An account with this email already exists".to_string(),
                StatusCode::BAD_GATEWAY => "External service error".to_string(),
                _ => err.message.clone(),
            },
            Self::Store(_) => "Request timed out, please try again".to_string(),
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (
            status,
            Json(json!({ "error": { "code": self.code(), "message": message } })),
        )
            .into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a visitor's action.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
