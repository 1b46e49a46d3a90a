//! Authentication route handlers.
//!
//! Each handler dispatches the matching start intent to the visitor's store
//! and answers with whatever the effect handlers report back.

use axum::{Json, http::StatusCode};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::STORE_TIMEOUT;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::Visitor;
use crate::models::CurrentUser;
use crate::store::{
    Action, ActionError, UserAction, select_current_user, select_user_error,
    select_user_is_loading,
};

// =============================================================================
// Request Types
// =============================================================================

/// Email sign-in body.
#[derive(Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Google sign-in body: an ID token obtained by the client.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInRequest {
    pub id_token: String,
}

/// Sign-up form body.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

/// The user slice as returned by `GET /api/user`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub current_user: Option<CurrentUser>,
    pub is_loading: bool,
    pub error: Option<ActionError>,
}

// =============================================================================
// Handlers
// =============================================================================

fn is_sign_in_result(action: &Action) -> bool {
    matches!(
        action,
        Action::User(UserAction::SignInSuccess(_) | UserAction::SignInFailed(_))
    )
}

/// Turn the settling intent of a sign-in flow into a response.
fn signed_in(action: Action) -> Result<CurrentUser> {
    match action {
        Action::User(UserAction::SignInSuccess(user)) => {
            set_sentry_user(&user.id, user.email.as_ref().map(|e| e.as_str()));
            add_breadcrumb("auth", "Signed in", None);
            Ok(user)
        }
        Action::User(UserAction::SignInFailed(error) | UserAction::SignUpFailed(error)) => {
            Err(AppError::Action(error))
        }
        other => Err(AppError::Internal(format!(
            "unexpected intent {}",
            other.kind()
        ))),
    }
}

/// Current user, loading flag and last auth error.
pub async fn current_user(visitor: Visitor) -> Json<UserView> {
    Json(visitor.store().select(|s| UserView {
        current_user: select_current_user(s).cloned(),
        is_loading: select_user_is_loading(s),
        error: select_user_error(s).cloned(),
    }))
}

/// Sign in with email and password.
#[instrument(skip(visitor, request), fields(visitor = %visitor.id))]
pub async fn sign_in(
    visitor: Visitor,
    Json(request): Json<SignInRequest>,
) -> Result<Json<CurrentUser>> {
    let action = UserAction::EmailSignInStart {
        email: request.email,
        password: SecretString::from(request.password),
    };
    let settled = visitor
        .store()
        .dispatch_and_wait(action, is_sign_in_result, STORE_TIMEOUT)
        .await?;
    signed_in(settled).map(Json)
}

/// Sign in with a Google ID token.
#[instrument(skip(visitor, request), fields(visitor = %visitor.id))]
pub async fn google_sign_in(
    visitor: Visitor,
    Json(request): Json<GoogleSignInRequest>,
) -> Result<Json<CurrentUser>> {
    let action = UserAction::GoogleSignInStart {
        id_token: SecretString::from(request.id_token),
    };
    let settled = visitor
        .store()
        .dispatch_and_wait(action, is_sign_in_result, STORE_TIMEOUT)
        .await?;
    signed_in(settled).map(Json)
}

/// Create an account, then sign in with it.
#[instrument(skip(visitor, request), fields(visitor = %visitor.id))]
pub async fn sign_up(
    visitor: Visitor,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<CurrentUser>)> {
    if request.password != request.confirm_password {
        return Err(AppError::BadRequest("passwords do not match".to_string()));
    }

    let action = UserAction::SignUpStart {
        email: request.email,
        password: SecretString::from(request.password),
        display_name: request.display_name,
    };
    let settled = visitor
        .store()
        .dispatch_and_wait(
            action,
            |a| {
                is_sign_in_result(a) || matches!(a, Action::User(UserAction::SignUpFailed(_)))
            },
            STORE_TIMEOUT,
        )
        .await?;
    signed_in(settled).map(|user| (StatusCode::CREATED, Json(user)))
}

/// Sign out.
#[instrument(skip(visitor), fields(visitor = %visitor.id))]
pub async fn sign_out(visitor: Visitor) -> Result<StatusCode> {
    let settled = visitor
        .store()
        .dispatch_and_wait(
            UserAction::SignOutStart,
            |a| {
                matches!(
                    a,
                    Action::User(UserAction::SignOutSuccess | UserAction::SignOutFailed(_))
                )
            },
            STORE_TIMEOUT,
        )
        .await?;

    match settled {
        Action::User(UserAction::SignOutFailed(error)) => Err(AppError::Action(error)),
        _ => {
            clear_sentry_user();
            add_breadcrumb("auth", "Signed out", None);
            Ok(StatusCode::NO_CONTENT)
        }
    }
}
