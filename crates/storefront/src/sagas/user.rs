//! Authentication effect handlers.

use secrecy::SecretString;
use tracing::{info, warn};

use super::{SagaContext, SagaTask, take_latest};
use crate::backend::BackendError;
use crate::models::{AdditionalDetails, AuthUser, CurrentUser};
use crate::store::{Action, ActionError, ActionKind, UserAction};

fn failed(kind: ActionKind, error: BackendError) -> ActionError {
    warn!(action = %kind, error = %error, "Effect failed");
    ActionError::from(error)
}

/// Load (or create) the user document and report the signed-in user.
pub async fn get_snapshot_from_user_auth(
    ctx: &SagaContext,
    user: &AuthUser,
    details: &AdditionalDetails,
) {
    match ctx
        .backend
        .create_user_document_from_auth(user, details)
        .await
    {
        Ok(snapshot) => {
            info!(uid = %snapshot.id, "User signed in");
            ctx.store
                .dispatch(UserAction::SignInSuccess(CurrentUser::from(snapshot)));
        }
        Err(e) => {
            let error = failed(ActionKind::SignInSuccess, e);
            ctx.store.dispatch(UserAction::SignInFailed(error));
        }
    }
}

/// Restore the visitor's session; nothing is dispatched when signed out.
pub async fn is_user_authenticated(ctx: &SagaContext) {
    match ctx.backend.current_user().await {
        Ok(Some(user)) => {
            get_snapshot_from_user_auth(ctx, &user, &AdditionalDetails::default()).await;
        }
        Ok(None) => {}
        Err(e) => {
            let error = failed(ActionKind::CheckUserSession, e);
            ctx.store.dispatch(UserAction::SignInFailed(error));
        }
    }
}

pub async fn sign_in_with_google(ctx: &SagaContext, id_token: &SecretString) {
    match ctx.backend.sign_in_with_google(id_token).await {
        Ok(credential) => {
            get_snapshot_from_user_auth(ctx, &credential.user, &AdditionalDetails::default())
                .await;
        }
        Err(e) => {
            let error = failed(ActionKind::GoogleSignInStart, e);
            ctx.store.dispatch(UserAction::SignInFailed(error));
        }
    }
}

pub async fn sign_in_with_email(ctx: &SagaContext, email: &str, password: &SecretString) {
    match ctx
        .backend
        .sign_in_with_email_and_password(email, password)
        .await
    {
        Ok(credential) => {
            get_snapshot_from_user_auth(ctx, &credential.user, &AdditionalDetails::default())
                .await;
        }
        Err(e) => {
            let error = failed(ActionKind::EmailSignInStart, e);
            ctx.store.dispatch(UserAction::SignInFailed(error));
        }
    }
}

pub async fn sign_up(ctx: &SagaContext, email: &str, password: &SecretString, display_name: &str) {
    match ctx
        .backend
        .create_user_with_email_and_password(email, password)
        .await
    {
        Ok(credential) => {
            ctx.store.dispatch(UserAction::SignUpSuccess {
                user: credential.user,
                additional_details: AdditionalDetails::with_display_name(display_name),
            });
        }
        Err(e) => {
            let error = failed(ActionKind::SignUpStart, e);
            ctx.store.dispatch(UserAction::SignUpFailed(error));
        }
    }
}

pub async fn sign_in_after_sign_up(
    ctx: &SagaContext,
    user: &AuthUser,
    additional_details: &AdditionalDetails,
) {
    get_snapshot_from_user_auth(ctx, user, additional_details).await;
}

pub async fn sign_out(ctx: &SagaContext) {
    match ctx.backend.sign_out().await {
        Ok(()) => ctx.store.dispatch(UserAction::SignOutSuccess),
        Err(e) => {
            let error = failed(ActionKind::SignOutStart, e);
            ctx.store.dispatch(UserAction::SignOutFailed(error));
        }
    }
}

#[must_use]
pub fn on_check_user_session(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::CheckUserSession, |ctx, _| async move {
        is_user_authenticated(&ctx).await;
    })
}

#[must_use]
pub fn on_google_sign_in_start(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::GoogleSignInStart, |ctx, action| async move {
        if let Action::User(UserAction::GoogleSignInStart { id_token }) = action {
            sign_in_with_google(&ctx, &id_token).await;
        }
    })
}

#[must_use]
pub fn on_email_sign_in_start(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::EmailSignInStart, |ctx, action| async move {
        if let Action::User(UserAction::EmailSignInStart { email, password }) = action {
            sign_in_with_email(&ctx, &email, &password).await;
        }
    })
}

#[must_use]
pub fn on_sign_up_start(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::SignUpStart, |ctx, action| async move {
        if let Action::User(UserAction::SignUpStart {
            email,
            password,
            display_name,
        }) = action
        {
            sign_up(&ctx, &email, &password, &display_name).await;
        }
    })
}

#[must_use]
pub fn on_sign_up_success(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::SignUpSuccess, |ctx, action| async move {
        if let Action::User(UserAction::SignUpSuccess {
            user,
            additional_details,
        }) = action
        {
            sign_in_after_sign_up(&ctx, &user, &additional_details).await;
        }
    })
}

#[must_use]
pub fn on_sign_out_start(ctx: &SagaContext) -> SagaTask {
    take_latest(ctx, ActionKind::SignOutStart, |ctx, _| async move {
        sign_out(&ctx).await;
    })
}

/// Start all six authentication watchers.
#[must_use]
pub fn user_sagas(ctx: &SagaContext) -> Vec<SagaTask> {
    vec![
        on_check_user_session(ctx),
        on_google_sign_in_start(ctx),
        on_email_sign_in_start(ctx),
        on_sign_up_start(ctx),
        on_sign_up_success(ctx),
        on_sign_out_start(ctx),
    ]
}
