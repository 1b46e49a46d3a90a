//! User slice: who is signed in and the last authentication failure.

use serde::Serialize;

use super::RootState;
use super::action::{Action, ActionError, UserAction};
use crate::models::CurrentUser;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserState {
    pub current_user: Option<CurrentUser>,
    pub is_loading: bool,
    pub error: Option<ActionError>,
}

pub fn reducer(state: UserState, action: &Action) -> UserState {
    let Action::User(action) = action else {
        return state;
    };

    match action {
        UserAction::GoogleSignInStart { .. }
        | UserAction::EmailSignInStart { .. }
        | UserAction::SignUpStart { .. }
        | UserAction::SignOutStart => UserState {
            is_loading: true,
            error: None,
            ..state
        },
        UserAction::SignInSuccess(user) => UserState {
            current_user: Some(user.clone()),
            is_loading: false,
            error: None,
        },
        UserAction::SignOutSuccess => UserState {
            current_user: None,
            is_loading: false,
            error: None,
        },
        UserAction::SignInFailed(error)
        | UserAction::SignUpFailed(error)
        | UserAction::SignOutFailed(error) => UserState {
            is_loading: false,
            error: Some(error.clone()),
            ..state
        },
        // A visitor with no session gets nothing back, so no loading flag.
        // Sign-in after sign-up continues in the effect handler.
        UserAction::CheckUserSession | UserAction::SignUpSuccess { .. } => state,
    }
}

#[must_use]
pub const fn select_current_user(state: &RootState) -> Option<&CurrentUser> {
    state.user.current_user.as_ref()
}

#[must_use]
pub const fn select_user_is_loading(state: &RootState) -> bool {
    state.user.is_loading
}

#[must_use]
pub const fn select_user_error(state: &RootState) -> Option<&ActionError> {
    state.user.error.as_ref()
}
