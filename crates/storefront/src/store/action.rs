//! Intents dispatched to the store.

use std::fmt;

use secrecy::SecretString;
use serde::Serialize;

use crate::backend::BackendError;
use crate::models::{AdditionalDetails, AuthUser, Category, CurrentUser, Product};

/// Failure carried by a `*Failed` intent.
///
/// `code` keeps the backend's error code (`auth/wrong-password`, ...) so the
/// HTTP layer can choose a status without string matching on messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct ActionError {
    pub code: String,
    pub message: String,
}

impl ActionError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<BackendError> for ActionError {
    fn from(error: BackendError) -> Self {
        Self {
            code: error.code(),
            message: error.to_string(),
        }
    }
}

/// Any intent the store understands.
#[derive(Debug, Clone)]
pub enum Action {
    User(UserAction),
    Categories(CategoriesAction),
    Cart(CartAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    CheckUserSession,
    GoogleSignInStart {
        id_token: SecretString,
    },
    EmailSignInStart {
        email: String,
        password: SecretString,
    },
    SignInSuccess(CurrentUser),
    SignInFailed(ActionError),
    SignUpStart {
        email: String,
        password: SecretString,
        display_name: String,
    },
    SignUpSuccess {
        user: AuthUser,
        additional_details: AdditionalDetails,
    },
    SignUpFailed(ActionError),
    SignOutStart,
    SignOutSuccess,
    SignOutFailed(ActionError),
}

#[derive(Debug, Clone)]
pub enum CategoriesAction {
    FetchCategoriesStart,
    FetchCategoriesSuccess(Vec<Category>),
    FetchCategoriesFailed(ActionError),
}

#[derive(Debug, Clone)]
pub enum CartAction {
    SetIsCartOpen(bool),
    AddItemToCart(Product),
    /// Decrement one unit; the line goes away at zero.
    RemoveItemFromCart(Product),
    /// Drop the whole line.
    ClearItemFromCart(Product),
    ClearCart,
}

/// Stable identifier of an intent's type, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    CheckUserSession,
    GoogleSignInStart,
    EmailSignInStart,
    SignInSuccess,
    SignInFailed,
    SignUpStart,
    SignUpSuccess,
    SignUpFailed,
    SignOutStart,
    SignOutSuccess,
    SignOutFailed,
    FetchCategoriesStart,
    FetchCategoriesSuccess,
    FetchCategoriesFailed,
    SetIsCartOpen,
    AddItemToCart,
    RemoveItemFromCart,
    ClearItemFromCart,
    ClearCart,
}

impl ActionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CheckUserSession => "user/CHECK_USER_SESSION",
            Self::GoogleSignInStart => "user/GOOGLE_SIGN_IN_START",
            Self::EmailSignInStart => "user/EMAIL_SIGN_IN_START",
            Self::SignInSuccess => "user/SIGN_IN_SUCCESS",
            Self::SignInFailed => "user/SIGN_IN_FAILED",
            Self::SignUpStart => "user/SIGN_UP_START",
            Self::SignUpSuccess => "user/SIGN_UP_SUCCESS",
            Self::SignUpFailed => "user/SIGN_UP_FAILED",
            Self::SignOutStart => "user/SIGN_OUT_START",
            Self::SignOutSuccess => "user/SIGN_OUT_SUCCESS",
            Self::SignOutFailed => "user/SIGN_OUT_FAILED",
            Self::FetchCategoriesStart => "category/FETCH_CATEGORIES_START",
            Self::FetchCategoriesSuccess => "category/FETCH_CATEGORIES_SUCCESS",
            Self::FetchCategoriesFailed => "category/FETCH_CATEGORIES_FAILED",
            Self::SetIsCartOpen => "cart/SET_IS_CART_OPEN",
            Self::AddItemToCart => "cart/ADD_ITEM_TO_CART",
            Self::RemoveItemFromCart => "cart/REMOVE_ITEM_FROM_CART",
            Self::ClearItemFromCart => "cart/CLEAR_ITEM_FROM_CART",
            Self::ClearCart => "cart/CLEAR_CART",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    #[must_use]
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::User(action) => match action {
                UserAction::CheckUserSession => ActionKind::CheckUserSession,
                UserAction::GoogleSignInStart { .. } => ActionKind::GoogleSignInStart,
                UserAction::EmailSignInStart { .. } => ActionKind::EmailSignInStart,
                UserAction::SignInSuccess(_) => ActionKind::SignInSuccess,
                UserAction::SignInFailed(_) => ActionKind::SignInFailed,
                UserAction::SignUpStart { .. } => ActionKind::SignUpStart,
                UserAction::SignUpSuccess { .. } => ActionKind::SignUpSuccess,
                UserAction::SignUpFailed(_) => ActionKind::SignUpFailed,
                UserAction::SignOutStart => ActionKind::SignOutStart,
                UserAction::SignOutSuccess => ActionKind::SignOutSuccess,
                UserAction::SignOutFailed(_) => ActionKind::SignOutFailed,
            },
            Self::Categories(action) => match action {
                CategoriesAction::FetchCategoriesStart => ActionKind::FetchCategoriesStart,
                CategoriesAction::FetchCategoriesSuccess(_) => ActionKind::FetchCategoriesSuccess,
                CategoriesAction::FetchCategoriesFailed(_) => ActionKind::FetchCategoriesFailed,
            },
            Self::Cart(action) => match action {
                CartAction::SetIsCartOpen(_) => ActionKind::SetIsCartOpen,
                CartAction::AddItemToCart(_) => ActionKind::AddItemToCart,
                CartAction::RemoveItemFromCart(_) => ActionKind::RemoveItemFromCart,
                CartAction::ClearItemFromCart(_) => ActionKind::ClearItemFromCart,
                CartAction::ClearCart => ActionKind::ClearCart,
            },
        }
    }

    /// The error carried by a `*Failed` intent.
    #[must_use]
    pub const fn error(&self) -> Option<&ActionError> {
        match self {
            Self::User(
                UserAction::SignInFailed(e) | UserAction::SignUpFailed(e) | UserAction::SignOutFailed(e),
            )
            | Self::Categories(CategoriesAction::FetchCategoriesFailed(e)) => Some(e),
            _ => None,
        }
    }
}

impl From<UserAction> for Action {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<CategoriesAction> for Action {
    fn from(action: CategoriesAction) -> Self {
        Self::Categories(action)
    }
}

impl From<CartAction> for Action {
    fn from(action: CartAction) -> Self {
        Self::Cart(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::AuthErrorCode;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            Action::from(UserAction::GoogleSignInStart {
                id_token: SecretString::from("tok")
            })
            .kind()
            .as_str(),
            "user/GOOGLE_SIGN_IN_START"
        );
        assert_eq!(
            Action::from(CategoriesAction::FetchCategoriesStart).kind().to_string(),
            "category/FETCH_CATEGORIES_START"
        );
        assert_eq!(
            Action::from(CartAction::ClearCart).kind(),
            ActionKind::ClearCart
        );
    }

    #[test]
    fn test_debug_hides_credentials() {
        let action = Action::from(UserAction::EmailSignInStart {
            email: "jane@example.com".to_string(),
            password: SecretString::from("hunter22"),
        });
        let debug = format!("{action:?}");
        assert!(debug.contains("jane@example.com"));
        assert!(!debug.contains("hunter22"));
    }

    #[test]
    fn test_error_keeps_backend_code() {
        let error = ActionError::from(BackendError::auth(
            AuthErrorCode::WrongPassword,
            "INVALID_PASSWORD",
        ));
        assert_eq!(error.code, "auth/wrong-password");

        let action = Action::from(UserAction::SignInFailed(error.clone()));
        assert_eq!(action.error(), Some(&error));
        assert!(Action::from(UserAction::SignOutSuccess).error().is_none());
    }
}
