//! User domain types.
//!
//! An [`AuthUser`] is what the identity provider knows about a visitor. The
//! matching [`UserDocument`] lives in the document store under
//! `users/{uid}` and is created on first sign-in. [`CurrentUser`] is the
//! merged view the store keeps once sign-in completes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crown_core::{Email, UserId};

/// Identity returned by the authentication backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Backend-assigned user ID.
    pub uid: UserId,
    /// Email address, if the provider shares one.
    pub email: Option<Email>,
    /// Display name, if the provider knows one.
    pub display_name: Option<String>,
}

/// Result of a successful sign-in or sign-up call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredential {
    pub user: AuthUser,
}

/// Extra fields merged into a newly created user document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalDetails {
    /// Display name entered on the sign-up form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl AdditionalDetails {
    /// Details carrying only a display name.
    #[must_use]
    pub fn with_display_name(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
        }
    }
}

/// Stored user document (`users/{uid}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub display_name: Option<String>,
    pub email: Option<Email>,
    pub created_at: DateTime<Utc>,
}

impl UserDocument {
    /// Build the document written for a user seen for the first time.
    ///
    /// Values from `details` take precedence over the provider's values.
    #[must_use]
    pub fn for_new_user(user: &AuthUser, details: &AdditionalDetails, now: DateTime<Utc>) -> Self {
        Self {
            display_name: details
                .display_name
                .clone()
                .or_else(|| user.display_name.clone()),
            email: user.email.clone(),
            created_at: now,
        }
    }
}

/// A user document together with its ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub id: UserId,
    pub data: UserDocument,
}

/// The signed-in user as kept in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: UserId,
    pub display_name: Option<String>,
    pub email: Option<Email>,
    pub created_at: DateTime<Utc>,
}

impl From<UserSnapshot> for CurrentUser {
    fn from(snapshot: UserSnapshot) -> Self {
        Self {
            id: snapshot.id,
            display_name: snapshot.data.display_name,
            email: snapshot.data.email,
            created_at: snapshot.data.created_at,
        }
    }
}
