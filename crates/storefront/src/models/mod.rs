//! Domain models for the storefront.
//!
//! Plain records shared by the store, the effect handlers and the backend
//! adapters. Field names serialize in camelCase so they line up with the
//! documents kept in the backend and with the JSON the API returns.

pub mod catalog;
pub mod session;
pub mod user;

pub use catalog::{CartItem, Category, Product};
pub use user::{
    AdditionalDetails, AuthUser, CurrentUser, UserCredential, UserDocument, UserSnapshot,
};
