//! Crown Core - Shared types library.
//!
//! This crate provides the value types shared by the storefront library,
//! its binary and the integration tests.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no async.
//! Anything that talks to the identity/document backend lives in
//! `crown-storefront`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
