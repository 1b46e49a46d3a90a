//! Crown Clothing storefront library.
//!
//! The state store, the effect handlers that drive authentication and the
//! catalog against the backend, and the JSON API in front of them. Built as a
//! library so the binary, the CLI and the integration tests share it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod sagas;
pub mod seed;
pub mod state;
pub mod store;
