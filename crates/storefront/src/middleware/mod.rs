//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span with `request_id` and `visitor_id` fields)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (`nosniff`, `no-store`, deny-all CSP)
//! 5. Session layer (tower-sessions with the in-memory store)
//!
//! Handlers reach the visitor's store through the [`Visitor`] extractor.

pub mod request_id;
pub mod security_headers;
pub mod session;
pub mod visitor;

pub use request_id::{RequestId, request_id_middleware};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
pub use visitor::Visitor;
