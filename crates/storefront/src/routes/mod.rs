//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Health check
//!
//! # Catalog
//! GET    /api/categories                  - Items of every category, keyed by title
//! GET    /api/categories/{title}          - Items of one category
//!
//! # Cart
//! GET    /api/cart                        - Items, count, total and drawer state
//! DELETE /api/cart                        - Empty the cart
//! POST   /api/cart/items                  - Add one unit of a product
//! POST   /api/cart/items/{id}/decrement   - Remove one unit
//! DELETE /api/cart/items/{id}             - Remove the whole line
//! PUT    /api/cart/open                   - Open or close the cart drawer
//!
//! # Auth
//! GET    /api/user                        - Current user and auth status
//! POST   /api/auth/sign-in                - Email/password sign-in
//! POST   /api/auth/google                 - Google sign-in with an ID token
//! POST   /api/auth/sign-up                - Create an account and sign in
//! POST   /api/auth/sign-out               - Sign out
//! ```

pub mod auth;
pub mod cart;
pub mod categories;

use std::time::Duration;

use axum::{
    Router,
    middleware::from_fn,
    routing::{delete, get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{create_session_layer, request_id_middleware, security_headers_middleware};
use crate::state::AppState;

/// How long a handler waits for the visitor's store to settle.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the catalog routes router.
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(categories::index))
        .route("/{title}", get(categories::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add_item))
        .route("/items/{id}/decrement", post(cart::remove_item))
        .route("/items/{id}", delete(cart::clear_item))
        .route("/open", put(cart::set_open))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/sign-in", post(auth::sign_in))
        .route("/google", post(auth::google_sign_in))
        .route("/sign-up", post(auth::sign_up))
        .route("/sign-out", post(auth::sign_out))
}

/// Create all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/categories", category_routes())
        .nest("/cart", cart_routes())
        .route("/user", get(auth::current_user))
        .nest("/auth", auth_routes())
}

/// Build the full application with its middleware stack.
pub fn router(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        visitor_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
