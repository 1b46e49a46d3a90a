//! Sign-in, sign-up and sign-out flow tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use crown_core::{Email, UserId};
use crown_integration_tests::TestApp;
use crown_storefront::models::AuthUser;

fn sign_up_body(email: &str) -> serde_json::Value {
    json!({
        "displayName": "Jane",
        "email": email,
        "password": "hunter22",
        "confirmPassword": "hunter22",
    })
}

#[tokio::test]
async fn test_new_visitor_is_signed_out() {
    let mut app = TestApp::new().await;
    let response = app.get("/api/user").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["currentUser"].is_null());
    assert!(response.body["error"].is_null());
}

#[tokio::test]
async fn test_sign_up_signs_in_with_display_name() {
    let mut app = TestApp::new().await;

    let response = app.post("/api/auth/sign-up", sign_up_body("jane@example.com")).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["displayName"], "Jane");
    assert_eq!(response.body["email"], "jane@example.com");

    let user = app.get("/api/user").await;
    assert_eq!(user.body["currentUser"]["displayName"], "Jane");
    assert_eq!(user.body["isLoading"], false);

    let uid = UserId::new(response.body["id"].as_str().unwrap());
    let document = app.backend.user_document(&uid).await.unwrap();
    assert_eq!(document.display_name.as_deref(), Some("Jane"));
}

#[tokio::test]
async fn test_sign_up_rejects_mismatched_passwords() {
    let mut app = TestApp::new().await;
    let mut body = sign_up_body("jane@example.com");
    body["confirmPassword"] = json!("hunter23");

    let response = app.post("/api/auth/sign-up", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["code"], "bad-request");
}

#[tokio::test]
async fn test_sign_up_with_taken_email_conflicts() {
    let mut first = TestApp::new().await;
    let mut second = first.new_browser();

    first.post("/api/auth/sign-up", sign_up_body("jane@example.com")).await;
    let response = second.post("/api/auth/sign-up", sign_up_body("jane@example.com")).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["error"]["code"], "auth/email-already-in-use");

    let user = second.get("/api/user").await;
    assert!(user.body["currentUser"].is_null());
    assert_eq!(user.body["error"]["code"], "auth/email-already-in-use");
}

#[tokio::test]
async fn test_sign_up_with_weak_password() {
    let mut app = TestApp::new().await;
    let body = json!({
        "displayName": "Jane",
        "email": "jane@example.com",
        "password": "abc",
        "confirmPassword": "abc",
    });

    let response = app.post("/api/auth/sign-up", body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["code"], "auth/weak-password");
}

#[tokio::test]
async fn test_email_sign_in_and_sign_out() {
    let mut app = TestApp::new().await;
    app.backend
        .add_account("jane@example.com", "hunter22", Some("Jane"))
        .await
        .unwrap();

    let response = app
        .post(
            "/api/auth/sign-in",
            json!({ "email": "jane@example.com", "password": "hunter22" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["displayName"], "Jane");

    let signed_out = app.post("/api/auth/sign-out", json!({})).await;
    assert_eq!(signed_out.status, StatusCode::NO_CONTENT);

    let user = app.get("/api/user").await;
    assert!(user.body["currentUser"].is_null());
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    let mut app = TestApp::new().await;
    app.backend
        .add_account("jane@example.com", "hunter22", None)
        .await
        .unwrap();

    let response = app
        .post(
            "/api/auth/sign-in",
            json!({ "email": "jane@example.com", "password": "hunter23" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"]["code"], "auth/wrong-password");
    assert_eq!(response.body["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_invalid_email_is_bad_request() {
    let mut app = TestApp::new().await;

    let response = app
        .post(
            "/api/auth/sign-in",
            json!({ "email": "not-an-email", "password": "hunter22" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"]["code"], "auth/invalid-email");
}

#[tokio::test]
async fn test_google_sign_in() {
    let mut app = TestApp::new().await;
    app.backend
        .register_google_token(
            "google-token",
            AuthUser {
                uid: UserId::new("google-uid"),
                email: Some(Email::parse("jane@gmail.com").unwrap()),
                display_name: Some("Jane G".to_string()),
            },
        )
        .await;

    let response = app
        .post("/api/auth/google", json!({ "idToken": "google-token" }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], "google-uid");
    assert_eq!(response.body["displayName"], "Jane G");

    let rejected = app
        .new_browser()
        .post("/api/auth/google", json!({ "idToken": "forged" }))
        .await;
    assert_eq!(rejected.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sign_in_is_scoped_to_browser() {
    let mut first = TestApp::new().await;
    let mut second = first.new_browser();

    first.post("/api/auth/sign-up", sign_up_body("jane@example.com")).await;

    assert!(!first.get("/api/user").await.body["currentUser"].is_null());
    assert!(second.get("/api/user").await.body["currentUser"].is_null());
}
