//! Cart endpoint tests.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use serde_json::json;

use crown_integration_tests::TestApp;

#[tokio::test]
async fn test_new_visitor_has_empty_closed_cart() {
    let mut app = TestApp::new().await;
    let response = app.get("/api/cart").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["isCartOpen"], false);
    assert_eq!(response.body["items"], json!([]));
    assert_eq!(response.body["count"], 0);
    assert_eq!(response.body["total"], "0");
}

#[tokio::test]
async fn test_adding_same_product_increments_quantity() {
    let mut app = TestApp::new().await;

    app.post("/api/cart/items", json!({ "productId": 1 })).await;
    let response = app.post("/api/cart/items", json!({ "productId": 1 })).await;

    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Brown Brim");
    assert_eq!(items[0]["quantity"], 2);
    assert_eq!(response.body["count"], 2);
    assert_eq!(response.body["total"], "50");
}

#[tokio::test]
async fn test_cart_total_sums_lines() {
    let mut app = TestApp::new().await;

    app.post("/api/cart/items", json!({ "productId": 1 })).await;
    app.post("/api/cart/items", json!({ "productId": 1 })).await;
    let response = app.post("/api/cart/items", json!({ "productId": 2 })).await;

    assert_eq!(response.body["count"], 3);
    assert_eq!(response.body["total"], "68");
}

#[tokio::test]
async fn test_adding_unknown_product_is_not_found() {
    let mut app = TestApp::new().await;
    let response = app.post("/api/cart/items", json!({ "productId": 9999 })).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/cart").await.body["count"], 0);
}

#[tokio::test]
async fn test_decrement_removes_line_at_zero() {
    let mut app = TestApp::new().await;
    app.post("/api/cart/items", json!({ "productId": 1 })).await;
    app.post("/api/cart/items", json!({ "productId": 1 })).await;

    let once = app.post("/api/cart/items/1/decrement", json!({})).await;
    assert_eq!(once.body["items"][0]["quantity"], 1);

    let twice = app.post("/api/cart/items/1/decrement", json!({})).await;
    assert_eq!(twice.body["items"], json!([]));

    let missing = app.post("/api/cart/items/1/decrement", json!({})).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clear_item_drops_whole_line() {
    let mut app = TestApp::new().await;
    for _ in 0..3 {
        app.post("/api/cart/items", json!({ "productId": 1 })).await;
    }
    app.post("/api/cart/items", json!({ "productId": 2 })).await;

    let response = app.delete("/api/cart/items/1").await;

    assert_eq!(response.status, StatusCode::OK);
    let items = response.body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], 2);
    assert_eq!(response.body["total"], "18");
}

#[tokio::test]
async fn test_toggle_cart_open() {
    let mut app = TestApp::new().await;

    let opened = app.put("/api/cart/open", json!({ "isCartOpen": true })).await;
    assert_eq!(opened.body["isCartOpen"], true);

    let closed = app.put("/api/cart/open", json!({ "isCartOpen": false })).await;
    assert_eq!(closed.body["isCartOpen"], false);
}

#[tokio::test]
async fn test_clear_cart() {
    let mut app = TestApp::new().await;
    app.post("/api/cart/items", json!({ "productId": 1 })).await;
    app.post("/api/cart/items", json!({ "productId": 2 })).await;

    let response = app.delete("/api/cart").await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get("/api/cart").await.body["items"], json!([]));
}

#[tokio::test]
async fn test_carts_are_per_browser() {
    let mut first = TestApp::new().await;
    let mut second = first.new_browser();

    first.post("/api/cart/items", json!({ "productId": 1 })).await;

    assert_eq!(first.get("/api/cart").await.body["count"], 1);
    assert_eq!(second.get("/api/cart").await.body["count"], 0);
}
