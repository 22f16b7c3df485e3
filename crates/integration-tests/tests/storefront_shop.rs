//! Integration tests for the public shop pages.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p pomelo-storefront)
//!
//! Run with: cargo test -p pomelo-integration-tests -- --ignored

use reqwest::StatusCode;

use pomelo_integration_tests::{client, storefront_base_url};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_home_page_renders() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(&base_url)
        .send()
        .await
        .expect("Failed to load home page");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read home page");
    assert!(body.contains("Pomelo Market"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_product_listing_paginates() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/products?page=1"))
        .send()
        .await
        .expect("Failed to load products page");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read products page");
    assert!(body.contains("Page 1"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_missing_product_is_404() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/products/999999"))
        .send()
        .await
        .expect("Failed to request missing product");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = resp.text().await.expect("Failed to read error page");
    assert!(body.contains("Page not found"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cart_requires_login() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .expect("Failed to request cart");

    // Redirected to the login page
    assert!(resp.url().path().starts_with("/auth/login"));
}
