//! Integration tests for storefront authentication.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p pomelo-storefront)
//!
//! Run with: cargo test -p pomelo-integration-tests -- --ignored

use reqwest::StatusCode;
use uuid::Uuid;

use pomelo_integration_tests::{client, extract_csrf, storefront_base_url};

/// Fresh random credentials so tests don't collide between runs.
fn test_credentials() -> (String, String) {
    let email = format!("it-{}@example.test", Uuid::new_v4());
    ("It Tester".to_string(), email)
}

const TEST_PASSWORD: &str = "integration-test-password";

/// Sign up a fresh user and return the (still logged out) client plus email.
async fn sign_up(client: &reqwest::Client) -> String {
    let base_url = storefront_base_url();
    let (name, email) = test_credentials();

    let page = client
        .get(format!("{base_url}/auth/signup"))
        .send()
        .await
        .expect("Failed to load signup page")
        .text()
        .await
        .expect("Failed to read signup page");
    let csrf = extract_csrf(&page).expect("No CSRF token on signup page");

    let resp = client
        .post(format!("{base_url}/auth/signup"))
        .form(&[
            ("name", name.as_str()),
            ("email", email.as_str()),
            ("password", TEST_PASSWORD),
            ("password_confirm", TEST_PASSWORD),
            ("_csrf", csrf.as_str()),
        ])
        .send()
        .await
        .expect("Failed to sign up");

    assert!(resp.status().is_success() || resp.status().is_redirection());
    email
}

/// Log in and leave the session cookie on the client.
async fn log_in(client: &reqwest::Client, email: &str) {
    let base_url = storefront_base_url();

    let page = client
        .get(format!("{base_url}/auth/login"))
        .send()
        .await
        .expect("Failed to load login page")
        .text()
        .await
        .expect("Failed to read login page");
    let csrf = extract_csrf(&page).expect("No CSRF token on login page");

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[
            ("email", email),
            ("password", TEST_PASSWORD),
            ("_csrf", csrf.as_str()),
        ])
        .send()
        .await
        .expect("Failed to log in");

    assert!(resp.status().is_success() || resp.status().is_redirection());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_health_endpoints() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to reach health endpoint");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to reach readiness endpoint");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_signup_then_login() {
    let client = client();
    let base_url = storefront_base_url();

    let email = sign_up(&client).await;
    log_in(&client, &email).await;

    // Logged-in users can see their (empty) cart
    let resp = client
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .expect("Failed to load cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read cart page");
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_login_with_wrong_password_is_rejected() {
    let client = client();
    let base_url = storefront_base_url();

    let email = sign_up(&client).await;

    let page = client
        .get(format!("{base_url}/auth/login"))
        .send()
        .await
        .expect("Failed to load login page")
        .text()
        .await
        .expect("Failed to read login page");
    let csrf = extract_csrf(&page).expect("No CSRF token on login page");

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[
            ("email", email.as_str()),
            ("password", "definitely-not-it"),
            ("_csrf", csrf.as_str()),
        ])
        .send()
        .await
        .expect("Failed to post login");

    // Bounced back to the login page with an error, not into a session
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Invalid email or password"));

    let resp = client
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .expect("Failed to load cart");
    assert!(resp.url().path().starts_with("/auth/login"));
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_post_without_csrf_token_is_rejected() {
    let client = client();
    let base_url = storefront_base_url();

    let email = sign_up(&client).await;
    log_in(&client, &email).await;

    let resp = client
        .post(format!("{base_url}/cart/add"))
        .form(&[("product_id", "1"), ("_csrf", "forged-token")])
        .send()
        .await
        .expect("Failed to post without CSRF");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
