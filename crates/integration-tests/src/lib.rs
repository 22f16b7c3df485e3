//! Integration tests for Pomelo.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! cargo run -p pomelo-cli -- migrate
//!
//! # Start the storefront
//! cargo run -p pomelo-storefront
//!
//! # Run integration tests
//! cargo test -p pomelo-integration-tests -- --ignored
//! ```
//!
//! Tests drive the running server over HTTP with a cookie-holding client,
//! the way a browser would.

use reqwest::Client;

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Create an HTTP client that keeps its session cookie between requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Pull the CSRF token out of a rendered form.
///
/// Every state-changing form embeds
/// `<input type="hidden" name="_csrf" value="...">`; tests scrape it the way
/// a browser submits it.
#[must_use]
pub fn extract_csrf(html: &str) -> Option<String> {
    let marker = "name=\"_csrf\" value=\"";
    let start = html.find(marker)? + marker.len();
    let rest = html.get(start..)?;
    let end = rest.find('"')?;
    rest.get(..end).map(ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_csrf_finds_token() {
        let html = r#"<form><input type="hidden" name="_csrf" value="abc-123_XY"><button></button></form>"#;
        assert_eq!(extract_csrf(html).unwrap(), "abc-123_XY");
    }

    #[test]
    fn test_extract_csrf_missing() {
        assert_eq!(extract_csrf("<form></form>"), None);
    }
}
