//! Stripe Checkout Sessions client.
//!
//! The storefront never touches card data: checkout builds a hosted Stripe
//! session from the resolved cart lines and redirects the buyer to it. The
//! cart itself is read-only input here; snapshotting and resetting happen
//! after the buyer returns to the success URL.

use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::StripeConfig;

/// Stripe API base URL.
const BASE_URL: &str = "https://api.stripe.com/v1";

/// Errors that can occur when interacting with the Stripe API.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A line amount could not be expressed in minor currency units.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Failed to parse a response or build the client.
    #[error("parse error: {0}")]
    Parse(String),
}

/// One line of a checkout session: a product at a unit amount in minor
/// currency units (cents), times a quantity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutLineItem {
    pub title: String,
    pub description: String,
    pub unit_amount_minor: i64,
    pub quantity: u32,
}

impl CheckoutLineItem {
    /// Build a line item from a title/description and a decimal unit price.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidAmount` if the price does not fit in
    /// minor currency units.
    pub fn new(
        title: &str,
        description: &str,
        unit_price: Decimal,
        quantity: u32,
    ) -> Result<Self, CheckoutError> {
        let unit_amount_minor = to_minor_units(unit_price)
            .ok_or_else(|| CheckoutError::InvalidAmount(format!("{title}: {unit_price}")))?;

        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
            unit_amount_minor,
            quantity,
        })
    }
}

/// A created checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Opaque session identifier.
    pub id: String,
    /// Hosted payment page the buyer is redirected to.
    pub url: String,
}

/// Stripe Checkout API client.
#[derive(Clone)]
pub struct CheckoutClient {
    client: reqwest::Client,
    currency: String,
}

impl CheckoutClient {
    /// Create a new checkout client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &StripeConfig) -> Result<Self, CheckoutError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| CheckoutError::Parse(format!("invalid API key format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            currency: config.currency.clone(),
        })
    }

    /// Create a checkout session for the given line items.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Api` when Stripe rejects the request and
    /// `CheckoutError::Http` on transport failures.
    pub async fn create_session(
        &self,
        line_items: &[CheckoutLineItem],
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, CheckoutError> {
        let params = session_params(&self.currency, line_items, success_url, cancel_url);

        let response = self
            .client
            .post(format!("{BASE_URL}/checkout/sessions"))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| CheckoutError::Parse(e.to_string()))
    }
}

/// Convert a decimal price to minor currency units (cents).
///
/// Returns `None` for amounts with sub-cent precision or out of i64 range.
#[must_use]
pub fn to_minor_units(price: Decimal) -> Option<i64> {
    let minor = price * Decimal::from(100);
    if minor.fract() != Decimal::ZERO {
        return None;
    }
    minor.to_i64()
}

/// Build the form-encoded parameter list for a session create call.
fn session_params(
    currency: &str,
    line_items: &[CheckoutLineItem],
    success_url: &str,
    cancel_url: &str,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        ("success_url".to_string(), success_url.to_string()),
        ("cancel_url".to_string(), cancel_url.to_string()),
    ];

    for (i, item) in line_items.iter().enumerate() {
        params.push((format!("line_items[{i}][quantity]"), item.quantity.to_string()));
        params.push((
            format!("line_items[{i}][price_data][currency]"),
            currency.to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][unit_amount]"),
            item.unit_amount_minor.to_string(),
        ));
        params.push((
            format!("line_items[{i}][price_data][product_data][name]"),
            item.title.clone(),
        ));
        if !item.description.is_empty() {
            params.push((
                format!("line_items[{i}][price_data][product_data][description]"),
                item.description.clone(),
            ));
        }
    }

    params
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_units() {
        assert_eq!(to_minor_units(Decimal::new(10_50, 2)), Some(1050));
        assert_eq!(to_minor_units(Decimal::new(5, 0)), Some(500));
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
        // Sub-cent precision is rejected rather than silently rounded
        assert_eq!(to_minor_units(Decimal::new(10_505, 3)), None);
    }

    #[test]
    fn test_line_item_converts_price() {
        let item =
            CheckoutLineItem::new("apples", "a bag of apples", Decimal::new(4_25, 2), 3).unwrap();
        assert_eq!(item.unit_amount_minor, 425);
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_line_item_rejects_fractional_cents() {
        let result = CheckoutLineItem::new("apples", "", Decimal::new(4_255, 3), 1);
        assert!(matches!(result, Err(CheckoutError::InvalidAmount(_))));
    }

    #[test]
    fn test_session_params_layout() {
        let items = vec![
            CheckoutLineItem {
                title: "apples".to_string(),
                description: "a bag of apples".to_string(),
                unit_amount_minor: 1000,
                quantity: 2,
            },
            CheckoutLineItem {
                title: "pears".to_string(),
                description: String::new(),
                unit_amount_minor: 500,
                quantity: 1,
            },
        ];

        let params = session_params(
            "usd",
            &items,
            "http://localhost:3000/checkout/success",
            "http://localhost:3000/checkout/cancel",
        );

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("line_items[0][quantity]"), Some("2"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("1000"));
        assert_eq!(
            get("line_items[0][price_data][product_data][name]"),
            Some("apples")
        );
        assert_eq!(get("line_items[1][price_data][unit_amount]"), Some("500"));
        // Empty descriptions are omitted entirely
        assert_eq!(
            get("line_items[1][price_data][product_data][description]"),
            None
        );
    }
}
