//! Product domain type.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use pomelo_core::{ProductId, UserId};

/// A catalog product.
#[derive(Debug, Clone)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Product title (stored lowercased, as entered through the admin form).
    pub title: String,
    /// Long-form description.
    pub description: String,
    /// Unit price in the shop currency.
    pub price: Decimal,
    /// Path of the uploaded product image, relative to the image root.
    pub image_url: String,
    /// The admin user who created this product.
    pub created_by: UserId,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}
