//! Seed the catalog with products from a YAML file.
//!
//! The seeded products are owned by an existing user (products always have a
//! creator), so create an account through the storefront first and pass its
//! email with `--owner`.
//!
//! # File Format
//!
//! ```yaml
//! products:
//!   - title: pomelo
//!     description: A whole pomelo, about 1.5 kg.
//!     price: "4.50"
//!     image_url: seed-pomelo.png
//! ```

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;

/// Errors that can occur while seeding.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Failed to read seed file {0}: {1}")]
    ReadFile(String, std::io::Error),

    #[error("Failed to parse seed file: {0}")]
    ParseFile(#[from] serde_yaml::Error),

    #[error("No user with email {0}; sign up through the storefront first")]
    UnknownOwner(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// One product entry in the seed file.
#[derive(Debug, Deserialize)]
struct SeedProduct {
    title: String,
    description: String,
    price: Decimal,
    image_url: String,
}

/// Top-level seed file structure.
#[derive(Debug, Deserialize)]
struct SeedFile {
    products: Vec<SeedProduct>,
}

/// Seed products from a YAML file, owned by the user with `owner_email`.
///
/// # Errors
///
/// Returns `SeedError` if the file is unreadable, the owner doesn't exist,
/// or an insert fails.
pub async fn run(file_path: &str, owner_email: &str) -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| SeedError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    let contents = std::fs::read_to_string(file_path)
        .map_err(|e| SeedError::ReadFile(file_path.to_string(), e))?;
    let seed: SeedFile = serde_yaml::from_str(&contents)?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(&database_url).await?;

    let owner_id: Option<i32> = sqlx::query_scalar("SELECT id FROM shop_user WHERE email = $1")
        .bind(owner_email)
        .fetch_optional(&pool)
        .await?;
    let owner_id = owner_id.ok_or_else(|| SeedError::UnknownOwner(owner_email.to_string()))?;

    let count = seed.products.len();
    for product in seed.products {
        insert_product(&pool, owner_id, &product).await?;
        tracing::info!(title = %product.title, "Seeded product");
    }

    tracing::info!("Seeded {count} products");
    Ok(())
}

/// Insert one seed product (titles stored lowercased, as the admin form does).
async fn insert_product(
    pool: &PgPool,
    owner_id: i32,
    product: &SeedProduct,
) -> Result<(), SeedError> {
    sqlx::query(
        "INSERT INTO product (title, description, price, image_url, created_by)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(product.title.trim().to_lowercase())
    .bind(product.description.trim())
    .bind(product.price)
    .bind(&product.image_url)
    .bind(owner_id)
    .execute(pool)
    .await?;

    Ok(())
}
