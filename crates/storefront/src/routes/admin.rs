//! Admin product management route handlers.
//!
//! Any signed-in user manages their own products; every query and mutation
//! is scoped to the owner, so nobody can edit or delete somebody else's
//! catalog entries. Create and update arrive as multipart forms because of
//! the image upload.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use pomelo_core::ProductId;

use crate::db::{ProductRepository, products::NewProduct};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, RequireAuth, csrf};
use crate::models::Product;
use crate::routes::format_price;
use crate::state::AppState;

/// Where uploaded product images are stored.
const IMAGE_DIR: &str = "data/images";

/// Accepted upload content types.
const ALLOWED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg"];

// =============================================================================
// Templates
// =============================================================================

/// Admin product row display data.
#[derive(Clone)]
pub struct AdminProductView {
    pub id: i32,
    pub title: String,
    pub price: String,
    pub image_url: String,
}

impl From<&Product> for AdminProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            price: format_price(product.price),
            image_url: product.image_url.clone(),
        }
    }
}

/// Values echoed back into the product form.
#[derive(Clone, Default)]
pub struct ProductFormView {
    pub id: i32,
    pub title: String,
    pub price: String,
    pub description: String,
}

/// Admin products list page template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub user_name: String,
    pub products: Vec<AdminProductView>,
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/product_form.html")]
pub struct ProductFormTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub editing: bool,
    pub error: Option<String>,
    pub product: ProductFormView,
}

// =============================================================================
// Multipart Parsing
// =============================================================================

/// An uploaded image file.
struct UploadedImage {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// Parsed product form fields.
#[derive(Default)]
struct ProductFormData {
    title: String,
    price_raw: String,
    description: String,
    csrf: String,
}

/// Read the multipart product form into its fields and optional image.
async fn parse_product_form(
    mut multipart: Multipart,
) -> Result<(ProductFormData, Option<UploadedImage>)> {
    let mut form = ProductFormData::default();
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed form: {e}")))?
    {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        match name.as_str() {
            "image" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("malformed upload: {e}")))?;

                // Browsers submit an empty file part when nothing was picked
                if !bytes.is_empty() {
                    image = Some(UploadedImage {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("malformed form: {e}")))?;
                match name.as_str() {
                    "title" => form.title = value,
                    "price" => form.price_raw = value,
                    "description" => form.description = value,
                    "_csrf" => form.csrf = value,
                    _ => {}
                }
            }
        }
    }

    Ok((form, image))
}

/// Validated product fields.
struct ValidatedProduct {
    title: String,
    price: Decimal,
    description: String,
}

/// Validate the text fields; titles are stored lowercased.
fn validate_form(form: &ProductFormData) -> std::result::Result<ValidatedProduct, String> {
    let title = form.title.trim().to_lowercase();
    if title.is_empty() {
        return Err("Title cannot be empty.".to_string());
    }

    let price: Decimal = form
        .price_raw
        .trim()
        .parse()
        .map_err(|_| "Price must be a number.".to_string())?;
    if price < Decimal::ZERO {
        return Err("Price cannot be negative.".to_string());
    }

    let description = form.description.trim().to_string();
    if description.is_empty() {
        return Err("Description cannot be empty.".to_string());
    }

    Ok(ValidatedProduct {
        title,
        price,
        description,
    })
}

/// Re-render the form with the submitted values and an error message.
fn form_error(
    csrf_token: String,
    editing: bool,
    id: i32,
    form: &ProductFormData,
    error: String,
) -> Response {
    let template = ProductFormTemplate {
        logged_in: true,
        csrf_token,
        editing,
        error: Some(error),
        product: ProductFormView {
            id,
            title: form.title.clone(),
            price: form.price_raw.clone(),
            description: form.description.clone(),
        },
    };
    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

// =============================================================================
// Image Storage
// =============================================================================

/// Keep only filename-safe characters from an uploaded name.
fn sanitize_filename(original: &str) -> String {
    let cleaned: String = original
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Store an uploaded image and return the stored filename.
async fn save_image(image: &UploadedImage) -> std::io::Result<String> {
    let stored_name = format!(
        "{}-{}",
        Utc::now().format("%Y%m%dT%H%M%S%3f"),
        sanitize_filename(&image.filename)
    );

    tokio::fs::create_dir_all(IMAGE_DIR).await?;
    tokio::fs::write(
        std::path::Path::new(IMAGE_DIR).join(&stored_name),
        &image.bytes,
    )
    .await?;

    Ok(stored_name)
}

/// Remove a stored image file, logging instead of failing.
async fn delete_image(stored_name: &str) {
    let path = std::path::Path::new(IMAGE_DIR).join(stored_name);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!(image = %stored_name, "Failed to delete image file: {e}");
    }
}

fn image_is_allowed(image: &UploadedImage) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str())
}

// =============================================================================
// Handlers
// =============================================================================

/// List the current user's products.
#[instrument(skip(state, current, csrf))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
) -> Result<AdminProductsTemplate> {
    let products = ProductRepository::new(state.pool())
        .list_by_owner(current.id)
        .await?;

    Ok(AdminProductsTemplate {
        logged_in: true,
        csrf_token: csrf,
        user_name: current.name,
        products: products.iter().map(AdminProductView::from).collect(),
    })
}

/// Display the empty create form.
#[instrument(skip(_current, csrf))]
pub async fn new_form(
    RequireAuth(_current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
) -> ProductFormTemplate {
    ProductFormTemplate {
        logged_in: true,
        csrf_token: csrf,
        editing: false,
        error: None,
        product: ProductFormView::default(),
    }
}

/// Create a product from the multipart form.
#[instrument(skip(state, session, current, csrf, multipart))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
    multipart: Multipart,
) -> Result<Response> {
    let (form, image) = parse_product_form(multipart).await?;
    csrf::verify(&session, &form.csrf).await?;

    let validated = match validate_form(&form) {
        Ok(v) => v,
        Err(msg) => return Ok(form_error(csrf, false, 0, &form, msg)),
    };

    let Some(image) = image.filter(image_is_allowed) else {
        return Ok(form_error(
            csrf,
            false,
            0,
            &form,
            "Attached file is not an image.".to_string(),
        ));
    };

    let image_url = save_image(&image)
        .await
        .map_err(|e| AppError::Internal(format!("failed to store image: {e}")))?;

    ProductRepository::new(state.pool())
        .create(
            &NewProduct {
                title: &validated.title,
                description: &validated.description,
                price: validated.price,
                image_url: &image_url,
            },
            current.id,
        )
        .await?;

    Ok(Redirect::to("/admin/products").into_response())
}

/// Display the edit form for an owned product.
#[instrument(skip(state, current, csrf))]
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i32>,
) -> Result<ProductFormTemplate> {
    let product = owned_product(&state, ProductId::new(id), current.id).await?;

    Ok(ProductFormTemplate {
        logged_in: true,
        csrf_token: csrf,
        editing: true,
        error: None,
        product: ProductFormView {
            id: product.id.as_i32(),
            title: product.title,
            price: product.price.to_string(),
            description: product.description,
        },
    })
}

/// Update an owned product from the multipart form.
///
/// A new image replaces the stored file; without one the old image stays.
#[instrument(skip(state, session, current, csrf, multipart))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Response> {
    let product = owned_product(&state, ProductId::new(id), current.id).await?;

    let (form, image) = parse_product_form(multipart).await?;
    csrf::verify(&session, &form.csrf).await?;

    let validated = match validate_form(&form) {
        Ok(v) => v,
        Err(msg) => return Ok(form_error(csrf, true, product.id.as_i32(), &form, msg)),
    };

    let image_url = match image {
        Some(image) => {
            if !image_is_allowed(&image) {
                return Ok(form_error(
                    csrf,
                    true,
                    product.id.as_i32(),
                    &form,
                    "Attached file is not an image.".to_string(),
                ));
            }
            let stored = save_image(&image)
                .await
                .map_err(|e| AppError::Internal(format!("failed to store image: {e}")))?;
            delete_image(&product.image_url).await;
            stored
        }
        None => product.image_url.clone(),
    };

    ProductRepository::new(state.pool())
        .update(
            product.id,
            current.id,
            &NewProduct {
                title: &validated.title,
                description: &validated.description,
                price: validated.price,
                image_url: &image_url,
            },
        )
        .await?;

    Ok(Redirect::to("/admin/products").into_response())
}

/// Delete form data (just the CSRF token).
#[derive(Debug, serde::Deserialize)]
pub struct DeleteForm {
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Delete an owned product and its image file.
#[instrument(skip(state, session, current, form))]
pub async fn delete(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
    axum::Form(form): axum::Form<DeleteForm>,
) -> Result<Redirect> {
    csrf::verify(&session, &form.csrf).await?;

    let product = owned_product(&state, ProductId::new(id), current.id).await?;

    let deleted = ProductRepository::new(state.pool())
        .delete(product.id, current.id)
        .await?;

    if deleted {
        delete_image(&product.image_url).await;
    }

    Ok(Redirect::to("/admin/products"))
}

/// Load a product and require that `owner` created it.
///
/// Someone else's product responds 404 rather than revealing it exists.
async fn owned_product(
    state: &AppState,
    id: ProductId,
    owner: pomelo_core::UserId,
) -> Result<Product> {
    ProductRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|product| product.created_by == owner)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("photo.png"), "photo.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_filename("my photo (1).jpg"), "myphoto1.jpg");
        assert_eq!(sanitize_filename("日本語"), "upload");
    }

    #[test]
    fn test_validate_form_lowercases_title() {
        let form = ProductFormData {
            title: "  Fresh Apples ".to_string(),
            price_raw: "4.50".to_string(),
            description: "a bag of apples".to_string(),
            csrf: String::new(),
        };

        let validated = validate_form(&form).expect("valid form");
        assert_eq!(validated.title, "fresh apples");
        assert_eq!(validated.price, Decimal::new(4_50, 2));
    }

    #[test]
    fn test_validate_form_rejects_bad_price() {
        let form = ProductFormData {
            title: "apples".to_string(),
            price_raw: "four fifty".to_string(),
            description: "a bag".to_string(),
            csrf: String::new(),
        };
        assert!(validate_form(&form).is_err());

        let form = ProductFormData {
            price_raw: "-1".to_string(),
            ..form
        };
        assert!(validate_form(&form).is_err());
    }

    #[test]
    fn test_image_type_allowlist() {
        let image = |content_type: &str| UploadedImage {
            filename: "x.png".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![1],
        };

        assert!(image_is_allowed(&image("image/png")));
        assert!(image_is_allowed(&image("image/jpeg")));
        assert!(!image_is_allowed(&image("image/gif")));
        assert!(!image_is_allowed(&image("text/html")));
    }
}
