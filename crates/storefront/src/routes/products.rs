//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, OptionalAuth, csrf};
use crate::models::Product;
use crate::routes::format_price;
use crate::state::AppState;

/// Products shown per catalog page.
const ITEMS_PER_PAGE: i64 = 6;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: format_price(product.price),
            image_url: product.image_url.clone(),
        }
    }
}

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u32>,
}

/// Title search form data.
#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub product_title: String,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub products: Vec<ProductView>,
    pub current_page: u32,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub previous_page: u32,
    pub next_page: u32,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub product: ProductView,
}

/// Search results page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/search.html")]
pub struct SearchResultsTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub searched_title: String,
    pub products: Vec<ProductView>,
}

/// Display the paginated product listing.
#[instrument(skip(state, user, csrf))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CsrfToken(csrf): CsrfToken,
    Query(query): Query<PaginationQuery>,
) -> Result<ProductsIndexTemplate> {
    let current_page = query.page.unwrap_or(1).max(1);
    let repo = ProductRepository::new(state.pool());

    let total = repo.count().await?;
    let offset = i64::from(current_page - 1) * ITEMS_PER_PAGE;
    let products = repo.page(ITEMS_PER_PAGE, offset).await?;

    Ok(ProductsIndexTemplate {
        logged_in: user.is_some(),
        csrf_token: csrf,
        products: products.iter().map(ProductView::from).collect(),
        current_page,
        has_previous_page: current_page > 1,
        has_next_page: total > ITEMS_PER_PAGE * i64::from(current_page),
        previous_page: current_page.saturating_sub(1),
        next_page: current_page + 1,
    })
}

/// Display a product detail page.
#[instrument(skip(state, user, csrf))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CsrfToken(csrf): CsrfToken,
    Path(id): Path<i32>,
) -> Result<ProductShowTemplate> {
    let product = ProductRepository::new(state.pool())
        .get(pomelo_core::ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    Ok(ProductShowTemplate {
        logged_in: user.is_some(),
        csrf_token: csrf,
        product: ProductView::from(&product),
    })
}

/// Search products by title.
#[instrument(skip(state, session, user, csrf, form))]
pub async fn search(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    CsrfToken(csrf): CsrfToken,
    Form(form): Form<SearchForm>,
) -> Result<SearchResultsTemplate> {
    csrf::verify(&session, &form.csrf).await?;

    let searched_title = form.product_title.trim().to_lowercase();
    let products = ProductRepository::new(state.pool())
        .search_by_title(&searched_title)
        .await?;

    Ok(SearchResultsTemplate {
        logged_in: user.is_some(),
        csrf_token: csrf,
        searched_title,
        products: products.iter().map(ProductView::from).collect(),
    })
}
