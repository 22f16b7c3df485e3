//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use tracing::instrument;

use crate::db::ProductRepository;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CsrfToken, OptionalAuth};
use crate::routes::products::ProductView;
use crate::state::AppState;

/// How many products the home page features.
const FEATURED_COUNT: i64 = 3;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub products: Vec<ProductView>,
}

/// Display the home page with the newest products.
#[instrument(skip(state, user, csrf))]
pub async fn home(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    CsrfToken(csrf): CsrfToken,
) -> Result<HomeTemplate> {
    let products = ProductRepository::new(state.pool())
        .featured(FEATURED_COUNT)
        .await?;

    Ok(HomeTemplate {
        logged_in: user.is_some(),
        csrf_token: csrf,
        products: products.iter().map(ProductView::from).collect(),
    })
}
