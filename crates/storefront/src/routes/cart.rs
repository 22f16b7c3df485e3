//! Cart route handlers.
//!
//! Every mutation loads the user, mutates the cart aggregate in memory, and
//! persists it with a single `save_cart` write before redirecting back to
//! the cart page. There is no locking: two overlapping mutations on the same
//! user both read the prior cart and the later write wins.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::Redirect,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use pomelo_core::ProductId;

use crate::db::{ProductRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, RequireAuth, csrf};
use crate::models::{Product, User};
use crate::routes::format_price;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: i32,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub items: Vec<CartItemView>,
    pub cart_total: String,
    pub cart_empty: bool,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: i32,
    #[serde(rename = "_csrf")]
    pub csrf: String,
}

/// Resolve the cart's lines against the catalog for display.
///
/// Lines whose product has since been deleted are skipped; the cached total
/// still reflects them until the next mutation.
fn cart_views(user: &User, products: &[Product]) -> Vec<CartItemView> {
    user.cart
        .items()
        .iter()
        .filter_map(|line| {
            let product = products.iter().find(|p| p.id == line.product)?;
            Some(CartItemView {
                product_id: product.id.as_i32(),
                title: product.title.clone(),
                quantity: line.quantity,
                price: format_price(product.price),
                line_price: format_price(
                    product.price * rust_decimal::Decimal::from(line.quantity),
                ),
            })
        })
        .collect()
}

/// Load the authenticated user's full row.
async fn load_user(state: &AppState, id: pomelo_core::UserId) -> Result<User> {
    UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {id}")))
}

/// Display the cart page.
#[instrument(skip(state, current, csrf))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
) -> Result<CartShowTemplate> {
    let user = load_user(&state, current.id).await?;

    let product_ids: Vec<ProductId> = user.cart.items().iter().map(|l| l.product).collect();
    let products = ProductRepository::new(state.pool())
        .get_many(&product_ids)
        .await?;

    let items = cart_views(&user, &products);

    Ok(CartShowTemplate {
        logged_in: true,
        csrf_token: csrf,
        cart_empty: items.is_empty(),
        cart_total: format_price(user.cart.total()),
        items,
    })
}

/// Add one unit of a product to the cart.
#[instrument(skip(state, session, current, form))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    csrf::verify(&session, &form.csrf).await?;

    let product_id = ProductId::new(form.product_id);
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    let mut user = load_user(&state, current.id).await?;
    user.cart.add(product.id, product.price);

    UserRepository::new(state.pool())
        .save_cart(user.id, &user.cart)
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Remove a product's whole line from the cart.
///
/// Removing a line the cart doesn't hold is a fault and responds 404.
#[instrument(skip(state, session, current, form))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(current): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Redirect> {
    csrf::verify(&session, &form.csrf).await?;

    let product_id = ProductId::new(form.product_id);
    let product = ProductRepository::new(state.pool())
        .get(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

    let mut user = load_user(&state, current.id).await?;
    user.cart.remove(product.id, product.price)?;

    UserRepository::new(state.pool())
        .save_cart(user.id, &user.cart)
        .await?;

    Ok(Redirect::to("/cart"))
}
