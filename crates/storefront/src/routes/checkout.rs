//! Checkout route handlers.
//!
//! `show` builds a payment session from the resolved cart lines and hands
//! the buyer to the gateway. `success` converts the cart into an order
//! snapshot and then resets the cart - two sequential writes, deliberately
//! not wrapped in a transaction: if the reset fails the order still exists
//! and the cart stays populated.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::Redirect,
};
use tracing::instrument;

use pomelo_core::ProductId;

use crate::db::{OrderRepository, ProductRepository, UserRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, RequireAuth};
use crate::models::{OrderItem, Product, User};
use crate::routes::cart::CartItemView;
use crate::routes::format_price;
use crate::services::checkout::CheckoutLineItem;
use crate::state::AppState;

/// Checkout summary page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub items: Vec<CartItemView>,
    pub total: String,
    pub session_id: String,
    pub session_url: String,
}

/// Load the user and resolve every cart line to its product.
///
/// Checkout needs full product data for each line; a line whose product has
/// vanished from the catalog is a fault here.
async fn resolve_cart(
    state: &AppState,
    user_id: pomelo_core::UserId,
) -> Result<(User, Vec<(pomelo_core::CartLine, Product)>)> {
    let user = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {user_id}")))?;

    let product_ids: Vec<ProductId> = user.cart.items().iter().map(|l| l.product).collect();
    let products = ProductRepository::new(state.pool())
        .get_many(&product_ids)
        .await?;

    let mut resolved = Vec::with_capacity(user.cart.items().len());
    for line in user.cart.items() {
        let product = products
            .iter()
            .find(|p| p.id == line.product)
            .ok_or_else(|| AppError::NotFound(format!("product {}", line.product)))?
            .clone();
        resolved.push((*line, product));
    }

    Ok((user, resolved))
}

/// Show the checkout summary and create the payment session.
#[instrument(skip(state, current, csrf))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
) -> Result<axum::response::Response> {
    use axum::response::IntoResponse;

    let (user, resolved) = resolve_cart(&state, current.id).await?;

    if resolved.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    let line_items = resolved
        .iter()
        .map(|(line, product)| {
            CheckoutLineItem::new(
                &product.title,
                &product.description,
                product.price,
                line.quantity,
            )
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let base_url = &state.config().base_url;
    let session = state
        .checkout()
        .create_session(
            &line_items,
            &format!("{base_url}/checkout/success"),
            &format!("{base_url}/checkout/cancel"),
        )
        .await?;

    let items = resolved
        .iter()
        .map(|(line, product)| CartItemView {
            product_id: product.id.as_i32(),
            title: product.title.clone(),
            quantity: line.quantity,
            price: format_price(product.price),
            line_price: format_price(product.price * rust_decimal::Decimal::from(line.quantity)),
        })
        .collect();

    Ok(CheckoutTemplate {
        logged_in: true,
        csrf_token: csrf,
        items,
        total: format_price(user.cart.total()),
        session_id: session.id,
        session_url: session.url,
    }
    .into_response())
}

/// Complete a checkout: snapshot the cart into an order, then reset it.
#[instrument(skip(state, current))]
pub async fn success(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<Redirect> {
    let (mut user, resolved) = resolve_cart(&state, current.id).await?;

    let items: Vec<OrderItem> = resolved
        .iter()
        .map(|(line, product)| OrderItem::from_line(line, product))
        .collect();

    // Snapshot first; only a persisted order justifies clearing the cart
    OrderRepository::new(state.pool())
        .create(user.id, &user.name, &items)
        .await?;

    user.cart.clear();
    UserRepository::new(state.pool())
        .save_cart(user.id, &user.cart)
        .await?;

    Ok(Redirect::to("/orders"))
}

/// Abandoned checkout: back to the cart, nothing was written.
#[instrument]
pub async fn cancel() -> Redirect {
    Redirect::to("/cart")
}
