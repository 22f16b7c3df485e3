//! Order history and invoice route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;

use pomelo_core::OrderId;

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::filters;
use crate::middleware::{CsrfToken, RequireAuth};
use crate::models::Order;
use crate::routes::format_price;
use crate::services::invoice;
use crate::state::AppState;

/// Where invoice copies are persisted.
const INVOICE_DIR: &str = "data/invoices";

/// Order line display data for templates.
#[derive(Clone)]
pub struct OrderItemView {
    pub title: String,
    pub quantity: u32,
    pub price: String,
}

/// Order display data for templates.
#[derive(Clone)]
pub struct OrderView {
    pub id: i32,
    pub placed_at: String,
    pub total: String,
    pub items: Vec<OrderItemView>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.as_i32(),
            placed_at: order.created_at.format("%B %e, %Y").to_string(),
            total: format_price(order.total()),
            items: order
                .items
                .iter()
                .map(|item| OrderItemView {
                    title: item.title.clone(),
                    quantity: item.quantity,
                    price: format_price(item.unit_price),
                })
                .collect(),
        }
    }
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/index.html")]
pub struct OrdersIndexTemplate {
    pub logged_in: bool,
    pub csrf_token: String,
    pub orders: Vec<OrderView>,
}

/// Display the user's order history.
#[instrument(skip(state, current, csrf))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    CsrfToken(csrf): CsrfToken,
) -> Result<OrdersIndexTemplate> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(current.id)
        .await?;

    Ok(OrdersIndexTemplate {
        logged_in: true,
        csrf_token: csrf,
        orders: orders.iter().map(OrderView::from).collect(),
    })
}

/// Stream an order's PDF invoice.
///
/// Only the order's owner may fetch it; anything else is a 404 so order ids
/// don't leak. A copy is persisted under `data/invoices/` best-effort.
#[instrument(skip(state, current))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response> {
    let order_id = OrderId::new(id);
    let order = OrderRepository::new(state.pool())
        .get(order_id)
        .await?
        .filter(|order| order.user_id == current.id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

    let bytes = invoice::render(&order)?;
    let invoice_name = format!("invoice-{}.pdf", order.id);

    // Keep a durable copy; failing to write one doesn't fail the request
    if let Err(e) = persist_copy(&invoice_name, &bytes).await {
        tracing::warn!(invoice = %invoice_name, "Failed to persist invoice copy: {e}");
    }

    let headers = [
        ("Content-Type", "application/pdf".to_string()),
        (
            "Content-Disposition",
            format!("inline; filename=\"{invoice_name}\""),
        ),
    ];

    Ok((headers, bytes).into_response())
}

/// Write the invoice bytes under [`INVOICE_DIR`].
async fn persist_copy(name: &str, bytes: &[u8]) -> std::io::Result<()> {
    tokio::fs::create_dir_all(INVOICE_DIR).await?;
    tokio::fs::write(std::path::Path::new(INVOICE_DIR).join(name), bytes).await
}
