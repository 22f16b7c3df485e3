//! Order domain types.
//!
//! An [`Order`] is an immutable snapshot of a cart taken at checkout time.
//! Its items carry their own copies of the title and unit price, so later
//! catalog or cart changes never show through on past orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pomelo_core::{CartLine, OrderId, ProductId, UserId};

use crate::models::Product;

/// One snapshotted order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product the line referred to when the order was placed.
    pub product_id: ProductId,
    /// Product title at checkout time.
    pub title: String,
    /// Unit price at checkout time.
    pub unit_price: Decimal,
    /// Units ordered.
    pub quantity: u32,
}

impl OrderItem {
    /// Snapshot a cart line against its resolved product.
    #[must_use]
    pub fn from_line(line: &CartLine, product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            unit_price: product.price,
            quantity: line.quantity,
        }
    }

    /// Line total: `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// A completed order.
#[derive(Debug, Clone)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// The user who placed the order.
    pub user_id: UserId,
    /// The user's name at checkout time.
    pub user_name: String,
    /// Deep copy of the cart lines at checkout time.
    pub items: Vec<OrderItem>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Order total, recomputed from the snapshotted lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(OrderItem::line_total).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use pomelo_core::Cart;

    use super::*;

    fn product(id: i32, title: &str, cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            description: String::new(),
            price: Decimal::new(cents, 2),
            image_url: format!("{id}.png"),
            created_by: UserId::new(1),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_is_a_deep_copy() {
        let apples = product(1, "apples", 10_00);
        let pears = product(2, "pears", 5_00);

        let mut cart = Cart::empty();
        cart.add(apples.id, apples.price);
        cart.add(apples.id, apples.price);
        cart.add(pears.id, pears.price);

        let items: Vec<OrderItem> = cart
            .items()
            .iter()
            .map(|line| {
                let p = if line.product == apples.id {
                    &apples
                } else {
                    &pears
                };
                OrderItem::from_line(line, p)
            })
            .collect();

        // Mutating the cart afterwards must not affect the snapshot
        cart.remove(apples.id, apples.price).unwrap();
        cart.clear();

        assert_eq!(items.len(), 2);
        assert_eq!(items.first().unwrap().quantity, 2);
        assert_eq!(items.first().unwrap().title, "apples");
        assert_eq!(
            items.iter().map(OrderItem::line_total).sum::<Decimal>(),
            Decimal::new(25_00, 2)
        );
    }

    #[test]
    fn test_order_total_recomputes_from_lines() {
        let order = Order {
            id: OrderId::new(1),
            user_id: UserId::new(1),
            user_name: "Test".to_string(),
            items: vec![
                OrderItem {
                    product_id: ProductId::new(1),
                    title: "apples".to_string(),
                    unit_price: Decimal::new(10_00, 2),
                    quantity: 2,
                },
                OrderItem {
                    product_id: ProductId::new(2),
                    title: "pears".to_string(),
                    unit_price: Decimal::new(5_00, 2),
                    quantity: 1,
                },
            ],
            created_at: Utc::now(),
        };

        assert_eq!(order.total(), Decimal::new(25_00, 2));
    }
}
