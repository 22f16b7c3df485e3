//! The cart aggregate.
//!
//! A [`Cart`] is a single value owned by one user: an ordered list of lines
//! (one per product) plus a cached total. The total is updated at mutation
//! time and is never recomputed from the catalog on read, so every mutation
//! must keep the invariant
//!
//! ```text
//! total == sum(line.quantity * unit_price at last mutation)
//! ```
//!
//! Callers load the owning user, mutate the cart in memory, and persist the
//! whole value with a single write. The type itself does no I/O.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ProductId;

/// Errors from cart mutations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CartError {
    /// Tried to remove a product that has no line in the cart.
    #[error("no cart line for product {0}")]
    LineNotFound(ProductId),
}

/// One cart line: a product reference and how many units of it.
///
/// A cart never holds two lines for the same product; adding an existing
/// product increments the line instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product this line refers to.
    pub product: ProductId,
    /// Number of units, always at least 1.
    pub quantity: u32,
}

/// A user's shopping cart.
///
/// Fields are private so the cached total can only change through the
/// mutation methods below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartLine>,
    total: Decimal,
}

impl Cart {
    /// An empty cart with a zero total.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// The cart lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartLine] {
        &self.items
    }

    /// The cached total, as of the last mutation.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line for `product`, if one exists.
    #[must_use]
    pub fn line(&self, product: ProductId) -> Option<&CartLine> {
        self.items.iter().find(|line| line.product == product)
    }

    /// Add one unit of a product.
    ///
    /// If a line for the product already exists its quantity is incremented;
    /// otherwise a new line with quantity 1 is appended. Either way the total
    /// grows by exactly `unit_price`. The caller guarantees the product
    /// exists in the catalog, so this cannot fail.
    pub fn add(&mut self, product: ProductId, unit_price: Decimal) {
        match self.items.iter_mut().find(|line| line.product == product) {
            Some(line) => line.quantity += 1,
            None => self.items.push(CartLine {
                product,
                quantity: 1,
            }),
        }
        self.total += unit_price;
    }

    /// Remove a product's entire line (all quantity, not one unit).
    ///
    /// The total shrinks by `quantity * unit_price` for the removed line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] when the cart has no line for the
    /// product. Removal of a missing line is a caller bug, never a silent
    /// no-op.
    pub fn remove(&mut self, product: ProductId, unit_price: Decimal) -> Result<(), CartError> {
        let pos = self
            .items
            .iter()
            .position(|line| line.product == product)
            .ok_or(CartError::LineNotFound(product))?;

        let line = self.items.remove(pos);
        self.total -= unit_price * Decimal::from(line.quantity);
        Ok(())
    }

    /// Reset to an empty cart with a zero total, regardless of prior state.
    ///
    /// Used exactly once per checkout, immediately after the order snapshot
    /// has been persisted.
    pub fn clear(&mut self) {
        self.items.clear();
        self.total = Decimal::ZERO;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn usd(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::empty();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_add_to_empty_cart() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(10_00));

        assert_eq!(cart.items().len(), 1);
        let line = cart.line(ProductId::new(1)).unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(cart.total(), usd(10_00));
    }

    #[test]
    fn test_add_same_product_twice_increments_line() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(10_00));
        cart.add(ProductId::new(1), usd(10_00));

        // One line with quantity 2, not two lines
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.line(ProductId::new(1)).unwrap().quantity, 2);
        assert_eq!(cart.total(), usd(20_00));
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(2), usd(5_00));
        cart.add(ProductId::new(1), usd(10_00));
        cart.add(ProductId::new(2), usd(5_00));

        let products: Vec<ProductId> = cart.items().iter().map(|l| l.product).collect();
        assert_eq!(products, vec![ProductId::new(2), ProductId::new(1)]);
    }

    #[test]
    fn test_remove_only_product_empties_cart() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(10_00));

        cart.remove(ProductId::new(1), usd(10_00)).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_remove_drops_whole_line_not_one_unit() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(4_50));
        cart.add(ProductId::new(1), usd(4_50));
        cart.add(ProductId::new(1), usd(4_50));
        cart.add(ProductId::new(2), usd(1_00));

        cart.remove(ProductId::new(1), usd(4_50)).unwrap();

        assert!(cart.line(ProductId::new(1)).is_none());
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), usd(1_00));
    }

    #[test]
    fn test_remove_missing_line_is_a_fault() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(10_00));

        let err = cart.remove(ProductId::new(99), usd(2_00)).unwrap_err();
        assert_eq!(err, CartError::LineNotFound(ProductId::new(99)));
        // Failed removal leaves the cart untouched
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.total(), usd(10_00));
    }

    #[test]
    fn test_add_then_remove_restores_prior_value() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(10_00));
        cart.add(ProductId::new(1), usd(10_00));
        let before = cart.clone();

        cart.add(ProductId::new(2), usd(3_25));
        cart.remove(ProductId::new(2), usd(3_25)).unwrap();

        assert_eq!(cart, before);
    }

    #[test]
    fn test_clear_always_yields_empty_zero() {
        let mut cart = Cart::empty();
        cart.clear();
        assert_eq!(cart, Cart::empty());

        cart.add(ProductId::new(1), usd(10_00));
        cart.add(ProductId::new(2), usd(5_00));
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    // cart = {A: qty 1 @ $10, total $10}; add B (@ $5) -> {A, B, total $15};
    // remove A -> {B, total $5}; reset -> {[], $0}
    #[test]
    fn test_mutation_scenario() {
        let a = ProductId::new(1);
        let b = ProductId::new(2);

        let mut cart = Cart::empty();
        cart.add(a, usd(10_00));
        assert_eq!(cart.total(), usd(10_00));

        cart.add(b, usd(5_00));
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.total(), usd(15_00));

        cart.remove(a, usd(10_00)).unwrap();
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.line(b).unwrap().quantity, 1);
        assert_eq!(cart.total(), usd(5_00));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut cart = Cart::empty();
        cart.add(ProductId::new(1), usd(19_99));
        cart.add(ProductId::new(1), usd(19_99));
        cart.add(ProductId::new(7), usd(2_50));

        let json = serde_json::to_string(&cart).unwrap();
        let back: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }
}
