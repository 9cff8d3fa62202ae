//! Shopping cart state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Product;

/// Cart update errors.
#[derive(Error, Debug, PartialEq)]
pub enum CartError {
    #[error("quantity for product {product_id} overflows: {current} + {added}")]
    QuantityOverflow {
        product_id: i64,
        current: u32,
        added: u32,
    },
}

/// One line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    /// Cart-local line id
    pub id: u64,
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    pub fn subtotal(&self) -> f64 {
        self.product.price * f64::from(self.quantity)
    }
}

/// Cart contents with a cached total.
///
/// `total` always equals the sum of `price × quantity` over `items`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CartState {
    items: Vec<CartItem>,
    total: f64,
    next_id: u64,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }

    /// Replace the cart with a server snapshot.
    pub fn set_cart(&mut self, items: Vec<CartItem>) {
        self.next_id = items.iter().map(|i| i.id).max().map_or(0, |id| id + 1);
        self.items = items;
        self.recompute_total();
    }

    /// Add a product, merging into an existing line for the same product.
    ///
    /// Returns the id of the affected line. A merge that would overflow the
    /// line quantity leaves the cart unchanged.
    pub fn add_item(&mut self, product: Product, quantity: u32) -> Result<u64, CartError> {
        let existing = self.items.iter().position(|i| i.product.id == product.id);
        let id = if let Some(pos) = existing {
            let line = &mut self.items[pos];
            line.quantity = line
                .quantity
                .checked_add(quantity)
                .ok_or(CartError::QuantityOverflow {
                    product_id: product.id,
                    current: line.quantity,
                    added: quantity,
                })?;
            line.id
        } else {
            let id = self.next_id;
            self.next_id += 1;
            self.items.push(CartItem {
                id,
                product,
                quantity,
            });
            id
        };
        self.recompute_total();
        Ok(id)
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// Returns false when no line has that id.
    pub fn update_item(&mut self, item_id: u64, quantity: u32) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.id == item_id) else {
            return false;
        };

        if quantity == 0 {
            self.items.remove(pos);
        } else {
            self.items[pos].quantity = quantity;
        }
        self.recompute_total();
        true
    }

    pub fn remove_item(&mut self, item_id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        self.recompute_total();
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.total = 0.0;
    }

    fn recompute_total(&mut self) {
        self.total = self.items.iter().map(CartItem::subtotal).sum();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, price: f64) -> Product {
        Product::new(id, 1, format!("Product {}", id), price)
    }

    #[test]
    fn test_add_merges_same_product() {
        let mut cart = CartState::new();
        let first = cart.add_item(product(1, 2.5), 2).unwrap();
        let second = cart.add_item(product(1, 2.5), 1).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 3);
        assert!((cart.total() - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_total_tracks_updates() {
        let mut cart = CartState::new();
        let a = cart.add_item(product(1, 2.0), 1).unwrap();
        let b = cart.add_item(product(2, 5.0), 2).unwrap();
        assert!((cart.total() - 12.0).abs() < 1e-9);

        assert!(cart.update_item(a, 4));
        assert!((cart.total() - 18.0).abs() < 1e-9);

        assert!(cart.update_item(b, 0));
        assert_eq!(cart.items().len(), 1);
        assert!((cart.total() - 8.0).abs() < 1e-9);

        assert!(!cart.update_item(99, 1));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = CartState::new();
        let a = cart.add_item(product(1, 2.0), 1).unwrap();
        cart.add_item(product(2, 3.0), 1).unwrap();

        assert!(cart.remove_item(a));
        assert!(!cart.remove_item(a));
        assert_eq!(cart.item_count(), 1);

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), 0.0);
    }

    #[test]
    fn test_set_cart_continues_ids() {
        let mut cart = CartState::new();
        cart.set_cart(vec![CartItem {
            id: 41,
            product: product(1, 1.0),
            quantity: 3,
        }]);
        assert!((cart.total() - 3.0).abs() < 1e-9);

        let id = cart.add_item(product(2, 1.0), 1).unwrap();
        assert_eq!(id, 42);
    }

    #[test]
    fn test_merge_overflow_is_rejected() {
        let mut cart = CartState::new();
        let id = cart.add_item(product(1, 1.0), u32::MAX).unwrap();

        let err = cart.add_item(product(1, 1.0), 2).unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityOverflow {
                product_id: 1,
                current: u32::MAX,
                added: 2
            }
        );

        // Unchanged
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].id, id);
        assert_eq!(cart.items()[0].quantity, u32::MAX);

        // Counting units past u32 does not wrap
        cart.add_item(product(2, 1.0), 5).unwrap();
        assert_eq!(cart.item_count(), u64::from(u32::MAX) + 5);
    }
}
