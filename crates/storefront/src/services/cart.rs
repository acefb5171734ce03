//! In-memory cart store.
//!
//! The cart is owned exclusively by this store for the lifetime of a
//! shopping session. Every mutation is synchronous, recomputes the derived
//! totals, and publishes a fresh [`CartSnapshot`] on the watch channel, so
//! observers never see a partially-applied mutation.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use kiosk_core::{Money, ProductId};

use crate::models::{CartSnapshot, LineItem};

/// Errors from cart mutations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CartError {
    /// The product is already in the cart.
    #[error("product {0} is already in the cart")]
    DuplicateItem(ProductId),

    /// The product is not in the cart.
    #[error("product {0} is not in the cart")]
    NotFound(ProductId),

    /// Quantity below the minimum of 1.
    #[error("quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),
}

/// Observable in-memory cart.
pub struct CartStore {
    items: Mutex<Vec<LineItem>>,
    snapshot: watch::Sender<CartSnapshot>,
}

impl Default for CartStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CartStore {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::empty());
        Self {
            items: Mutex::new(Vec::new()),
            snapshot,
        }
    }

    /// Subscribe to cart snapshots. The receiver immediately holds the
    /// current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot.subscribe()
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Sum of line totals over the selected items.
    #[must_use]
    pub fn selected_total(&self) -> Money {
        self.snapshot.borrow().selected_total
    }

    /// Number of selected items.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.snapshot.borrow().selected_count
    }

    /// Add a line item.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::DuplicateItem`] if a line with the same product
    /// identity exists (the caller adjusts quantity instead), and
    /// [`CartError::InvalidQuantity`] if the item arrives with quantity 0.
    pub fn add_item(&self, item: LineItem) -> Result<(), CartError> {
        if item.quantity < 1 {
            return Err(CartError::InvalidQuantity(item.quantity));
        }
        let mut items = self.lock();
        if items.iter().any(|i| i.product_id == item.product_id) {
            return Err(CartError::DuplicateItem(item.product_id));
        }
        items.push(item);
        self.publish(&items);
        Ok(())
    }

    /// Replace the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidQuantity`] for quantities below 1 -
    /// removal is the only way to reach zero - and [`CartError::NotFound`]
    /// if the product is not in the cart.
    pub fn set_quantity(&self, key: &ProductId, quantity: u32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let mut items = self.lock();
        let item = items
            .iter_mut()
            .find(|i| &i.product_id == key)
            .ok_or_else(|| CartError::NotFound(key.clone()))?;
        item.quantity = quantity;
        self.publish(&items);
        Ok(())
    }

    /// Remove a line. Idempotent: removing an absent key is a no-op.
    pub fn remove_item(&self, key: &ProductId) {
        let mut items = self.lock();
        let before = items.len();
        items.retain(|i| &i.product_id != key);
        if items.len() != before {
            self.publish(&items);
        }
    }

    /// Set the selection flag of a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::NotFound`] if the product is not in the cart.
    pub fn set_selected(&self, key: &ProductId, selected: bool) -> Result<(), CartError> {
        let mut items = self.lock();
        let item = items
            .iter_mut()
            .find(|i| &i.product_id == key)
            .ok_or_else(|| CartError::NotFound(key.clone()))?;
        item.selected = selected;
        self.publish(&items);
        Ok(())
    }

    /// Flip every selection flag to the opposite of "are all currently
    /// selected".
    pub fn toggle_select_all(&self) {
        let mut items = self.lock();
        let all_selected = items.iter().all(|i| i.selected);
        for item in items.iter_mut() {
            item.selected = !all_selected;
        }
        self.publish(&items);
    }

    /// Remove the selected items (after a successful order).
    pub fn remove_selected(&self) {
        let mut items = self.lock();
        items.retain(|i| !i.selected);
        self.publish(&items);
    }

    /// Remove everything.
    pub fn clear(&self) {
        let mut items = self.lock();
        items.clear();
        self.publish(&items);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LineItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, items: &[LineItem]) {
        let selected_total = items
            .iter()
            .filter(|i| i.selected)
            .map(LineItem::line_total)
            .sum();
        let snapshot = CartSnapshot {
            items: items.to_vec(),
            selected_total,
            selected_count: items.iter().filter(|i| i.selected).count(),
        };
        self.snapshot.send_replace(snapshot);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kiosk_core::DiscountPercent;

    use super::*;

    fn item(key: &str, major: i64, discount: u8, quantity: u32, selected: bool) -> LineItem {
        let mut item = LineItem::new(
            ProductId::from(key),
            key.to_uppercase(),
            Money::from_major_units(major),
            DiscountPercent::from_whole(discount).unwrap(),
        )
        .with_quantity(quantity);
        item.selected = selected;
        item
    }

    fn sum_of_selected(cart: &CartStore) -> Money {
        cart.snapshot()
            .items
            .iter()
            .filter(|i| i.selected)
            .map(LineItem::line_total)
            .sum()
    }

    #[test]
    fn test_selected_total_matches_sum_after_every_mutation() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 10, 2, true)).unwrap();
        assert_eq!(cart.selected_total(), sum_of_selected(&cart));

        cart.add_item(item("b", 50, 0, 1, false)).unwrap();
        assert_eq!(cart.selected_total(), sum_of_selected(&cart));

        cart.set_quantity(&ProductId::from("a"), 3).unwrap();
        assert_eq!(cart.selected_total(), sum_of_selected(&cart));

        cart.set_selected(&ProductId::from("b"), true).unwrap();
        assert_eq!(cart.selected_total(), sum_of_selected(&cart));

        cart.remove_item(&ProductId::from("a"));
        assert_eq!(cart.selected_total(), sum_of_selected(&cart));
    }

    #[test]
    fn test_mixed_selection_scenario() {
        // A: $100, 10% off, qty 2, selected -> $180.00
        // B: $50, no discount, qty 1, not selected
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 10, 2, true)).unwrap();
        cart.add_item(item("b", 50, 0, 1, false)).unwrap();

        assert_eq!(cart.selected_total().to_string(), "$180.00");
        assert_eq!(cart.selected_count(), 1);
    }

    #[test]
    fn test_duplicate_add_is_rejected() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 0, 1, true)).unwrap();
        let err = cart.add_item(item("a", 100, 0, 1, true)).unwrap_err();
        assert_eq!(err, CartError::DuplicateItem(ProductId::from("a")));
        assert_eq!(cart.snapshot().items.len(), 1);
    }

    #[test]
    fn test_zero_quantity_is_rejected_and_cart_unchanged() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 0, 2, true)).unwrap();

        let err = cart.set_quantity(&ProductId::from("a"), 0).unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity(0));

        let items = cart.snapshot().items;
        assert_eq!(items.first().map(|i| i.quantity), Some(2));
    }

    #[test]
    fn test_set_quantity_unknown_key() {
        let cart = CartStore::new();
        assert_eq!(
            cart.set_quantity(&ProductId::from("ghost"), 2),
            Err(CartError::NotFound(ProductId::from("ghost")))
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 0, 1, true)).unwrap();
        cart.remove_item(&ProductId::from("a"));
        cart.remove_item(&ProductId::from("a"));
        assert!(cart.snapshot().items.is_empty());
    }

    #[test]
    fn test_toggle_select_all_twice_restores_uniform_flags() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 0, 1, true)).unwrap();
        cart.add_item(item("b", 50, 0, 1, true)).unwrap();

        cart.toggle_select_all();
        assert!(cart.snapshot().items.iter().all(|i| !i.selected));

        cart.toggle_select_all();
        assert!(cart.snapshot().items.iter().all(|i| i.selected));
    }

    #[test]
    fn test_toggle_select_all_from_mixed_selects_everything() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 0, 1, true)).unwrap();
        cart.add_item(item("b", 50, 0, 1, false)).unwrap();

        cart.toggle_select_all();
        assert!(cart.snapshot().items.iter().all(|i| i.selected));
    }

    #[test]
    fn test_watchers_observe_mutations() {
        let cart = CartStore::new();
        let rx = cart.subscribe();
        assert_eq!(rx.borrow().selected_count, 0);

        cart.add_item(item("a", 10, 0, 1, true)).unwrap();
        assert_eq!(rx.borrow().selected_count, 1);
        assert_eq!(rx.borrow().selected_total, Money::from_major_units(10));
    }

    #[test]
    fn test_remove_selected_keeps_unselected() {
        let cart = CartStore::new();
        cart.add_item(item("a", 100, 0, 1, true)).unwrap();
        cart.add_item(item("b", 50, 0, 1, false)).unwrap();

        cart.remove_selected();

        let items = cart.snapshot().items;
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().map(|i| i.product_id.clone()), Some(ProductId::from("b")));
    }
}
