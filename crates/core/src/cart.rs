//! The visitor's shopping cart.
//!
//! An ordered collection of `(flower, quantity)` lines keyed by flower id.
//! The total is never stored: it is derived from the lines on every read, so
//! it cannot drift from `Σ price × quantity`.
//!
//! The cart has no error conditions. Quantities coming from form input are
//! filtered by the caller; [`Cart::set_quantity`] simply ignores anything that
//! is not positive, so a line can never hold a zero or negative quantity.
//!
//! # Example
//!
//! ```rust
//! use florist_core::{Cart, Flower, FlowerId, Price};
//!
//! let rose = Flower {
//!     id: FlowerId::new(1),
//!     name: "Rose".to_string(),
//!     description: String::new(),
//!     price: Price::from_rubles(500),
//!     image: None,
//!     image_url: None,
//!     category: None,
//!     in_stock: true,
//! };
//!
//! let mut cart = Cart::default();
//! cart.add(rose.clone());
//! cart.add(rose);
//!
//! assert_eq!(cart.lines().len(), 1);
//! assert_eq!(cart.total(), Price::from_rubles(1000));
//! ```

use serde::{Deserialize, Serialize};

use crate::{Flower, FlowerId, Price};

/// One line of the cart: a snapshot of the flower plus a positive quantity.
///
/// Serialised with the flower's fields flattened next to `quantity`, which is
/// the item shape the flower API stores on orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub flower: Flower,
    pub quantity: u32,
}

impl CartLine {
    /// Price of the whole line.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.flower.price.times(self.quantity)
    }
}

/// An insertion-ordered cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Add one unit of a flower, merging with an existing line.
    pub fn add(&mut self, flower: Flower) {
        self.add_quantity(flower, 1);
    }

    /// Add `quantity` units of a flower; the same as calling [`Cart::add`]
    /// `quantity` times. Zero is a no-op.
    pub fn add_quantity(&mut self, flower: Flower, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.lines.iter_mut().find(|l| l.flower.id == flower.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.lines.push(CartLine { flower, quantity }),
        }
    }

    /// Remove the line for a flower. Unknown ids are ignored.
    pub fn remove(&mut self, id: FlowerId) {
        self.lines.retain(|l| l.flower.id != id);
    }

    /// Replace the quantity of a line when `quantity > 0`.
    ///
    /// Non-positive quantities and unknown ids are ignored; removal goes
    /// through [`Cart::remove`].
    pub fn set_quantity(&mut self, id: FlowerId, quantity: i64) {
        let Ok(quantity) = u32::try_from(quantity) else {
            return;
        };
        if quantity == 0 {
            return;
        }
        if let Some(line) = self.lines.iter_mut().find(|l| l.flower.id == id) {
            line.quantity = quantity;
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of price × quantity over all lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units, shown as the header badge.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0u32, |acc, l| acc.saturating_add(l.quantity))
    }

    /// The lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// The line for a flower, if present.
    #[must_use]
    pub fn line(&self, id: FlowerId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.flower.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn flower(id: i32, rubles: i64) -> Flower {
        Flower {
            id: FlowerId::new(id),
            name: format!("Flower {id}"),
            description: String::new(),
            price: Price::from_rubles(rubles),
            image: None,
            image_url: None,
            category: None,
            in_stock: true,
        }
    }

    fn expected_total(cart: &Cart) -> Price {
        cart.lines()
            .iter()
            .map(|l| l.flower.price.times(l.quantity))
            .sum()
    }

    #[test]
    fn test_add_same_flower_twice_merges() {
        let mut cart = Cart::default();
        cart.add(flower(1, 500));
        cart.add(flower(1, 500));

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
        assert_eq!(cart.total(), Price::from_rubles(1000));
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut cart = Cart::default();
        cart.add(flower(3, 100));
        cart.add(flower(1, 200));
        cart.add(flower(3, 100));

        let ids: Vec<_> = cart.lines().iter().map(|l| l.flower.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_set_quantity_ignores_non_positive() {
        let mut cart = Cart::default();
        cart.add(flower(1, 500));
        cart.set_quantity(FlowerId::new(1), 0);
        cart.set_quantity(FlowerId::new(1), -3);
        assert_eq!(cart.line(FlowerId::new(1)).unwrap().quantity, 1);

        cart.set_quantity(FlowerId::new(1), 4);
        assert_eq!(cart.line(FlowerId::new(1)).unwrap().quantity, 4);
    }

    #[test]
    fn test_set_quantity_unknown_id_is_noop() {
        let mut cart = Cart::default();
        cart.add(flower(1, 500));
        cart.set_quantity(FlowerId::new(99), 5);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::default();
        cart.add(flower(1, 500));
        cart.add(flower(2, 300));
        cart.remove(FlowerId::new(1));
        assert_eq!(cart.total(), Price::from_rubles(300));

        cart.clear();
        assert!(cart.is_empty());
        assert!(cart.total().is_zero());
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_add_quantity_matches_repeated_add() {
        let mut repeated = Cart::default();
        for _ in 0..3 {
            repeated.add(flower(5, 150));
        }

        let mut bulk = Cart::default();
        bulk.add_quantity(flower(5, 150), 3);
        bulk.add_quantity(flower(6, 10), 0);

        assert_eq!(repeated, bulk);
    }

    #[test]
    fn test_total_tracks_every_mutation() {
        // Deterministic pseudo-random walk over add/remove/set_quantity.
        let mut cart = Cart::default();
        let mut seed: u64 = 0x5eed;
        for _ in 0..500 {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            let id = i32::try_from(seed % 7).unwrap();
            let price = i64::from(id) * 100 + 50;
            match (seed >> 8) % 4 {
                0 | 1 => cart.add(flower(id, price)),
                2 => cart.remove(FlowerId::new(id)),
                _ => cart.set_quantity(FlowerId::new(id), i64::try_from((seed >> 16) % 6).unwrap() - 1),
            }

            assert_eq!(cart.total(), expected_total(&cart));
            assert!(cart.lines().iter().all(|l| l.quantity >= 1));
        }
    }

    #[test]
    fn test_line_serializes_flat() {
        let mut cart = Cart::default();
        cart.add(flower(1, 500));
        let json = serde_json::to_value(&cart.lines()[0]).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Flower 1");
        assert_eq!(json["quantity"], 1);
    }
}
