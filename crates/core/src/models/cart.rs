//! Cart line items and the ordered cart collection.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Design;
use crate::types::DesignId;

/// One design's entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The design being bought.
    pub design_id: DesignId,
    /// Design name, denormalized for display.
    pub name: String,
    /// Preview image, denormalized for display.
    #[serde(default)]
    pub image: Option<String>,
    /// Price of a single pair.
    pub unit_price: Decimal,
    /// Number of pairs, always at least 1.
    pub quantity: u32,
}

impl LineItem {
    /// Create a single-pair line item for a design.
    #[must_use]
    pub fn for_design(design: &Design, unit_price: Decimal) -> Self {
        Self {
            design_id: design.id.clone(),
            name: design.name.clone(),
            image: design.preview.as_ref().map(ToString::to_string),
            unit_price,
            quantity: 1,
        }
    }

    /// Set the quantity (clamped to at least 1).
    #[must_use]
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Ordered collection of line items, at most one per design.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up the line item for a design.
    #[must_use]
    pub fn get(&self, id: &DesignId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.design_id == id)
    }

    /// Append an item, or add its quantity to the existing line for the same
    /// design.
    pub fn add(&mut self, item: LineItem) {
        let quantity = item.quantity.max(1);
        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|existing| existing.design_id == item.design_id)
        {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(LineItem { quantity, ..item });
        }
    }

    /// Remove the line for a design. Returns whether anything was removed.
    pub fn remove(&mut self, id: &DesignId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| &item.design_id != id);
        self.items.len() != before
    }

    /// Set the quantity for a design; zero or less removes the line.
    ///
    /// Returns whether a line with that id existed.
    pub fn update_quantity(&mut self, id: &DesignId, quantity: i64) -> bool {
        let Ok(quantity) = u32::try_from(quantity) else {
            return if quantity <= 0 {
                self.remove(id)
            } else {
                self.set_existing(id, u32::MAX)
            };
        };
        if quantity == 0 {
            return self.remove(id);
        }
        self.set_existing(id, quantity)
    }

    fn set_existing(&mut self, id: &DesignId, quantity: u32) -> bool {
        match self.items.iter_mut().find(|item| &item.design_id == id) {
            Some(item) => {
                item.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Sum of `unit_price × quantity` over all items.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Sum of quantities over all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, price: i64, quantity: u32) -> LineItem {
        LineItem {
            design_id: DesignId::new(id),
            name: format!("Design {id}"),
            image: None,
            unit_price: Decimal::from(price),
            quantity,
        }
    }

    #[test]
    fn test_total_and_count() {
        let mut cart = Cart::new();
        cart.add(item("a", 500, 2));
        cart.add(item("b", 1200, 1));
        assert_eq!(cart.total(), Decimal::from(2200));
        assert_eq!(cart.item_count(), 3);
    }

    #[test]
    fn test_adding_same_design_increments() {
        let mut cart = Cart::new();
        cart.add(item("a", 500, 1));
        cart.add(item("a", 500, 1));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.get(&DesignId::new("a")).unwrap().quantity, 2);
        assert_eq!(cart.total(), Decimal::from(1000));
    }

    #[test]
    fn test_add_keeps_insertion_order() {
        let mut cart = Cart::new();
        cart.add(item("b", 1, 1));
        cart.add(item("a", 1, 1));
        cart.add(item("b", 1, 1));
        let ids: Vec<&str> = cart.items().iter().map(|i| i.design_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_zero_quantity_item_counts_as_one() {
        let mut cart = Cart::new();
        cart.add(item("a", 100, 0));
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_update_quantity_zero_equals_remove() {
        let mut updated = Cart::new();
        updated.add(item("a", 500, 2));
        updated.add(item("b", 1200, 1));
        let mut removed = updated.clone();

        assert!(updated.update_quantity(&DesignId::new("a"), 0));
        assert!(removed.remove(&DesignId::new("a")));
        assert_eq!(updated, removed);
    }

    #[test]
    fn test_update_quantity_negative_removes() {
        let mut cart = Cart::new();
        cart.add(item("a", 500, 2));
        assert!(cart.update_quantity(&DesignId::new("a"), -3));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_sets_value() {
        let mut cart = Cart::new();
        cart.add(item("a", 500, 2));
        assert!(cart.update_quantity(&DesignId::new("a"), 5));
        assert_eq!(cart.total(), Decimal::from(2500));
        assert!(!cart.update_quantity(&DesignId::new("missing"), 5));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = Cart::new();
        cart.add(item("a", 500, 2));
        cart.add(item("b", 1200, 1));
        assert!(!cart.remove(&DesignId::new("zzz")));
        assert!(cart.remove(&DesignId::new("a")));
        assert_eq!(cart.item_count(), 1);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Decimal::ZERO);
    }

    #[test]
    fn test_line_item_for_design() {
        let design = Design::new("Court Classic", crate::types::ColorMap::new(), None);
        let line = LineItem::for_design(&design, Decimal::from(2499)).with_quantity(0);
        assert_eq!(line.quantity, 1);
        assert_eq!(line.design_id, design.id);
        assert_eq!(line.line_total(), Decimal::from(2499));
    }
}
