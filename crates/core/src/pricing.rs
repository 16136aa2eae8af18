//! Checkout figures derived from the cart subtotal.
//!
//! Summaries are pure functions of the cart contents. They are recomputed
//! whenever they are shown and never stored.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Cart;
use crate::types::{CurrencyCode, Price, round_to_unit};

/// Shipping and tax rules applied at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Subtotals strictly above this ship free.
    pub free_shipping_threshold: Decimal,
    /// Flat shipping fee below the threshold.
    pub shipping_fee: Decimal,
    /// Tax rate as a fraction (0.18 = 18%).
    pub tax_rate: Decimal,
    /// Currency for all amounts.
    pub currency: CurrencyCode,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            free_shipping_threshold: Decimal::from(1000),
            shipping_fee: Decimal::from(50),
            tax_rate: Decimal::new(18, 2),
            currency: CurrencyCode::INR,
        }
    }
}

impl PricingPolicy {
    /// Shipping charge for a subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.shipping_fee
        }
    }

    /// Tax for a subtotal, rounded to the nearest currency unit.
    #[must_use]
    pub fn tax_for(&self, subtotal: Decimal) -> Decimal {
        round_to_unit(subtotal * self.tax_rate)
    }

    /// Compute all checkout figures for a subtotal.
    #[must_use]
    pub fn summarize(&self, subtotal: Decimal) -> OrderSummary {
        let shipping = self.shipping_for(subtotal);
        let tax = self.tax_for(subtotal);
        OrderSummary {
            subtotal,
            shipping,
            tax,
            total: round_to_unit(subtotal + shipping + tax),
            currency: self.currency,
        }
    }

    /// Compute checkout figures for the current cart.
    #[must_use]
    pub fn summarize_cart(&self, cart: &Cart) -> OrderSummary {
        self.summarize(cart.total())
    }
}

/// Subtotal, shipping, tax and grand total for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub currency: CurrencyCode,
}

impl OrderSummary {
    /// Whether the order qualifies for free shipping.
    #[must_use]
    pub fn ships_free(&self) -> bool {
        self.shipping.is_zero()
    }

    /// The grand total as a [`Price`].
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::new(self.total, self.currency)
    }

    /// The grand total in the payment gateway's minor unit.
    #[must_use]
    pub fn total_minor_units(&self) -> Option<u64> {
        self.total_price().minor_units()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use crate::types::DesignId;

    fn cart(lines: &[(&str, i64, u32)]) -> Cart {
        let mut cart = Cart::new();
        for (id, price, quantity) in lines {
            cart.add(LineItem {
                design_id: DesignId::new(id),
                name: (*id).to_owned(),
                image: None,
                unit_price: Decimal::from(*price),
                quantity: *quantity,
            });
        }
        cart
    }

    #[test]
    fn test_reference_cart_above_threshold() {
        let summary = PricingPolicy::default().summarize_cart(&cart(&[("a", 500, 2), ("b", 1200, 1)]));
        assert_eq!(summary.subtotal, Decimal::from(2200));
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.tax, Decimal::from(396));
        assert_eq!(summary.total, Decimal::from(2596));
        assert!(summary.ships_free());
        assert_eq!(summary.total_minor_units(), Some(259_600));
    }

    #[test]
    fn test_reference_cart_below_threshold() {
        let policy = PricingPolicy {
            free_shipping_threshold: Decimal::from(2200),
            ..PricingPolicy::default()
        };
        let summary = policy.summarize(Decimal::from(2200));
        assert_eq!(summary.shipping, Decimal::from(50));
        assert_eq!(summary.tax, Decimal::from(396));
        assert_eq!(summary.total, Decimal::from(2646));
    }

    #[test]
    fn test_threshold_is_strict() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.shipping_for(Decimal::from(1000)), Decimal::from(50));
        assert_eq!(policy.shipping_for(Decimal::new(100_001, 2)), Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_to_nearest_unit() {
        let policy = PricingPolicy::default();
        // 999 * 0.18 = 179.82
        assert_eq!(policy.tax_for(Decimal::from(999)), Decimal::from(180));
        // 25 * 0.18 = 4.5
        assert_eq!(policy.tax_for(Decimal::from(25)), Decimal::from(5));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        let policy = PricingPolicy::default();
        for subtotal in [0_i64, 1, 250, 999, 1000, 1001, 4999] {
            let s = policy.summarize(Decimal::from(subtotal));
            assert_eq!(s.total, s.subtotal + s.shipping + s.tax);
        }
    }

    #[test]
    fn test_fractional_subtotal_total_is_rounded() {
        let s = PricingPolicy::default().summarize(Decimal::new(49_950, 2));
        // 499.50 + 50 + round(89.91) = 639.50 -> 640
        assert_eq!(s.tax, Decimal::from(90));
        assert_eq!(s.total, Decimal::from(640));
    }
}
