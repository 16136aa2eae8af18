//! Checkout service: quotes, payment gateway hand-off and order completion.
//!
//! A checkout runs in two steps. [`CheckoutService::begin`] creates a gateway
//! order and returns the [`CheckoutLaunch`] the gateway's payment sheet needs.
//! Once the customer has paid, [`CheckoutService::complete`] verifies the
//! gateway signature with the backend and records the order for the cart as
//! it was quoted, then removes the paid lines from the cart. Any failure
//! leaves the cart as it was.

use rand::Rng;
use rand::distr::Alphanumeric;
use serde::Serialize;
use tracing::{info, instrument, warn};

use kickforge_core::{Cart, OrderId, OrderSummary, PaymentStatus, ShippingAddress};

use crate::api::{NewOrder, PaymentCompletion};
use crate::error::{ClientError, Result, ValidationErrors, add_breadcrumb};
use crate::state::AppState;

/// Length of the random part of a receipt id.
const RECEIPT_SUFFIX_LEN: usize = 12;

/// Customer details pre-filled on the payment sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Prefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// Everything the gateway SDK needs to open its payment sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLaunch {
    /// Public gateway key id.
    pub key: String,
    /// Amount in minor units.
    pub amount: u64,
    pub currency: String,
    /// Gateway order id.
    pub order_id: String,
    /// Merchant name.
    pub name: String,
    pub description: String,
    pub prefill: Prefill,
    /// Our receipt id for the attempt.
    pub receipt: String,
    #[serde(skip)]
    pub summary: OrderSummary,
    /// Cart as quoted; this is what the payment covers.
    #[serde(skip)]
    pub cart: Cart,
}

/// A completed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub payment_id: String,
    pub status: PaymentStatus,
    pub summary: OrderSummary,
    pub item_count: u64,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    state: &'a AppState,
}

impl<'a> CheckoutService<'a> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Checkout figures for the current cart.
    pub async fn quote(&self) -> OrderSummary {
        self.state.order_summary().await
    }

    /// Validate the order and create a gateway order for its total.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an invalid address,
    /// `ClientError::EmptyCart`, `ClientError::CheckoutUnavailable` without a
    /// gateway key, or the backend error.
    #[instrument(skip(self, shipping))]
    pub async fn begin(&self, shipping: &ShippingAddress) -> Result<CheckoutLaunch> {
        shipping.validate().map_err(|fields| ValidationErrors {
            message: "Please check your shipping address.".to_owned(),
            fields,
        })?;

        let cart = self.state.cart().await;
        if cart.is_empty() {
            return Err(ClientError::EmptyCart);
        }

        let checkout = &self.state.config().checkout;
        let key = checkout
            .key_id
            .clone()
            .ok_or(ClientError::CheckoutUnavailable)?;

        let summary = self.state.pricing().summarize_cart(&cart);
        let amount = summary
            .total_minor_units()
            .ok_or_else(|| ClientError::Internal(format!("total out of range: {}", summary.total)))?;
        let currency = summary.currency.code();
        let receipt = new_receipt();

        let order = self
            .state
            .api()
            .create_payment_order(amount, currency, &receipt)
            .await?;
        if order.amount != amount {
            return Err(ClientError::PaymentFailed(format!(
                "gateway order is for {} but the cart totals {amount}",
                order.amount
            )));
        }

        let prefill = self
            .state
            .current_user()
            .await
            .map(|user| Prefill {
                name: user.name,
                email: user.email.to_string(),
                contact: user.phone.unwrap_or_else(|| shipping.phone.trim().to_owned()),
            })
            .unwrap_or_else(|| Prefill {
                name: shipping.full_name.trim().to_owned(),
                contact: shipping.phone.trim().to_owned(),
                ..Prefill::default()
            });

        let units = cart.item_count();
        add_breadcrumb(
            "checkout",
            "Started payment",
            Some(&[("order_id", order.id.as_str()), ("receipt", receipt.as_str())]),
        );
        info!(order_id = %order.id, amount, "payment order created");

        Ok(CheckoutLaunch {
            key,
            amount,
            currency: order.currency,
            order_id: order.id,
            name: checkout.store_name.clone(),
            description: format!(
                "{units} custom sneaker{}",
                if units == 1 { "" } else { "s" }
            ),
            prefill,
            receipt,
            summary,
            cart,
        })
    }

    /// Verify the payment and record the order for the cart quoted by
    /// [`Self::begin`].
    ///
    /// Lines added or changed after `begin` are not part of the order and
    /// stay in the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::PaymentFailed` if the completion does not match
    /// the launch or the signature is rejected. The cart is left untouched
    /// on any error.
    #[instrument(skip_all, fields(order_id = %launch.order_id))]
    pub async fn complete(
        &self,
        launch: &CheckoutLaunch,
        completion: &PaymentCompletion,
        shipping: &ShippingAddress,
    ) -> Result<OrderReceipt> {
        if completion.order_id != launch.order_id {
            return Err(ClientError::PaymentFailed(
                "payment belongs to a different order".to_owned(),
            ));
        }

        let api = self.state.api();
        if !api.verify_payment(completion).await? {
            return Err(ClientError::PaymentFailed(
                "payment could not be verified".to_owned(),
            ));
        }

        let placed = api
            .create_order(NewOrder {
                cart: &launch.cart,
                summary: &launch.summary,
                shipping,
                completion,
            })
            .await?;

        // The order is placed; a storage failure here is only logged.
        if let Err(e) = self.settle_cart(&launch.cart).await {
            warn!(error = %e, order_id = %placed.id, "failed to clear paid items from cart");
        }
        add_breadcrumb(
            "checkout",
            "Order placed",
            Some(&[("order_id", placed.id.as_str())]),
        );
        info!(order_id = %placed.id, "order placed");

        Ok(OrderReceipt {
            order_id: placed.id,
            payment_id: completion.payment_id.clone(),
            status: placed.status,
            summary: launch.summary,
            item_count: launch.cart.item_count(),
        })
    }

    /// Remove the paid quantities from the live cart.
    async fn settle_cart(&self, paid: &Cart) -> Result<()> {
        let current = self.state.cart().await;
        if current == *paid {
            return self.state.clear_cart().await;
        }
        for item in paid.items() {
            if let Some(line) = current.get(&item.design_id) {
                let left = i64::from(line.quantity) - i64::from(item.quantity);
                self.state.update_quantity(&item.design_id, left).await?;
            }
        }
        Ok(())
    }
}

fn new_receipt() -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RECEIPT_SUFFIX_LEN)
        .map(char::from)
        .collect();
    format!("rcpt_{suffix}")
}
