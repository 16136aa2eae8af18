//! Payment gateway orders, signature verification and order records.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use kickforge_core::{Cart, OrderId, OrderSummary, PaymentStatus, ShippingAddress};

use super::types::{
    OrderBody, OrderEnvelope, OrderItemBody, PaymentOrderBody, PaymentOrderResponse,
    ShippingAddressBody, VerifyPaymentBody, VerifyPaymentResponse,
};
use super::{ApiClient, ApiError};

/// A gateway order created by the backend for one checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentOrder {
    /// Gateway order id.
    pub id: String,
    /// Amount in minor units.
    pub amount: u64,
    /// ISO currency code.
    pub currency: String,
}

/// What the gateway hands back after a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompletion {
    #[serde(rename = "razorpay_order_id", alias = "order_id")]
    pub order_id: String,
    #[serde(rename = "razorpay_payment_id", alias = "payment_id")]
    pub payment_id: String,
    #[serde(rename = "razorpay_signature", alias = "signature")]
    pub signature: String,
}

/// Everything needed to record a paid order.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub cart: &'a Cart,
    pub summary: &'a OrderSummary,
    pub shipping: &'a ShippingAddress,
    pub completion: &'a PaymentCompletion,
}

/// An order as recorded by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub status: PaymentStatus,
}

impl ApiClient {
    /// Create a gateway order for `amount` minor units.
    ///
    /// # Errors
    ///
    /// Returns error if the backend refuses to create the order.
    #[instrument(skip(self))]
    pub async fn create_payment_order(
        &self,
        amount: u64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentOrder, ApiError> {
        let request = self
            .request(Method::POST, &["api", "payment", "create-order"])?
            .json(&PaymentOrderBody {
                amount,
                currency,
                receipt,
            });
        let order = match self.send_json(request).await? {
            PaymentOrderResponse::Wrapped { order } | PaymentOrderResponse::Bare(order) => order,
        };
        Ok(PaymentOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    /// Ask the backend to verify the gateway signature.
    ///
    /// Returns `false` when the backend answers but rejects the signature.
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails.
    #[instrument(skip(self, completion), fields(order_id = %completion.order_id))]
    pub async fn verify_payment(&self, completion: &PaymentCompletion) -> Result<bool, ApiError> {
        let request = self
            .request(Method::POST, &["api", "payment", "verify"])?
            .json(&VerifyPaymentBody {
                razorpay_order_id: &completion.order_id,
                razorpay_payment_id: &completion.payment_id,
                razorpay_signature: &completion.signature,
            });
        let response: VerifyPaymentResponse = self.send_json(request).await?;
        if !response.success {
            warn!(message = ?response.message, "payment signature rejected");
        }
        Ok(response.success)
    }

    /// Record a paid order.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the order or omits its id.
    #[instrument(skip(self, order), fields(items = order.cart.items().len()))]
    pub async fn create_order(&self, order: NewOrder<'_>) -> Result<PlacedOrder, ApiError> {
        let shipping = order.shipping;
        let body = OrderBody {
            items: order
                .cart
                .items()
                .iter()
                .map(|item| OrderItemBody {
                    design_id: item.design_id.as_str(),
                    name: &item.name,
                    price: item.unit_price,
                    quantity: item.quantity,
                    image: item.image.as_deref(),
                })
                .collect(),
            shipping_address: ShippingAddressBody {
                full_name: shipping.full_name.trim(),
                phone: shipping.phone.trim(),
                address_line1: shipping.address_line1.trim(),
                address_line2: shipping.address_line2.as_deref(),
                city: shipping.city.trim(),
                state: shipping.state.trim(),
                postal_code: shipping.postal_code.trim(),
                country: shipping.country.trim(),
            },
            subtotal: order.summary.subtotal,
            shipping: order.summary.shipping,
            tax: order.summary.tax,
            total: order.summary.total,
            currency: order.summary.currency.code(),
            payment_id: &order.completion.payment_id,
            gateway_order_id: &order.completion.order_id,
        };

        let request = self.request(Method::POST, &["api", "orders"])?.json(&body);
        let envelope: OrderEnvelope = self.send_json(request).await?;
        let id = OrderId::parse(&envelope.order.id)
            .ok_or_else(|| ApiError::Parse("order without id".to_owned()))?;
        Ok(PlacedOrder {
            id,
            status: envelope.order.status,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_uses_gateway_names() {
        let completion = PaymentCompletion {
            order_id: "order_1".to_owned(),
            payment_id: "pay_1".to_owned(),
            signature: "sig".to_owned(),
        };
        let json = serde_json::to_value(&completion).unwrap();
        assert_eq!(json["razorpay_order_id"], "order_1");
        assert_eq!(json["razorpay_signature"], "sig");

        let parsed: PaymentCompletion = serde_json::from_str(
            r#"{"order_id":"order_1","payment_id":"pay_1","signature":"sig"}"#,
        )
        .unwrap();
        assert_eq!(parsed, completion);
    }
}
