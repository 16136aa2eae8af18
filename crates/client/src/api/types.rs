//! Wire types for the REST backend.
//!
//! These mirror the backend's JSON (Mongo-style `_id`, camelCase keys,
//! loosely typed ids and timestamps). Convert them with
//! [`super::conversions`] before use.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kickforge_core::PaymentStatus;

/// Error payload returned with non-success statuses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Field-level validation messages.
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Users
// =============================================================================

/// User as returned by the backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteUser {
    #[serde(alias = "_id")]
    pub id: Value,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default, alias = "profileImage", alias = "avatar")]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "isVerified")]
    pub verified: Option<bool>,
}

/// `{user}` envelope.
#[derive(Debug, Deserialize)]
pub struct UserEnvelope {
    pub user: RemoteUser,
}

#[derive(Debug, Serialize)]
pub struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct RegisterBody<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct EmailBody<'a> {
    pub email: &'a str,
}

#[derive(Debug, Serialize)]
pub struct OtpBody<'a> {
    pub email: &'a str,
    pub otp: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordBody<'a> {
    pub email: &'a str,
    pub otp: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdateBody<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
}

/// Response to a profile image upload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUrlBody {
    #[serde(alias = "url", alias = "profileImage")]
    pub image_url: String,
}

// =============================================================================
// Designs
// =============================================================================

/// Design as returned by the backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDesign {
    #[serde(default, rename = "_id")]
    pub object_id: Option<Value>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub colors: Option<BTreeMap<String, Value>>,
    #[serde(default, alias = "image", alias = "previewImage")]
    pub preview: Option<String>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default, alias = "user", alias = "owner")]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Design list, either wrapped or bare. Records stay raw so that one bad
/// record cannot fail the whole list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DesignList {
    Wrapped { designs: Vec<Value> },
    Bare(Vec<Value>),
}

impl DesignList {
    #[must_use]
    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Self::Wrapped { designs } | Self::Bare(designs) => designs,
        }
    }
}

/// `{design}` envelope.
#[derive(Debug, Deserialize)]
pub struct DesignEnvelope {
    pub design: Value,
}

/// Body for saving a design.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDesignBody<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub colors: BTreeMap<&'a str, &'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: String,
    pub source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'a str>,
}

// =============================================================================
// Orders & payments
// =============================================================================

#[derive(Debug, Serialize)]
pub struct PaymentOrderBody<'a> {
    /// Amount in minor units (paise).
    pub amount: u64,
    pub currency: &'a str,
    pub receipt: &'a str,
}

/// Gateway order created by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemotePaymentOrder {
    pub id: String,
    pub amount: u64,
    pub currency: String,
}

/// Payment order response, wrapped or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PaymentOrderResponse {
    Wrapped { order: RemotePaymentOrder },
    Bare(RemotePaymentOrder),
}

#[derive(Debug, Serialize)]
pub struct VerifyPaymentBody<'a> {
    pub razorpay_order_id: &'a str,
    pub razorpay_payment_id: &'a str,
    pub razorpay_signature: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemBody<'a> {
    pub design_id: &'a str,
    pub name: &'a str,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressBody<'a> {
    pub full_name: &'a str,
    pub phone: &'a str,
    pub address_line1: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<&'a str>,
    pub city: &'a str,
    pub state: &'a str,
    pub postal_code: &'a str,
    pub country: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBody<'a> {
    pub items: Vec<OrderItemBody<'a>>,
    pub shipping_address: ShippingAddressBody<'a>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub currency: &'a str,
    pub payment_id: &'a str,
    pub gateway_order_id: &'a str,
}

/// Order as returned by the backend.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteOrder {
    #[serde(alias = "_id")]
    pub id: Value,
    #[serde(default, alias = "paymentStatus")]
    pub status: PaymentStatus,
}

#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    pub order: RemoteOrder,
}

// =============================================================================
// Image generation
// =============================================================================

#[derive(Debug, Serialize)]
pub struct GenerateBody<'a> {
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(alias = "imageUrl", alias = "url", alias = "output")]
    pub image: String,
}
