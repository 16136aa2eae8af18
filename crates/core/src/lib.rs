//! Kickforge Core - Shared domain library.
//!
//! This crate provides the types and pure logic used by every Kickforge
//! component:
//! - `client` - Storage, REST API client, state container and services
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and logic - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, emails, colors and images
//! - [`models`] - Users, designs and the cart
//! - [`pricing`] - Shipping, tax and totals
//! - [`reconcile`] - Merging remote and local design lists
//! - [`otp`] - OTP expiry/resend countdown

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod otp;
pub mod pricing;
pub mod reconcile;
pub mod types;

pub use models::{Cart, Design, LineItem, ShippingAddress, User};
pub use otp::OtpCountdown;
pub use pricing::{OrderSummary, PricingPolicy};
pub use reconcile::reconcile;
pub use types::*;
