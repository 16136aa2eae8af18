//! Core types for Kickforge.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod color;
pub mod email;
pub mod id;
pub mod image;
pub mod price;
pub mod status;

pub use color::{ColorError, ColorMap, ColorValue, PartName};
pub use email::{Email, EmailError};
pub use id::*;
pub use image::{DesignImage, ImageError, ImagePayload};
pub use price::{CurrencyCode, Price, round_to_unit};
pub use status::*;
