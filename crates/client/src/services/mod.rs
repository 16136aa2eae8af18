//! Client operations built on the application state.
//!
//! # Services
//!
//! - `auth` - Login, registration, OTP verification, password reset
//! - `designs` - Two-phase design saves and deletes, listing, generation
//! - `checkout` - Quotes, payment gateway hand-off, order completion
//! - `profile` - Profile details and image upload
//! - `otp` - OTP expiry countdown and resend gating
//!
//! Services borrow the [`AppState`](crate::state::AppState) and are created
//! per operation:
//!
//! ```rust,ignore
//! let user = AuthService::new(&state).login("asha@kickforge.in", "hunter22!").await?;
//! let outcome = DesignService::new(&state).save(design).await;
//! ```

pub mod auth;
pub mod checkout;
pub mod designs;
pub mod otp;
pub mod profile;

pub use auth::AuthService;
pub use checkout::{CheckoutLaunch, CheckoutService, OrderReceipt, Prefill};
pub use designs::{DesignService, PhaseResult, SaveOutcome, WriteKind};
pub use otp::OtpTimer;
pub use profile::{ProfileService, prepare_image};
