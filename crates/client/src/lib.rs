//! Kickforge Client - everything a Kickforge front end needs below the UI.
//!
//! # Architecture
//!
//! - [`storage`] - SQLite-backed store with `user`, `designs` and `cache`
//!   partitions and change notifications
//! - [`api`] - REST backend client (session cookie auth, image generator)
//! - [`state`] - The application state container: config, store, API
//!   client, signed-in user and cart
//! - [`services`] - Auth, designs, checkout, profile and the OTP timer
//! - [`error`] - `ClientError`, its classification and toast messages
//!
//! # Example
//!
//! ```rust,ignore
//! let state = AppState::new(ClientConfig::from_env()?)?;
//! state.restore().await;
//!
//! AuthService::new(&state).login("asha@kickforge.in", "hunter22!").await?;
//! let designs = DesignService::new(&state).list().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod storage;
pub mod toast;

pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind, Result};
pub use state::AppState;
pub use storage::ClientStore;
pub use toast::{Toast, ToastLevel};
