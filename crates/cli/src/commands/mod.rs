//! Command implementations.
//!
//! Each command takes the restored [`AppState`](kickforge_client::AppState),
//! calls one service and prints the result. Failures bubble up as
//! [`CommandError`] and are printed by `main`.

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod designs;
pub mod profile;

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

use kickforge_client::{ClientError, Toast, ToastLevel};
use kickforge_core::{CurrencyCode, Price};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A client operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// A local file could not be read.
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Input was not the expected JSON.
    #[error("invalid {what}: {source}")]
    Json {
        what: &'static str,
        source: serde_json::Error,
    },

    /// The command was used incorrectly.
    #[error("{0}")]
    Usage(String),

    /// The operation finished but did not succeed.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// Log the failure, capturing it to Sentry where appropriate.
    pub fn report(&self) {
        match self {
            Self::Client(e) => e.report(),
            other => tracing::warn!(error = %other, "command failed"),
        }
    }

    /// Whether the session has to be dropped.
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Client(e) if e.requires_sign_in())
    }

    /// What to print for the failure.
    pub fn message(&self) -> String {
        match self {
            Self::Client(e) => {
                let mut message = e.toast().message;
                if let Some(fields) = e.field_errors() {
                    for (field, detail) in fields {
                        message.push_str(&format!("\n  {field}: {detail}"));
                    }
                }
                message
            }
            other => other.to_string(),
        }
    }
}

/// Print a toast with a level marker.
pub fn print_toast(toast: &Toast) {
    let marker = match toast.level {
        ToastLevel::Success => "✓",
        ToastLevel::Info => "i",
        ToastLevel::Warning => "!",
        ToastLevel::Error => "✗",
    };
    println!("{marker} {}", toast.message);
}

/// Format an amount in the store currency.
pub fn money(amount: Decimal, currency: CurrencyCode) -> String {
    Price::new(amount, currency).to_string()
}

/// Read a whole file.
pub async fn read_file(path: &Path) -> Result<Vec<u8>, CommandError> {
    tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_owned(),
        source,
    })
}

/// Read one line from stdin, trimmed.
pub async fn read_line() -> Result<String, CommandError> {
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|source| CommandError::Io {
            path: PathBuf::from("<stdin>"),
            source,
        })?;
    Ok(line.trim().to_owned())
}
