//! Unified error handling with Sentry integration.
//!
//! Every client operation returns [`Result<T>`]. Callers turn a failure into a
//! [`Toast`] with [`ClientError::toast`] and sign the user out when
//! [`ClientError::requires_sign_in`] says so. Nothing is retried automatically.

use std::collections::BTreeMap;

use thiserror::Error;

use kickforge_core::{ColorError, EmailError, ImageError};

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;
use crate::toast::Toast;

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    /// A validation failure with no field detail.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// A validation failure on one field.
    #[must_use]
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            fields: BTreeMap::from([(field.to_owned(), message.clone())]),
            message,
        }
    }
}

impl core::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)?;
        for (field, message) in &self.fields {
            write!(f, "; {field}: {message}")?;
        }
        Ok(())
    }
}

/// The user-facing classes of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The backend could not be reached.
    Network,
    /// The session is missing or expired.
    Authorization,
    /// The input was rejected.
    Validation,
    /// The local store failed.
    Storage,
    /// The payment did not go through.
    Payment,
    /// Anything else.
    Internal,
}

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("invalid color: {0}")]
    Color(#[from] ColorError),

    #[error("invalid image: {0}")]
    Image(#[from] ImageError),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,

    #[error("cart is empty")]
    EmptyCart,

    /// No payment gateway key is configured.
    #[error("checkout is not available")]
    CheckoutUnavailable,

    #[error("payment failed: {0}")]
    PaymentFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ValidationErrors> for ClientError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl ClientError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(api) => match api {
                ApiError::Network(_) => ErrorKind::Network,
                ApiError::Unauthorized(_) => ErrorKind::Authorization,
                ApiError::Validation { .. } | ApiError::NotFound(_) | ApiError::RateLimited(_) => {
                    ErrorKind::Validation
                }
                ApiError::Status { .. }
                | ApiError::Parse(_)
                | ApiError::Conversion(_)
                | ApiError::Url(_) => ErrorKind::Internal,
            },
            Self::NotSignedIn => ErrorKind::Authorization,
            Self::Email(_)
            | Self::Color(_)
            | Self::Image(_)
            | Self::Validation(_)
            | Self::EmptyCart => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
            Self::PaymentFailed(_) => ErrorKind::Payment,
            Self::Config(_) | Self::CheckoutUnavailable | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller should sign the user out and send them to login.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self.kind(), ErrorKind::Authorization)
    }

    /// Field-level messages, when the failure has them.
    #[must_use]
    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        let fields = match self {
            Self::Validation(errors) => Some(&errors.fields),
            Self::Api(ApiError::Validation { fields, .. }) => Some(fields),
            _ => None,
        };
        fields.filter(|fields| !fields.is_empty())
    }

    /// The message shown to the user. Internal details are not exposed.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(api) => match api {
                ApiError::Network(_) => {
                    "Could not reach Kickforge. Check your connection and try again.".to_owned()
                }
                ApiError::Unauthorized(_) => {
                    "Your session has expired. Please sign in again.".to_owned()
                }
                ApiError::Validation { message, .. } | ApiError::NotFound(message) => {
                    message.clone()
                }
                ApiError::RateLimited(secs) => {
                    format!("Too many attempts. Try again in {secs} seconds.")
                }
                _ => "Something went wrong. Please try again.".to_owned(),
            },
            Self::NotSignedIn => "Please sign in to continue.".to_owned(),
            Self::Email(e) => format!("Invalid email address: {e}"),
            Self::Color(e) => format!("Invalid color: {e}"),
            Self::Image(e) => format!("Invalid image: {e}"),
            Self::Validation(errors) => errors.message.clone(),
            Self::EmptyCart => "Your cart is empty.".to_owned(),
            Self::Storage(_) => "Could not save on this device.".to_owned(),
            Self::PaymentFailed(message) => format!("Payment failed: {message}"),
            Self::CheckoutUnavailable => "Checkout is not available right now.".to_owned(),
            Self::Config(_) | Self::Internal(_) => {
                "Something went wrong. Please try again.".to_owned()
            }
        }
    }

    /// The toast to show for this error.
    #[must_use]
    pub fn toast(&self) -> Toast {
        match self.kind() {
            ErrorKind::Validation => Toast::warning(self.user_message()),
            _ => Toast::error(self.user_message()),
        }
    }

    /// Log the error and capture it to Sentry when it is not the user's doing.
    pub fn report(&self) {
        match self.kind() {
            ErrorKind::Storage | ErrorKind::Internal | ErrorKind::Payment => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Client error"
                );
            }
            ErrorKind::Network | ErrorKind::Authorization | ErrorKind::Validation => {
                tracing::warn!(error = %self, "Client error");
            }
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Set the Sentry user context.
///
/// Call this after sign-in to associate errors with the user.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added design to cart", Some(&[("design_id", "65f1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::toast::ToastLevel;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            ClientError::Api(ApiError::Unauthorized("expired".to_owned())).kind(),
            ErrorKind::Authorization
        );
        assert_eq!(ClientError::NotSignedIn.kind(), ErrorKind::Authorization);
        assert_eq!(ClientError::EmptyCart.kind(), ErrorKind::Validation);
        assert_eq!(
            ClientError::Storage(StorageError::DataCorruption("x".to_owned())).kind(),
            ErrorKind::Storage
        );
        assert_eq!(
            ClientError::PaymentFailed("declined".to_owned()).kind(),
            ErrorKind::Payment
        );
        assert_eq!(
            ClientError::Api(ApiError::Status {
                status: 502,
                message: "bad gateway".to_owned()
            })
            .kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_authorization_requires_sign_in() {
        let err = ClientError::Api(ApiError::Unauthorized("jwt expired".to_owned()));
        assert!(err.requires_sign_in());
        assert!(err.toast().message.contains("session has expired"));
        assert!(!ClientError::EmptyCart.requires_sign_in());
    }

    #[test]
    fn test_toast_hides_internals() {
        let err = ClientError::Internal("pool poisoned at db.rs:42".to_owned());
        let toast = err.toast();
        assert_eq!(toast.level, ToastLevel::Error);
        assert!(!toast.message.contains("db.rs"));

        let err = ClientError::Storage(StorageError::DataCorruption("bad json".to_owned()));
        assert!(!err.toast().message.contains("bad json"));
    }

    #[test]
    fn test_validation_toast_and_fields() {
        let err = ClientError::Api(ApiError::Validation {
            message: "Email already registered".to_owned(),
            fields: BTreeMap::from([("email".to_owned(), "taken".to_owned())]),
        });
        let toast = err.toast();
        assert_eq!(toast.level, ToastLevel::Warning);
        assert_eq!(toast.message, "Email already registered");
        assert_eq!(err.field_errors().unwrap().get("email").unwrap(), "taken");

        let err = ClientError::from(ValidationErrors::message("Name is required"));
        assert!(err.field_errors().is_none());
    }

    #[test]
    fn test_validation_errors_display() {
        let errors = ValidationErrors::field("otp", "must be 6 digits");
        assert_eq!(errors.to_string(), "must be 6 digits; otp: must be 6 digits");
    }
}
