//! User domain type.

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// The signed-in customer.
///
/// The client keeps exactly one of these: it is overwritten wholesale on
/// update and removed on logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: Email,
    /// Profile image URL, once uploaded.
    #[serde(default)]
    pub profile_image_url: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
    /// Whether the email was verified by OTP.
    #[serde(default)]
    pub verified: bool,
}

impl User {
    /// First name for greetings, falling back to the email local part.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name
            .split_whitespace()
            .next()
            .unwrap_or_else(|| self.email.as_str().split('@').next().unwrap_or_default())
    }
}
