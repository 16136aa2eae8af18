//! Email addresses as typed into the sign-up and sign-in forms.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Why an address was rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailError {
    #[error("email is required")]
    Empty,
    #[error("email is longer than {0} characters")]
    TooLong(usize),
    #[error("email {0}")]
    Malformed(&'static str),
}

/// A syntactically plausible email address.
///
/// This is the same check the sign-up form makes: one `@`, something on both
/// sides, a dot in the domain and no whitespace. Deliverability is the
/// backend's problem.
///
/// ```
/// use kickforge_core::Email;
///
/// assert!(Email::parse("maker@kickforge.in").is_ok());
/// assert!(Email::parse("maker@localhost").is_err());
/// assert!(Email::parse("a@b@c.in").is_err());
/// ```
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// RFC 5321 path limit.
    pub const MAX_LENGTH: usize = 254;

    /// Validate an address. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        match s.len() {
            0 => return Err(EmailError::Empty),
            n if n > Self::MAX_LENGTH => return Err(EmailError::TooLong(Self::MAX_LENGTH)),
            _ => {}
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Malformed("must not contain spaces"));
        }

        let mut halves = s.split('@');
        let (Some(local), Some(domain), None) = (halves.next(), halves.next(), halves.next())
        else {
            return Err(EmailError::Malformed("must contain a single @"));
        };
        if local.is_empty() {
            return Err(EmailError::Malformed("is missing the name before @"));
        }
        let dotted = domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));
        if !dotted {
            return Err(EmailError::Malformed("needs a domain like example.com"));
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }

    /// Everything after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }

    /// Lowercased form, used when comparing addresses typed by users.
    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Email {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
