//! Shipping address captured at checkout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where an order ships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    /// Check every field, collecting one message per invalid field.
    ///
    /// # Errors
    ///
    /// Returns the field name to message map when anything is invalid.
    pub fn validate(&self) -> Result<(), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        let mut required = |field: &str, value: &str| {
            if value.trim().is_empty() {
                errors.insert(field.to_owned(), "is required".to_owned());
                false
            } else {
                true
            }
        };

        required("full_name", &self.full_name);
        required("address_line1", &self.address_line1);
        required("city", &self.city);
        required("state", &self.state);
        required("country", &self.country);
        let has_phone = required("phone", &self.phone);
        let has_postal = required("postal_code", &self.postal_code);

        if has_phone {
            let digits = self.phone.chars().filter(char::is_ascii_digit).count();
            let only_phone_chars = self
                .phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
            if !only_phone_chars || !(10..=15).contains(&digits) {
                errors.insert("phone".to_owned(), "must be 10 to 15 digits".to_owned());
            }
        }

        if has_postal {
            let postal = self.postal_code.trim();
            let indian = self.country.trim().eq_ignore_ascii_case("india")
                || self.country.trim().eq_ignore_ascii_case("in");
            let valid = if indian {
                postal.len() == 6 && postal.chars().all(|c| c.is_ascii_digit())
            } else {
                (3..=10).contains(&postal.len())
                    && postal.chars().all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
            };
            if !valid {
                errors.insert("postal_code".to_owned(), "is not a valid postal code".to_owned());
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Single-line rendering for receipts.
    #[must_use]
    pub fn one_line(&self) -> String {
        let mut parts = vec![self.address_line1.trim()];
        if let Some(line2) = self.address_line2.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            parts.push(line2);
        }
        parts.extend([
            self.city.trim(),
            self.state.trim(),
            self.postal_code.trim(),
            self.country.trim(),
        ]);
        parts.join(", ")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Asha Rao".to_owned(),
            phone: "+91 98765 43210".to_owned(),
            address_line1: "12 MG Road".to_owned(),
            address_line2: None,
            city: "Bengaluru".to_owned(),
            state: "Karnataka".to_owned(),
            postal_code: "560001".to_owned(),
            country: "India".to_owned(),
        }
    }

    #[test]
    fn test_valid_address() {
        assert!(address().validate().is_ok());
        assert_eq!(
            address().one_line(),
            "12 MG Road, Bengaluru, Karnataka, 560001, India"
        );
    }

    #[test]
    fn test_collects_every_field_error() {
        let errors = ShippingAddress::default().validate().unwrap_err();
        assert_eq!(errors.len(), 7);
        assert_eq!(errors.get("city").unwrap(), "is required");
    }

    #[test]
    fn test_phone_and_postal_code() {
        let mut a = address();
        a.phone = "12345".to_owned();
        a.postal_code = "5600".to_owned();
        let errors = a.validate().unwrap_err();
        assert!(errors.contains_key("phone"));
        assert!(errors.contains_key("postal_code"));

        a.phone = "9876543210".to_owned();
        a.country = "United Kingdom".to_owned();
        a.postal_code = "SW1A 1AA".to_owned();
        assert!(a.validate().is_ok());
    }
}
