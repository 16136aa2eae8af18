//! Shoe part names and the colors assigned to them.

use core::fmt;
use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when parsing a part name or color.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// The part name is empty.
    #[error("part name cannot be empty")]
    EmptyPart,
    /// The color is not a `#RGB` or `#RRGGBB` hex value.
    #[error("invalid color {0:?}: expected #RGB or #RRGGBB")]
    InvalidHex(String),
}

/// A named shoe part, e.g. `laces` or `sole`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PartName(String);

impl PartName {
    /// Parse a part name, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::EmptyPart`] for blank input.
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ColorError::EmptyPart);
        }
        Ok(Self(s.to_owned()))
    }

    /// The part name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PartName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A hex color, stored as lowercase `#rrggbb`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ColorValue(String);

impl ColorValue {
    /// Parse a `#RGB` or `#RRGGBB` color (the leading `#` is optional).
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::InvalidHex`] for anything else.
    pub fn parse(s: &str) -> Result<Self, ColorError> {
        let trimmed = s.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::InvalidHex(s.to_owned()));
        }

        let expanded = match hex.len() {
            3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => hex.to_owned(),
            _ => return Err(ColorError::InvalidHex(s.to_owned())),
        };

        Ok(Self(format!("#{}", expanded.to_ascii_lowercase())))
    }

    /// The normalized `#rrggbb` form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ColorValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Color assignment for every customized part of a design.
pub type ColorMap = BTreeMap<PartName, ColorValue>;

/// Parse a `part=#hex` assignment, as typed on the command line.
///
/// # Errors
///
/// Returns an error if either side fails to parse.
pub fn parse_assignment(s: &str) -> Result<(PartName, ColorValue), ColorError> {
    let (part, color) = s
        .split_once('=')
        .ok_or_else(|| ColorError::InvalidHex(s.to_owned()))?;
    Ok((PartName::parse(part)?, ColorValue::parse(color)?))
}
