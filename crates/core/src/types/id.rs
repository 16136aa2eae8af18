//! Newtype IDs for type-safe entity references.
//!
//! Records reach the client from two places: the REST backend (document ids
//! such as `"65f1c0..."`) and the local store (older records carry a numeric
//! millisecond timestamp). Every id is normalized to a trimmed string so that
//! both sources compare equal.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.

use chrono::{DateTime, Utc};

/// Prefix for ids derived from `name + createdAt` on records that had none.
const SYNTHETIC_PREFIX: &str = "legacy:";

/// Normalize a raw JSON id into its string form.
///
/// Strings are trimmed, integral numbers are printed without a fraction.
/// Returns `None` for empty strings, `null`, and any non-scalar value.
#[must_use]
pub fn normalize_raw_id(raw: &serde_json::Value) -> Option<String> {
    let normalized = match raw {
        serde_json::Value::String(s) => s.trim().to_owned(),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(|v| v.to_string())
            .or_else(|| n.as_u64().map(|v| v.to_string()))
            .unwrap_or_else(|| n.to_string()),
        _ => return None,
    };

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize` as a plain string
/// - `Deserialize` from either a JSON string or a JSON number
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `parse()`, `as_str()`
///
/// # Example
///
/// ```rust
/// # use kickforge_core::define_id;
/// define_id!(ShoeId);
/// define_id!(BoxId);
///
/// let shoe = ShoeId::new(" 42 ");
/// assert_eq!(shoe.as_str(), "42");
///
/// // These are different types, so this won't compile:
/// // let _: ShoeId = BoxId::new("42");
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::serde::Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from any string, trimming surrounding whitespace.
            #[must_use]
            pub fn new(id: impl AsRef<str>) -> Self {
                Self(id.as_ref().trim().to_owned())
            }

            /// Create an ID from a raw JSON value, if it holds a usable id.
            #[must_use]
            pub fn parse(raw: &::serde_json::Value) -> Option<Self> {
                $crate::types::id::normalize_raw_id(raw).map(Self)
            }

            /// Get the normalized string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self::new(id)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id.to_string())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::core::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let raw = <::serde_json::Value as ::serde::Deserialize>::deserialize(deserializer)?;
                Self::parse(&raw).ok_or_else(|| {
                    <D::Error as ::serde::de::Error>::custom(concat!(
                        "invalid ",
                        stringify!($name),
                        ": expected a non-empty string or number"
                    ))
                })
            }
        }
    };
}

define_id!(UserId);
define_id!(DesignId);
define_id!(OrderId);

impl DesignId {
    /// Generate a fresh client-side design id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Build the fallback identity for a design that arrived without an id.
    ///
    /// Two distinct designs sharing a name and creation instant collapse to
    /// the same synthetic id.
    #[must_use]
    pub fn synthetic(name: &str, created_at: DateTime<Utc>) -> Self {
        Self(format!(
            "{SYNTHETIC_PREFIX}{}:{}",
            name.trim(),
            created_at.timestamp_millis()
        ))
    }

    /// Whether this id was derived from `name + createdAt`.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with(SYNTHETIC_PREFIX)
    }
}
