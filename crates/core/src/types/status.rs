//! Status enums for orders and designs.

use serde::{Deserialize, Serialize};

/// Payment state of a placed order, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

/// Where a design came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DesignSource {
    /// Colored by hand in the design studio.
    #[default]
    Studio,
    /// Produced by the AI image generator from a text prompt.
    Generated,
}
