//! Transient user notifications.
//!
//! Every failure is caught where it happens and shown as a toast that
//! dismisses itself; nothing is retried automatically.

use core::fmt;
use std::time::{Duration, Instant};

/// How long a toast stays visible unless overridden.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(4);

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastLevel {
    Success,
    Info,
    Warning,
    Error,
}

impl ToastLevel {
    const fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A short message shown to the user for a limited time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
    pub duration: Duration,
}

impl Toast {
    fn with_level(level: ToastLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            duration: DEFAULT_TOAST_DURATION,
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self::with_level(ToastLevel::Success, message)
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(ToastLevel::Info, message)
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(ToastLevel::Warning, message)
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(ToastLevel::Error, message)
    }

    /// Override how long the toast stays visible.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether a toast shown at `shown_at` has dismissed itself by `now`.
    #[must_use]
    pub fn is_dismissed(&self, shown_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(shown_at) >= self.duration
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.level.label(), self.message)
    }
}
