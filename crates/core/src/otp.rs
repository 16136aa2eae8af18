//! One-time-password expiry and resend countdown.
//!
//! The countdown is plain state advanced one second per [`OtpCountdown::tick`].
//! The client drives it from a timer; tests drive it by hand.

use serde::{Deserialize, Serialize};

/// Default OTP validity window, in seconds.
pub const DEFAULT_OTP_SECONDS: u32 = 600;

/// Remaining time before an OTP expires and a new one may be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpCountdown {
    budget: u32,
    remaining: u32,
}

impl Default for OtpCountdown {
    fn default() -> Self {
        Self::new(DEFAULT_OTP_SECONDS)
    }
}

impl OtpCountdown {
    /// Start a countdown with the given budget in seconds.
    #[must_use]
    pub const fn new(budget: u32) -> Self {
        Self {
            budget,
            remaining: budget,
        }
    }

    /// Advance by one second. Returns the remaining seconds.
    pub const fn tick(&mut self) -> u32 {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining
    }

    /// Seconds left.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// The budget the countdown started from.
    #[must_use]
    pub const fn budget(&self) -> u32 {
        self.budget
    }

    /// A new code may be requested only once the countdown has reached zero.
    #[must_use]
    pub const fn can_resend(&self) -> bool {
        self.remaining == 0
    }

    /// Restart from the full budget after a resend.
    pub const fn restart(&mut self) {
        self.remaining = self.budget;
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.remaining / 60, self.remaining % 60)
    }
}
