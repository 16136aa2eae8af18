//! OTP expiry countdown driven by a Tokio interval.
//!
//! The timer publishes its [`OtpCountdown`] on a `watch` channel once per
//! second and stops at zero. Dropping the timer aborts the task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use kickforge_core::OtpCountdown;

use crate::error::{Result, ValidationErrors};

/// A running OTP countdown.
pub struct OtpTimer {
    state: Arc<watch::Sender<OtpCountdown>>,
    task: JoinHandle<()>,
}

impl OtpTimer {
    /// Start counting down from `budget_secs`.
    #[must_use]
    pub fn start(budget_secs: u32) -> Self {
        let (state, _) = watch::channel(OtpCountdown::new(budget_secs));
        let state = Arc::new(state);
        let task = spawn_ticker(Arc::clone(&state));
        Self { state, task }
    }

    /// Receive every countdown update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<OtpCountdown> {
        self.state.subscribe()
    }

    /// The countdown as of now.
    #[must_use]
    pub fn countdown(&self) -> OtpCountdown {
        *self.state.borrow()
    }

    /// Whether a new code may be requested.
    #[must_use]
    pub fn can_resend(&self) -> bool {
        self.state.borrow().can_resend()
    }

    /// Request a new code with `send` and restart the countdown.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` while the countdown is running, or
    /// the error from `send`, in which case the countdown stays at zero.
    pub async fn resend<F>(&mut self, send: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let countdown = self.countdown();
        if !countdown.can_resend() {
            return Err(ValidationErrors::field(
                "otp",
                format!("You can request a new code in {}", countdown.display()),
            )
            .into());
        }

        send.await?;

        self.task.abort();
        self.state.send_modify(OtpCountdown::restart);
        self.task = spawn_ticker(Arc::clone(&self.state));
        debug!("otp countdown restarted");
        Ok(())
    }
}

impl Drop for OtpTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for OtpTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpTimer")
            .field("countdown", &self.countdown())
            .finish_non_exhaustive()
    }
}

fn spawn_ticker(state: Arc<watch::Sender<OtpCountdown>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            interval.tick().await;
            let mut finished = false;
            state.send_modify(|countdown| {
                finished = countdown.tick() == 0;
            });
            if finished {
                break;
            }
        }
    })
}
