//! Authentication service.
//!
//! Inputs are validated locally before anything is sent. A successful login
//! or OTP verification persists the user and the session cookie.

use tracing::{info, instrument, warn};

use kickforge_core::{Email, User};

use crate::api::ApiError;
use crate::error::{ClientError, Result, ValidationErrors, add_breadcrumb};
use crate::services::OtpTimer;
use crate::state::AppState;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Number of digits in an emailed code.
pub const OTP_LENGTH: usize = 6;

/// Authentication service.
pub struct AuthService<'a> {
    state: &'a AppState,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Email` or `ClientError::Validation` for bad
    /// input or rejected credentials, or the backend error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(ValidationErrors::field("password", "Password is required").into());
        }

        let user = match self.state.api().login(&email, password).await {
            Ok(user) => user,
            // Rejected credentials are bad input, not an expired session.
            Err(ApiError::Unauthorized(message)) => {
                return Err(ValidationErrors::message(message).into());
            }
            Err(e) => return Err(e.into()),
        };
        let user = self.state.set_user(user).await?;
        add_breadcrumb("auth", "Signed in", None);
        info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    /// Create an account. Returns the backend's confirmation message.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty name or weak password.
    #[instrument(skip(self, password))]
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationErrors::field("name", "Name is required").into());
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let message = self.state.api().register(name, &email, password).await?;
        Ok(message.unwrap_or_else(|| "Check your email for a verification code.".to_owned()))
    }

    /// Confirm an account with the emailed code and sign in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` unless the code is six digits.
    #[instrument(skip(self, otp))]
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<User> {
        let email = Email::parse(email)?;
        let otp = validate_otp(otp)?;

        let user = self.state.api().verify_otp(&email, otp).await?;
        let user = self.state.set_user(user).await?;
        add_breadcrumb("auth", "Verified email", None);
        Ok(user)
    }

    /// Ask for a fresh code.
    ///
    /// # Errors
    ///
    /// Returns the backend error.
    #[instrument(skip(self))]
    pub async fn resend_otp(&self, email: &str) -> Result<()> {
        let email = Email::parse(email)?;
        self.state.api().resend_otp(&email).await?;
        Ok(())
    }

    /// Ask for a fresh code once `timer` has run out, restarting it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` while the current code is still
    /// valid, or the backend error.
    pub async fn resend_code(&self, timer: &mut OtpTimer, email: &str) -> Result<()> {
        timer.resend(self.resend_otp(email)).await
    }

    /// Sign out. Local state is cleared even if the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns error only if local state cannot be cleared.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.state.api().logout().await {
            warn!(error = %e, "backend logout failed; clearing local session anyway");
        }
        self.state.sign_out().await?;
        add_breadcrumb("auth", "Signed out", None);
        Ok(())
    }

    /// Re-check the session with the backend.
    ///
    /// Returns the fresh user, or `None` after forcing a local sign-out when
    /// the backend no longer accepts the session.
    ///
    /// # Errors
    ///
    /// Returns any other backend or storage error.
    #[instrument(skip(self))]
    pub async fn refresh_session(&self) -> Result<Option<User>> {
        match self.state.api().current_user().await {
            Ok(user) => Ok(Some(self.state.set_user(user).await?)),
            Err(ApiError::Unauthorized(message)) => {
                info!(%message, "session expired; signing out");
                self.state.sign_out().await?;
                Ok(None)
            }
            Err(e) => Err(ClientError::Api(e)),
        }
    }

    /// Start a password reset.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Email` for a malformed address, or the backend
    /// error.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let email = Email::parse(email)?;
        self.state.api().forgot_password(&email).await?;
        Ok(())
    }

    /// Finish a password reset.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for a malformed code or weak
    /// password, or the backend error.
    #[instrument(skip(self, otp, password))]
    pub async fn reset_password(&self, email: &str, otp: &str, password: &str) -> Result<()> {
        let email = Email::parse(email)?;
        let otp = validate_otp(otp)?;
        validate_password(password)?;
        self.state.api().reset_password(&email, otp, password).await?;
        Ok(())
    }
}

/// Check password requirements.
///
/// # Errors
///
/// Returns `ValidationErrors` on the `password` field.
pub fn validate_password(password: &str) -> core::result::Result<(), ValidationErrors> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationErrors::field(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Check that a code is exactly six ASCII digits. Returns it trimmed.
///
/// # Errors
///
/// Returns `ValidationErrors` on the `otp` field.
pub fn validate_otp(otp: &str) -> core::result::Result<&str, ValidationErrors> {
    let otp = otp.trim();
    if otp.len() == OTP_LENGTH && otp.bytes().all(|b| b.is_ascii_digit()) {
        Ok(otp)
    } else {
        Err(ValidationErrors::field(
            "otp",
            format!("Enter the {OTP_LENGTH}-digit code from your email"),
        ))
    }
}
