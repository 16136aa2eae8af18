//! Session endpoints: login, registration, OTP verification and password reset.

use reqwest::Method;
use tracing::instrument;

use kickforge_core::{Email, User};

use super::conversions::convert_user;
use super::types::{
    EmailBody, LoginBody, MessageBody, OtpBody, RegisterBody, ResetPasswordBody, UserEnvelope,
};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Sign in with email and password. The session cookie lands in the jar.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &Email, password: &str) -> Result<User, ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "login"])?
            .json(&LoginBody {
                email: email.as_str(),
                password,
            });
        let envelope: UserEnvelope = self.send_json(request).await?;
        Ok(convert_user(envelope.user)?)
    }

    /// Create an account. The backend emails an OTP to confirm it.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the email is taken or the input is
    /// rejected.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<Option<String>, ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "register"])?
            .json(&RegisterBody {
                name,
                email: email.as_str(),
                password,
            });
        let body: MessageBody = self.send_json(request).await?;
        Ok(body.message)
    }

    /// Confirm an account with the emailed OTP. Signs the user in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a wrong or expired code.
    #[instrument(skip(self, otp), fields(email = %email))]
    pub async fn verify_otp(&self, email: &Email, otp: &str) -> Result<User, ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "verify-otp"])?
            .json(&OtpBody {
                email: email.as_str(),
                otp,
            });
        let envelope: UserEnvelope = self.send_json(request).await?;
        Ok(convert_user(envelope.user)?)
    }

    /// Ask the backend to email a fresh OTP.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::RateLimited` if asked again too soon.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn resend_otp(&self, email: &Email) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "resend-otp"])?
            .json(&EmailBody {
                email: email.as_str(),
            });
        self.send_unit(request).await
    }

    /// End the backend session and drop the local cookie.
    ///
    /// The cookie is dropped even if the backend call fails.
    ///
    /// # Errors
    ///
    /// Returns the backend error, after the cookie is gone.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = match self.request(Method::POST, &["api", "auth", "logout"]) {
            Ok(request) => self.send_unit(request).await,
            Err(e) => Err(e),
        };
        self.forget_session();
        result
    }

    /// The user behind the current session cookie.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the session is missing or expired.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        let request = self.request(Method::GET, &["api", "auth", "me"])?;
        let envelope: UserEnvelope = self.send_json(request).await?;
        Ok(convert_user(envelope.user)?)
    }

    /// Start a password reset. The backend emails an OTP.
    ///
    /// # Errors
    ///
    /// Returns error if the backend call fails.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn forgot_password(&self, email: &Email) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "forgot-password"])?
            .json(&EmailBody {
                email: email.as_str(),
            });
        self.send_unit(request).await
    }

    /// Finish a password reset with the emailed OTP.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for a wrong code or weak password.
    #[instrument(skip(self, otp, password), fields(email = %email))]
    pub async fn reset_password(
        &self,
        email: &Email,
        otp: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .request(Method::POST, &["api", "auth", "reset-password"])?
            .json(&ResetPasswordBody {
                email: email.as_str(),
                otp,
                password,
            });
        self.send_unit(request).await
    }
}
