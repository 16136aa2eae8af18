//! Profile endpoints.

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use tracing::instrument;

use kickforge_core::{ImagePayload, User};

use super::conversions::convert_user;
use super::types::{ImageUrlBody, ProfileUpdateBody, UserEnvelope};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Update name and phone. Returns the updated user.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the backend rejects the input.
    #[instrument(skip(self))]
    pub async fn update_profile(&self, name: &str, phone: Option<&str>) -> Result<User, ApiError> {
        let request = self
            .request(Method::PUT, &["api", "profile"])?
            .json(&ProfileUpdateBody { name, phone });
        let envelope: UserEnvelope = self.send_json(request).await?;
        Ok(convert_user(envelope.user)?)
    }

    /// Upload a profile image as multipart field `image`. Returns its URL.
    ///
    /// # Errors
    ///
    /// Returns error if the upload is rejected.
    #[instrument(skip(self, image), fields(mime = image.mime(), size = image.bytes().len()))]
    pub async fn upload_profile_image(&self, image: &ImagePayload) -> Result<String, ApiError> {
        let part = Part::bytes(image.bytes().to_vec())
            .file_name(format!("profile.{}", image.extension()))
            .mime_str(image.mime())
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        let request = self
            .request(Method::POST, &["api", "profile", "image"])?
            .multipart(Form::new().part("image", part));
        let body: ImageUrlBody = self.send_json(request).await?;
        Ok(body.image_url)
    }
}
