//! Profile service.

use tracing::{debug, instrument};

use kickforge_core::{ImagePayload, User};

use crate::error::{ClientError, Result, ValidationErrors, add_breadcrumb};
use crate::state::AppState;

/// Profile service.
pub struct ProfileService<'a> {
    state: &'a AppState,
}

impl<'a> ProfileService<'a> {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Update name and phone. The updated user is persisted locally.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotSignedIn`, `ClientError::Validation`, or the
    /// backend error.
    #[instrument(skip(self))]
    pub async fn update(&self, name: &str, phone: Option<&str>) -> Result<User> {
        self.require_user().await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationErrors::field("name", "Name is required").into());
        }
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        if let Some(phone) = phone {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            if !(10..=15).contains(&digits) {
                return Err(ValidationErrors::field("phone", "Phone must be 10 to 15 digits").into());
            }
        }

        let user = self.state.api().update_profile(name, phone).await?;
        self.state.set_user(user).await
    }

    /// Upload a profile image and store its URL on the user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Image` for an unsupported image or one that
    /// cannot be compressed under the upload limit, `ClientError::NotSignedIn`,
    /// or the backend error.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_image(&self, bytes: Vec<u8>, mime: &str) -> Result<User> {
        let mut user = self.require_user().await?;
        let payload = prepare_image(bytes, mime, self.state.config().max_upload_bytes).await?;

        let url = self.state.api().upload_profile_image(&payload).await?;
        user.profile_image_url = Some(url);
        let user = self.state.set_user(user).await?;
        add_breadcrumb("profile", "Uploaded profile image", None);
        Ok(user)
    }

    async fn require_user(&self) -> Result<User> {
        self.state
            .current_user()
            .await
            .ok_or(ClientError::NotSignedIn)
    }
}

/// Validate an image for upload, compressing it off the async runtime when it
/// is over `max_bytes`.
///
/// # Errors
///
/// Returns `ClientError::Image` if the image is unsupported, undecodable, or
/// still too large after compression.
pub async fn prepare_image(bytes: Vec<u8>, mime: &str, max_bytes: usize) -> Result<ImagePayload> {
    let original = bytes.len();
    let mime = mime.to_owned();
    let payload = tokio::task::spawn_blocking(move || ImagePayload::compress(bytes, &mime, max_bytes))
        .await
        .map_err(|e| ClientError::Internal(format!("image task failed: {e}")))??;
    if payload.bytes().len() < original {
        debug!(original, compressed = payload.bytes().len(), "compressed image");
    }
    Ok(payload)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kickforge_core::{Email, ImageError, UserId};
    use url::Url;

    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::ClientStore;

    async fn signed_in(max_upload_bytes: usize) -> AppState {
        let mut config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9").unwrap());
        config.max_upload_bytes = max_upload_bytes;
        let state = AppState::with_store(config, ClientStore::in_memory()).unwrap();
        state
            .set_user(User {
                id: UserId::new("u1"),
                name: "Asha".to_owned(),
                email: Email::parse("asha@kickforge.in").unwrap(),
                profile_image_url: None,
                phone: None,
                verified: true,
            })
            .await
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let config = ClientConfig::for_api(Url::parse("http://127.0.0.1:9").unwrap());
        let state = AppState::with_store(config, ClientStore::in_memory()).unwrap();
        let err = ProfileService::new(&state)
            .update("Asha", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotSignedIn));
        assert!(err.requires_sign_in());
    }

    #[tokio::test]
    async fn test_validates_before_sending() {
        let state = signed_in(1024).await;
        let profile = ProfileService::new(&state);

        let err = profile.update("  ", None).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("name"));
        let err = profile.update("Asha", Some("123")).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("phone"));

        let err = profile
            .upload_image(vec![0; 2048], "image/png")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Image(ImageError::Decode(_))));
        let err = profile.upload_image(vec![1; 10], "image/gif").await.unwrap_err();
        assert!(matches!(err, ClientError::Image(ImageError::UnsupportedType(_))));
    }
}
