//! `kf profile` commands.

use std::path::Path;

use kickforge_client::AppState;
use kickforge_client::services::ProfileService;

use super::CommandError;
use super::designs::load_image;

pub async fn update(state: &AppState, name: &str, phone: Option<&str>) -> Result<(), CommandError> {
    let user = ProfileService::new(state).update(name, phone).await?;
    println!("Profile updated: {}", user.name);
    Ok(())
}

pub async fn upload(state: &AppState, path: &Path) -> Result<(), CommandError> {
    let payload = load_image(state, path).await?;
    let user = ProfileService::new(state)
        .upload_image(payload.bytes().to_vec(), payload.mime())
        .await?;
    if let Some(url) = &user.profile_image_url {
        println!("Profile image: {url}");
    }
    Ok(())
}
