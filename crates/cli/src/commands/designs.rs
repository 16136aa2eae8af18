//! `kf design` commands.

use std::path::Path;

use kickforge_client::services::{DesignService, SaveOutcome, prepare_image};
use kickforge_client::{AppState, ClientError, ToastLevel};
use kickforge_core::types::color::parse_assignment;
use kickforge_core::{ColorMap, Design, DesignId, DesignSource, ImageError, ImagePayload};

use super::{CommandError, print_toast, read_file};

pub async fn list(state: &AppState) -> Result<(), CommandError> {
    let designs = DesignService::new(state).list().await?;
    if designs.is_empty() {
        println!("No designs yet. Create one with: kf design create -n <name> -c part=#hex");
        return Ok(());
    }

    for design in &designs {
        let origin = match design.source {
            DesignSource::Studio => "studio",
            DesignSource::Generated => "generated",
        };
        println!(
            "{}  {}  {}  {} part(s), {origin}{}",
            design.id,
            design.created_at.format("%Y-%m-%d %H:%M"),
            design.name,
            design.colors.len(),
            if design.preview.is_some() { ", preview" } else { "" },
        );
    }
    Ok(())
}

pub async fn create(
    state: &AppState,
    name: &str,
    colors: &[String],
    preview: Option<&Path>,
) -> Result<(), CommandError> {
    let colors = colors
        .iter()
        .map(|assignment| parse_assignment(assignment))
        .collect::<Result<ColorMap, _>>()
        .map_err(ClientError::from)?;

    let mut design = Design::new(name.trim(), colors, None);
    if let Some(path) = preview {
        let payload = load_image(state, path).await?;
        design = design.with_preview(payload.to_design_image());
    }

    let (design, outcome) = DesignService::new(state).save(design).await;
    finish(&outcome)?;
    println!("{}", design.id);
    Ok(())
}

pub async fn delete(state: &AppState, id: &str) -> Result<(), CommandError> {
    let outcome = DesignService::new(state).delete(&DesignId::new(id)).await;
    finish(&outcome)
}

pub async fn generate(state: &AppState, prompt: &str) -> Result<(), CommandError> {
    println!("Generating…");
    let (design, outcome) = DesignService::new(state).generate(prompt).await?;
    finish(&outcome)?;
    println!("{}  {}", design.id, design.name);
    Ok(())
}

/// Print the outcome; fail only when nothing was written.
fn finish(outcome: &SaveOutcome) -> Result<(), CommandError> {
    let toast = outcome.toast();
    if toast.level == ToastLevel::Error {
        return Err(CommandError::Failed(toast.message));
    }
    print_toast(&toast);
    Ok(())
}

/// Read an image file, inferring its type from the extension, and compress it
/// if it is over the upload limit.
pub async fn load_image(state: &AppState, path: &Path) -> Result<ImagePayload, CommandError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    let mime = ImagePayload::mime_for_extension(extension)
        .ok_or_else(|| ClientError::from(ImageError::UnsupportedType(extension.to_owned())))?;
    let bytes = read_file(path).await?;
    let payload = prepare_image(bytes, mime, state.config().max_upload_bytes).await?;
    Ok(payload)
}
