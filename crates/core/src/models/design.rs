//! Saved sneaker designs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ColorMap, DesignId, DesignImage, DesignSource, UserId};

/// A saved customization: color assignments plus an optional preview.
///
/// Created by the design studio or the image generator, read by the profile
/// and "my designs" views, deleted one at a time by the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    /// Normalized design id.
    pub id: DesignId,
    /// Display name.
    pub name: String,
    /// Color assigned to each customized part.
    #[serde(default)]
    pub colors: ColorMap,
    /// Preview image, inline or remote.
    #[serde(default)]
    pub preview: Option<DesignImage>,
    /// When the design was created.
    pub created_at: DateTime<Utc>,
    /// Owning user, `None` for designs made while signed out.
    #[serde(default)]
    pub owner: Option<UserId>,
    /// Studio or generator.
    #[serde(default)]
    pub source: DesignSource,
    /// Prompt used for generated designs.
    #[serde(default)]
    pub prompt: Option<String>,
}

impl Design {
    /// Create a studio design with a fresh id, stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>, colors: ColorMap, owner: Option<UserId>) -> Self {
        Self {
            id: DesignId::generate(),
            name: name.into(),
            colors,
            preview: None,
            created_at: Utc::now(),
            owner,
            source: DesignSource::Studio,
            prompt: None,
        }
    }

    /// Create a design from a generated image.
    #[must_use]
    pub fn generated(prompt: &str, image: DesignImage, owner: Option<UserId>) -> Self {
        let mut design = Self::new(title_from_prompt(prompt), ColorMap::new(), owner);
        design.preview = Some(image);
        design.source = DesignSource::Generated;
        design.prompt = Some(prompt.trim().to_owned());
        design
    }

    /// Attach a preview image.
    #[must_use]
    pub fn with_preview(mut self, preview: DesignImage) -> Self {
        self.preview = Some(preview);
        self
    }

    /// Whether the design belongs to the given user.
    #[must_use]
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.owner.as_ref() == Some(user)
    }
}

/// Derive a short display name from a generation prompt.
fn title_from_prompt(prompt: &str) -> String {
    const MAX_WORDS: usize = 5;

    let words: Vec<&str> = prompt.split_whitespace().take(MAX_WORDS + 1).collect();
    if words.is_empty() {
        return "Generated design".to_owned();
    }
    let mut title = words
        .iter()
        .take(MAX_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > MAX_WORDS {
        title.push('…');
    }
    title
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ColorValue, PartName};

    #[test]
    fn test_new_assigns_id_and_timestamp() {
        let before = Utc::now();
        let a = Design::new("Night Runner", ColorMap::new(), None);
        let b = Design::new("Night Runner", ColorMap::new(), None);
        assert_ne!(a.id, b.id);
        assert!(a.created_at >= before);
        assert_eq!(a.source, DesignSource::Studio);
    }

    #[test]
    fn test_generated_design() {
        let image = DesignImage::Remote("https://cdn.kickforge.in/g.png".to_owned());
        let design = Design::generated(
            "  neon green high tops with lightning bolts on the side ",
            image.clone(),
            Some(UserId::new("u1")),
        );
        assert_eq!(design.name, "neon green high tops with…");
        assert_eq!(design.source, DesignSource::Generated);
        assert_eq!(design.preview, Some(image));
        assert!(design.is_owned_by(&UserId::new("u1")));
        assert!(!design.is_owned_by(&UserId::new("u2")));
    }

    #[test]
    fn test_title_from_short_prompt() {
        assert_eq!(title_from_prompt("red laces"), "red laces");
        assert_eq!(title_from_prompt("   "), "Generated design");
    }

    #[test]
    fn test_serde_roundtrip_keeps_colors() {
        let mut colors = ColorMap::new();
        colors.insert(
            PartName::parse("laces").unwrap(),
            ColorValue::parse("#ff0000").unwrap(),
        );
        let design = Design::new("Lace Up", colors, None);
        let json = serde_json::to_string(&design).unwrap();
        let back: Design = serde_json::from_str(&json).unwrap();
        assert_eq!(back, design);
    }
}
