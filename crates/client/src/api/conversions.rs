//! Normalization of backend payloads into core domain types.
//!
//! The backend and the local store describe the same records differently:
//! ids may be document ids or numeric timestamps, timestamps may be RFC 3339
//! strings or epoch milliseconds, and owners may be bare ids or populated
//! user objects. Everything is mapped into [`Design`] and [`User`] here.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use kickforge_core::types::{ColorMap, ColorValue, DesignImage, DesignSource, PartName};
use kickforge_core::{Design, DesignId, Email, User, UserId};

use super::types::{NewDesignBody, RemoteDesign, RemoteUser};

/// A backend record that cannot be normalized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    /// A field is present but malformed.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl ToString) -> ConversionError {
    ConversionError::InvalidField {
        field,
        reason: reason.to_string(),
    }
}

/// Convert a backend user.
///
/// # Errors
///
/// Returns an error if the id is missing or the email is invalid.
pub fn convert_user(remote: RemoteUser) -> Result<User, ConversionError> {
    let id = UserId::parse(&remote.id).ok_or(ConversionError::MissingField("id"))?;
    let email = Email::parse(&remote.email).map_err(|e| invalid("email", e))?;
    let name = remote
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| email.local_part().to_owned());

    Ok(User {
        id,
        name,
        email,
        profile_image_url: remote.profile_image_url.filter(|u| !u.trim().is_empty()),
        phone: remote.phone.filter(|p| !p.trim().is_empty()),
        verified: remote.verified.unwrap_or(false),
    })
}

/// Parse a timestamp given as RFC 3339 text or epoch milliseconds.
///
/// # Errors
///
/// Returns an error for any other shape.
pub fn parse_timestamp(raw: &Value) -> Result<DateTime<Utc>, ConversionError> {
    match raw {
        Value::String(s) => {
            if let Ok(at) = DateTime::parse_from_rfc3339(s.trim()) {
                return Ok(at.with_timezone(&Utc));
            }
            s.trim()
                .parse::<i64>()
                .ok()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .ok_or_else(|| invalid("createdAt", format!("unrecognized timestamp {s:?}")))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
            .ok_or_else(|| invalid("createdAt", format!("out of range: {n}"))),
        other => Err(invalid("createdAt", format!("unexpected value {other}"))),
    }
}

/// Extract an owner id from a bare id or a populated user object.
fn owner_id(raw: &Value) -> Option<UserId> {
    match raw {
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(UserId::parse),
        other => UserId::parse(other),
    }
}

/// Convert a backend design.
///
/// Records without an id get the synthetic `name + createdAt` identity.
///
/// # Errors
///
/// Returns an error if the name or creation time is missing, or if a color
/// or preview is malformed.
pub fn convert_design(remote: RemoteDesign) -> Result<Design, ConversionError> {
    let name = remote
        .name
        .map(|n| n.trim().to_owned())
        .filter(|n| !n.is_empty())
        .ok_or(ConversionError::MissingField("name"))?;
    let created_at = parse_timestamp(
        remote
            .created_at
            .as_ref()
            .ok_or(ConversionError::MissingField("createdAt"))?,
    )?;

    let id = remote
        .object_id
        .as_ref()
        .and_then(DesignId::parse)
        .or_else(|| remote.id.as_ref().and_then(DesignId::parse))
        .unwrap_or_else(|| DesignId::synthetic(&name, created_at));

    let colors = remote
        .colors
        .iter()
        .flatten()
        .map(|(part, color)| {
            let color = color
                .as_str()
                .ok_or_else(|| invalid("colors", format!("{part} is not a color string")))?;
            Ok((
                PartName::parse(part).map_err(|e| invalid("colors", e))?,
                ColorValue::parse(color).map_err(|e| invalid("colors", e))?,
            ))
        })
        .collect::<Result<ColorMap, ConversionError>>()?;

    let preview = remote
        .preview
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .map(DesignImage::parse)
        .transpose()
        .map_err(|e| invalid("image", e))?;

    let source = match remote.source.as_deref() {
        Some("generated" | "ai") => DesignSource::Generated,
        _ if remote.prompt.is_some() => DesignSource::Generated,
        _ => DesignSource::Studio,
    };

    Ok(Design {
        id,
        name,
        colors,
        preview,
        created_at,
        owner: remote.user_id.as_ref().and_then(owner_id),
        source,
        prompt: remote.prompt,
    })
}

/// Decode and convert one raw design record.
///
/// # Errors
///
/// Returns an error if the record does not have the shape of a design or
/// fails [`convert_design`].
pub fn design_from_value(raw: Value) -> Result<Design, ConversionError> {
    let remote: RemoteDesign = serde_json::from_value(raw).map_err(|e| invalid("design", e))?;
    convert_design(remote)
}

/// Build the backend body for saving a design.
#[must_use]
pub fn design_body(design: &Design) -> NewDesignBody<'_> {
    NewDesignBody {
        id: design.id.as_str(),
        name: &design.name,
        colors: design
            .colors
            .iter()
            .map(|(part, color)| (part.as_str(), color.as_str()))
            .collect(),
        image: design.preview.as_ref().map(ToString::to_string),
        created_at: design.created_at.to_rfc3339(),
        source: match design.source {
            DesignSource::Studio => "studio",
            DesignSource::Generated => "generated",
        },
        prompt: design.prompt.as_deref(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn remote(value: Value) -> RemoteDesign {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_convert_backend_design() {
        let design = convert_design(remote(json!({
            "_id": "65f1c0ffee",
            "name": "Sunset Court",
            "colors": {"laces": "#FFF", "sole": "#222222"},
            "image": "https://cdn.kickforge.in/d/65f1.png",
            "createdAt": "2024-03-13T09:30:00.000Z",
            "userId": {"_id": "u1", "name": "Asha"}
        })))
        .unwrap();

        assert_eq!(design.id.as_str(), "65f1c0ffee");
        assert_eq!(design.colors.len(), 2);
        assert_eq!(design.owner, Some(UserId::new("u1")));
        assert_eq!(design.source, DesignSource::Studio);
        assert_eq!(design.created_at.timestamp_millis(), 1_710_322_200_000);
    }

    #[test]
    fn test_document_id_wins_over_client_id() {
        let design = design_from_value(json!({
            "_id": "65f1c0ffee",
            "id": 1_712_345_678_901_i64,
            "name": "Both Ids",
            "colors": null,
            "createdAt": "2024-03-13T09:30:00Z"
        }))
        .unwrap();
        assert_eq!(design.id.as_str(), "65f1c0ffee");
        assert!(design.colors.is_empty());
    }

    #[test]
    fn test_non_string_color_rejects_record() {
        let err = design_from_value(json!({
            "_id": "65f1",
            "name": "Bad Sole",
            "colors": {"sole": 5},
            "createdAt": "2024-03-13T09:30:00Z"
        }))
        .unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField { field: "colors", .. }));

        let err = design_from_value(json!({"name": 7, "createdAt": 0})).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidField { field: "design", .. }));
    }

    #[test]
    fn test_numeric_id_and_millis_timestamp() {
        let design = convert_design(remote(json!({
            "id": 1_712_345_678_901_i64,
            "name": "Local",
            "createdAt": 1_712_345_678_901_i64,
            "prompt": "chrome high tops"
        })))
        .unwrap();
        assert_eq!(design.id.as_str(), "1712345678901");
        assert_eq!(design.created_at.timestamp_millis(), 1_712_345_678_901);
        assert_eq!(design.source, DesignSource::Generated);
    }

    #[test]
    fn test_missing_id_gets_synthetic_identity() {
        let design = convert_design(remote(json!({
            "name": "No Id",
            "createdAt": "1700000000000"
        })))
        .unwrap();
        assert!(design.id.is_synthetic());
        assert_eq!(design.id.as_str(), "legacy:No Id:1700000000000");
    }

    #[test]
    fn test_rejects_bad_records() {
        assert_eq!(
            convert_design(remote(json!({"createdAt": 1}))),
            Err(ConversionError::MissingField("name"))
        );
        assert_eq!(
            convert_design(remote(json!({"name": "x"}))),
            Err(ConversionError::MissingField("createdAt"))
        );
        assert!(matches!(
            convert_design(remote(json!({"name": "x", "createdAt": 1, "colors": {"sole": "blue"}}))),
            Err(ConversionError::InvalidField { field: "colors", .. })
        ));
        assert!(matches!(
            convert_design(remote(json!({"name": "x", "createdAt": true}))),
            Err(ConversionError::InvalidField { field: "createdAt", .. })
        ));
    }

    #[test]
    fn test_convert_user() {
        let user = convert_user(
            serde_json::from_value(json!({
                "_id": "u1",
                "email": "asha@kickforge.in",
                "profileImage": "",
                "isVerified": true
            }))
            .unwrap(),
        )
        .unwrap();
        assert_eq!(user.name, "asha");
        assert!(user.profile_image_url.is_none());
        assert!(user.verified);
    }

    #[test]
    fn test_design_body() {
        let mut colors = ColorMap::new();
        colors.insert(
            PartName::parse("laces").unwrap(),
            ColorValue::parse("#abc").unwrap(),
        );
        let design = Design::new("Body", colors, None);
        let body = serde_json::to_value(design_body(&design)).unwrap();
        assert_eq!(body["colors"]["laces"], "#aabbcc");
        assert_eq!(body["source"], "studio");
        assert!(body.get("image").is_none());
        assert_eq!(body["id"], design.id.as_str());
    }
}
