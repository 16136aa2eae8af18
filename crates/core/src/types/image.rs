//! Preview images and upload payloads.
//!
//! Design previews are either inline `data:` URIs (rendered by the studio or
//! returned by the image generator) or remote URLs (stored by the backend).
//! Uploads over the size cap are downscaled and re-encoded as JPEG.

use core::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when handling image data.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// The `data:` URI is malformed.
    #[error("malformed data URI")]
    MalformedDataUri,
    /// The payload is not valid base64.
    #[error("image payload is not valid base64")]
    InvalidBase64,
    /// The MIME type is not an accepted image type.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),
    /// The payload exceeds the upload limit.
    #[error("image is {size} bytes, limit is {max} bytes")]
    TooLarge {
        /// Size of the payload in bytes.
        size: usize,
        /// Maximum allowed size in bytes.
        max: usize,
    },
    /// The payload is empty.
    #[error("image is empty")]
    Empty,
    /// The payload could not be decoded or re-encoded.
    #[error("could not process image: {0}")]
    Decode(String),
}

/// Longest edge of a compressed upload, in pixels.
const MAX_DIMENSION: u32 = 2048;

/// Compression gives up below this edge length.
const MIN_DIMENSION: u32 = 64;

/// JPEG qualities tried at each size, best first.
const JPEG_QUALITIES: [u8; 3] = [85, 70, 55];

/// Image MIME types accepted for previews and uploads.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

fn check_mime(mime: &str) -> Result<(), ImageError> {
    if ACCEPTED_MIME_TYPES.contains(&mime) {
        Ok(())
    } else {
        Err(ImageError::UnsupportedType(mime.to_owned()))
    }
}

/// A design preview image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DesignImage {
    /// Inline base64 image data.
    DataUri {
        /// MIME type, e.g. `image/png`.
        mime: String,
        /// Base64 payload (standard alphabet).
        base64: String,
    },
    /// Image hosted by the backend or a CDN.
    Remote(String),
}

impl DesignImage {
    /// Parse a preview from its string form (`data:` URI or URL).
    ///
    /// # Errors
    ///
    /// Returns an error if a `data:` URI is malformed, not base64, or not an
    /// accepted image type.
    pub fn parse(s: &str) -> Result<Self, ImageError> {
        let s = s.trim();
        let Some(rest) = s.strip_prefix("data:") else {
            if s.is_empty() {
                return Err(ImageError::Empty);
            }
            return Ok(Self::Remote(s.to_owned()));
        };

        let (header, payload) = rest.split_once(',').ok_or(ImageError::MalformedDataUri)?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or(ImageError::MalformedDataUri)?;
        check_mime(mime)?;
        STANDARD
            .decode(payload)
            .map_err(|_| ImageError::InvalidBase64)?;

        Ok(Self::DataUri {
            mime: mime.to_owned(),
            base64: payload.to_owned(),
        })
    }

    /// Whether the image is stored inline.
    #[must_use]
    pub const fn is_inline(&self) -> bool {
        matches!(self, Self::DataUri { .. })
    }
}

impl fmt::Display for DesignImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataUri { mime, base64 } => write!(f, "data:{mime};base64,{base64}"),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

impl Serialize for DesignImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DesignImage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Raw image bytes validated for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime: String,
}

impl ImagePayload {
    /// Validate raw bytes against the accepted types and a size limit.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty, too large, or of an
    /// unsupported type.
    pub fn new(bytes: Vec<u8>, mime: &str, max_bytes: usize) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(ImageError::TooLarge {
                size: bytes.len(),
                max: max_bytes,
            });
        }
        check_mime(mime)?;
        Ok(Self {
            bytes,
            mime: mime.to_owned(),
        })
    }

    /// Like [`Self::new`], but payloads over `max_bytes` are decoded,
    /// downscaled and re-encoded as JPEG until they fit.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is empty, of an unsupported type,
    /// cannot be decoded, or is still too large at the smallest size.
    pub fn compress(bytes: Vec<u8>, mime: &str, max_bytes: usize) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        check_mime(mime)?;
        if bytes.len() <= max_bytes {
            return Self::new(bytes, mime, max_bytes);
        }

        let decoded =
            image::load_from_memory(&bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let mut img = if decoded.width().max(decoded.height()) > MAX_DIMENSION {
            decoded.resize(MAX_DIMENSION, MAX_DIMENSION, FilterType::Triangle)
        } else {
            decoded
        };

        let mut smallest = bytes.len();
        loop {
            for quality in JPEG_QUALITIES {
                let encoded = encode_jpeg(&img, quality)?;
                if encoded.len() <= max_bytes {
                    return Self::new(encoded, "image/jpeg", max_bytes);
                }
                smallest = smallest.min(encoded.len());
            }
            let (width, height) = (img.width() / 2, img.height() / 2);
            if width.max(height) < MIN_DIMENSION {
                return Err(ImageError::TooLarge {
                    size: smallest,
                    max: max_bytes,
                });
            }
            img = img.resize(width, height, FilterType::Triangle);
        }
    }

    /// Guess the MIME type from a file extension.
    #[must_use]
    pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// The validated bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The MIME type.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// File extension matching the MIME type.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            _ => "jpg",
        }
    }

    /// Encode as an inline preview.
    #[must_use]
    pub fn to_design_image(&self) -> DesignImage {
        DesignImage::DataUri {
            mime: self.mime.clone(),
            base64: STANDARD.encode(&self.bytes),
        }
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buf = Vec::new();
    img.to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))
        .map_err(|e| ImageError::Decode(e.to_string()))?;
    Ok(buf)
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data_uri() {
        let image = DesignImage::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert!(image.is_inline());
        assert_eq!(image.to_string(), "data:image/png;base64,iVBORw0KGgo=");
    }

    #[test]
    fn test_parse_remote() {
        let image = DesignImage::parse("https://cdn.kickforge.in/d/1.png").unwrap();
        assert_eq!(
            image,
            DesignImage::Remote("https://cdn.kickforge.in/d/1.png".to_owned())
        );
    }

    #[test]
    fn test_parse_rejects_bad_data_uri() {
        assert_eq!(
            DesignImage::parse("data:image/png,abc"),
            Err(ImageError::MalformedDataUri)
        );
        assert_eq!(
            DesignImage::parse("data:image/png;base64,@@@"),
            Err(ImageError::InvalidBase64)
        );
        assert!(matches!(
            DesignImage::parse("data:image/gif;base64,R0lGOD=="),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_payload_limits() {
        assert_eq!(
            ImagePayload::new(vec![], "image/png", 10).unwrap_err(),
            ImageError::Empty
        );
        assert_eq!(
            ImagePayload::new(vec![0; 11], "image/png", 10).unwrap_err(),
            ImageError::TooLarge { size: 11, max: 10 }
        );
        assert!(ImagePayload::new(vec![1], "text/plain", 10).is_err());

        let payload = ImagePayload::new(vec![1, 2, 3], "image/webp", 10).unwrap();
        assert_eq!(payload.extension(), "webp");
        assert_eq!(payload.to_design_image().to_string(), "data:image/webp;base64,AQID");
    }

    /// A noisy gradient PNG, which compresses badly.
    fn noisy_png(side: u32) -> Vec<u8> {
        let mut seed: u32 = 0x2545_f491;
        let img = image::RgbImage::from_fn(side, side, |x, y| {
            let mut channel = |base: u32| {
                seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (seed >> 24) % 17;
                u8::try_from((base + noise) % 256).unwrap()
            };
            image::Rgb([channel(x % 240), channel(y % 240), channel((x + y) % 240)])
        });
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_compress_shrinks_oversized_upload() {
        let png = noisy_png(1000);
        let max = 200_000;
        assert!(png.len() > max);

        let payload = ImagePayload::compress(png, "image/png", max).unwrap();
        assert!(payload.bytes().len() <= max);
        assert_eq!(payload.mime(), "image/jpeg");

        let decoded = image::load_from_memory(payload.bytes()).unwrap();
        assert!(decoded.width() <= 1000);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn test_compress_keeps_small_upload() {
        let png = noisy_png(16);
        let len = png.len();
        let payload = ImagePayload::compress(png, "image/png", 1_000_000).unwrap();
        assert_eq!(payload.mime(), "image/png");
        assert_eq!(payload.bytes().len(), len);
    }

    #[test]
    fn test_compress_rejects_undecodable_and_unsupported() {
        assert!(matches!(
            ImagePayload::compress(vec![7; 64], "image/png", 10),
            Err(ImageError::Decode(_))
        ));
        assert!(matches!(
            ImagePayload::compress(vec![7; 64], "image/gif", 10),
            Err(ImageError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(ImagePayload::mime_for_extension("JPG"), Some("image/jpeg"));
        assert_eq!(ImagePayload::mime_for_extension("gif"), None);
    }
}
