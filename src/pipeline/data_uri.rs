//! Decoding of `data:<mime>;base64,<payload>` image URIs.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::error::{RelayError, RelayResult};

/// Browsers occasionally drop trailing padding; accept either form.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A validated image payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Parse and decode a data URI, enforcing `1..=max_bytes` decoded bytes and
/// an `image/*` MIME type.
pub fn decode_image(uri: &str, max_bytes: usize) -> RelayResult<DecodedImage> {
    let rest = uri
        .trim()
        .strip_prefix("data:")
        .ok_or_else(|| invalid("image must be a data URI"))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| invalid("image must be a base64 data URI"))?;

    let declared = mime.trim().to_ascii_lowercase();
    if declared.is_empty() || declared.contains(';') || declared.contains(',') {
        return Err(invalid("image data URI has no usable MIME type"));
    }
    if !declared.starts_with("image/") {
        return Err(invalid(format!("'{}' is not an image type", declared)));
    }

    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if payload.is_empty() {
        return Err(invalid("image is empty"));
    }
    // Reject before allocating the decoded buffer.
    if payload.len() / 4 * 3 > max_bytes + 3 {
        return Err(too_large(max_bytes));
    }

    let bytes = LENIENT_BASE64
        .decode(payload.as_bytes())
        .map_err(|e| invalid(format!("image is not valid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(invalid("image is empty"));
    }
    if bytes.len() > max_bytes {
        return Err(too_large(max_bytes));
    }

    let mime_type = match sniff_image_type(&bytes) {
        Some(sniffed) if sniffed != normalize(&declared) => {
            tracing::debug!(declared = %declared, sniffed = %sniffed, "Declared image type differs from content");
            sniffed.to_string()
        }
        _ => normalize(&declared).to_string(),
    };

    Ok(DecodedImage { mime_type, bytes })
}

fn normalize(mime: &str) -> &str {
    match mime {
        "image/jpg" | "image/pjpeg" => "image/jpeg",
        other => other,
    }
}

/// Identify common raster formats from their magic bytes.
pub fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Reduce a caller-supplied filename to its final path component.
pub fn clean_filename(raw: &str) -> RelayResult<String> {
    let name = raw
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(invalid("filename is required"));
    }
    Ok(name.to_string())
}

fn invalid(msg: impl Into<String>) -> RelayError {
    RelayError::InvalidInput(msg.into())
}

fn too_large(max_bytes: usize) -> RelayError {
    invalid(format!("image exceeds the {} byte limit", max_bytes))
}
