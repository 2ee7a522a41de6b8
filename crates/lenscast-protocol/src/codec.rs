use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD as BASE64_STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use tracing::debug;

/// Largest JSON body the gateway accepts. A base64 payload is ~4/3 of the
/// encoded image, so this leaves room for roughly 7.5 MiB of image bytes.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Format assumed when a request does not declare one.
pub const DEFAULT_IMAGE_FORMAT: &str = "jpeg";

/// Standard alphabet, padding optional, stray low bits tolerated.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("payload is empty")]
    Empty,

    #[error("invalid base64: {0}")]
    InvalidBase64(String),
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Encode raw image bytes for the `image_data` JSON field.
pub fn encode_payload(bytes: &[u8]) -> String {
    BASE64_STANDARD.encode(bytes)
}

/// Decode an `image_data` field back into raw image bytes.
///
/// Accepts a full `data:<mime>;base64,<payload>` URL as produced by a
/// browser canvas as well as the bare payload. Whitespace and line breaks
/// are ignored, padding is optional and the URL-safe `-`/`_` characters
/// are read as `+`/`/`.
pub fn decode_payload(data: &str) -> CodecResult<Vec<u8>> {
    let payload: String = strip_data_url(data)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();
    let payload = payload.trim_end_matches('=');
    if payload.is_empty() {
        return Err(CodecError::Empty);
    }

    LENIENT
        .decode(payload)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// Return the payload part of a data URL, or the input unchanged.
pub fn strip_data_url(data: &str) -> &str {
    if !data.starts_with("data:") {
        return data;
    }

    match data.find(',') {
        Some(comma) => {
            debug!("Stripped data URL header ({} bytes)", comma + 1);
            &data[comma + 1..]
        }
        None => data,
    }
}

/// The declared format as sent, or [`DEFAULT_IMAGE_FORMAT`] when absent or empty.
pub fn declared_format(format: Option<&str>) -> String {
    match format {
        Some(f) if !f.is_empty() => f.to_string(),
        _ => DEFAULT_IMAGE_FORMAT.to_string(),
    }
}
