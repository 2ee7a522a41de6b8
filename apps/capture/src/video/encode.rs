//! Raw frame to backend request encoding.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use lenscast_protocol::ImageFormat;

use super::convert::{has_transparency, rgba_to_rgb};
use super::PixelLayout;

/// Quality used when none is configured; matches a browser canvas export at 0.9.
pub const DEFAULT_QUALITY: u8 = 90;

/// Encoded snapshot ready for dispatch. Consumed by the analysis client.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub image_bytes: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Per-call encoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub format: ImageFormat,
    /// 1-100, only meaningful for JPEG. Lower values shrink the payload.
    pub quality: u8,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Frame buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("Image codec error: {0}")]
    Codec(#[from] image::ImageError),
}

/// Rasterize a raw frame into a compressed request payload.
///
/// Pure and deterministic: the same pixels and options always produce the
/// same bytes.
pub fn encode(
    pixels: &[u8],
    layout: PixelLayout,
    width: u32,
    height: u32,
    options: EncodeOptions,
) -> Result<CaptureRequest, EncodingError> {
    if width == 0 || height == 0 {
        return Err(EncodingError::InvalidDimensions { width, height });
    }

    let expected = width as usize * height as usize * layout.bytes_per_pixel();
    if pixels.len() != expected {
        return Err(EncodingError::BufferSize {
            expected,
            actual: pixels.len(),
        });
    }

    let mut image_bytes = Vec::new();
    match options.format {
        ImageFormat::Jpeg => {
            let quality = options.quality.clamp(1, 100);
            let encoder = JpegEncoder::new_with_quality(&mut image_bytes, quality);
            match layout {
                PixelLayout::Rgb8 => encoder.write_image(pixels, width, height, ExtendedColorType::Rgb8)?,
                PixelLayout::Rgba8 => {
                    let rgb = rgba_to_rgb(pixels, width as usize, height as usize);
                    encoder.write_image(&rgb, width, height, ExtendedColorType::Rgb8)?
                }
            }
        }
        ImageFormat::Png => {
            let encoder = PngEncoder::new(&mut image_bytes);
            match layout {
                PixelLayout::Rgba8 if has_transparency(pixels) => {
                    encoder.write_image(pixels, width, height, ExtendedColorType::Rgba8)?
                }
                PixelLayout::Rgba8 => {
                    let rgb = rgba_to_rgb(pixels, width as usize, height as usize);
                    encoder.write_image(&rgb, width, height, ExtendedColorType::Rgb8)?
                }
                PixelLayout::Rgb8 => encoder.write_image(pixels, width, height, ExtendedColorType::Rgb8)?,
            }
        }
    }

    Ok(CaptureRequest {
        image_bytes,
        format: options.format,
        width,
        height,
    })
}
