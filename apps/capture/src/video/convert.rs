//! Pixel layout conversion for encoding.
//!
//! JPEG carries no alpha channel, so RGBA snapshots are flattened to RGB
//! before they reach the encoder.

/// Convert an RGBA32 buffer to packed RGB24, dropping alpha.
pub fn rgba_to_rgb(rgba: &[u8], width: usize, height: usize) -> Vec<u8> {
    let pixels = width * height;
    let mut rgb = Vec::with_capacity(pixels * 3);

    for px in rgba.chunks_exact(4).take(pixels) {
        // Alpha at px[3] is ignored
        rgb.extend_from_slice(&px[..3]);
    }

    rgb
}

/// Whether any pixel of an RGBA32 buffer is not fully opaque.
pub fn has_transparency(rgba: &[u8]) -> bool {
    rgba.chunks_exact(4).any(|px| px[3] != u8::MAX)
}
