//! Frame sources and request encoding.
//!
//! This module provides:
//! - A `FrameSource` abstraction producing still snapshots on demand
//! - Synthetic, image-directory and camera (via nokhwa) sources
//! - RGBA to RGB conversion and JPEG/PNG encoding into capture requests

#[cfg(feature = "camera")]
pub mod capture;
pub mod convert;
pub mod directory;
pub mod encode;
pub mod synthetic;

#[cfg(feature = "camera")]
pub use capture::CameraSource;
pub use directory::DirectorySource;
pub use encode::{encode, CaptureRequest, EncodeOptions, EncodingError};
pub use synthetic::SyntheticSource;

/// Default snapshot size for sources that let us choose one
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Memory layout of a raw frame buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    Rgb8,
    Rgba8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// One raw snapshot taken from a source.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
}

/// Why a source could not produce a frame.
///
/// Closed set of kinds; the console maps each one to a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameSourceError {
    #[error("Access to the frame source was denied")]
    PermissionDenied,

    #[error("Frame source not found: {0}")]
    NotFound(String),

    #[error("Frame source is already in use")]
    InUse,

    #[error("Frame source is not supported on this platform")]
    Unsupported,

    #[error("Frame source is not ready")]
    NotReady,

    #[error("Failed to capture frame: {0}")]
    Capture(String),
}

pub type SourceResult<T> = Result<T, FrameSourceError>;

/// Produces still images on demand from some live feed.
pub trait FrameSource: Send {
    /// Acquire the underlying device. Called when a session starts.
    fn open(&mut self) -> SourceResult<()> {
        Ok(())
    }

    /// Take one snapshot.
    fn capture(&mut self) -> SourceResult<Frame>;

    /// Release the underlying device. Called when a session stops.
    fn close(&mut self) {}

    fn name(&self) -> &str;
}
