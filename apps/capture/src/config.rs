//! Command line and environment configuration for the capture console.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use lenscast_protocol::ImageFormat;

use crate::client::{ClientConfig, DEFAULT_GATEWAY_URL};
use crate::managers::capture_manager::SchedulerConfig;
use crate::video::{
    DirectorySource, EncodeOptions, FrameSource, SyntheticSource, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Generated test pattern
    Synthetic,
    /// JPEG/PNG files replayed from a directory
    Directory,
    /// Live camera (requires the `camera` feature)
    Camera,
}

fn parse_format(value: &str) -> Result<ImageFormat, String> {
    ImageFormat::from_name(value).ok_or_else(|| format!("unsupported image format '{value}' (expected jpeg or png)"))
}

#[derive(Parser, Debug, Clone)]
#[command(name = "lenscast-capture", about = "Periodically captures frames and sends them for analysis")]
pub struct CaptureArgs {
    /// Base URL of the HTTP gateway
    #[arg(long, env = "LENSCAST_GATEWAY_URL", default_value = DEFAULT_GATEWAY_URL)]
    pub gateway_url: String,

    /// Time between capture ticks, in milliseconds
    #[arg(long, env = "LENSCAST_CAPTURE_INTERVAL_MS", default_value_t = 2000,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Minimum time between the starts of two captures, in milliseconds
    #[arg(long, env = "LENSCAST_MIN_GAP_MS", default_value_t = 500)]
    pub min_gap_ms: u64,

    /// Per-request deadline, in milliseconds
    #[arg(long, env = "LENSCAST_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    pub request_timeout_ms: u64,

    /// Encoding of dispatched frames
    #[arg(long, env = "LENSCAST_FORMAT", default_value = "jpeg", value_parser = parse_format)]
    pub format: ImageFormat,

    /// JPEG quality, 1-100
    #[arg(long, env = "LENSCAST_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: u8,

    /// Keep the newest result when an older capture's reply arrives late
    #[arg(long, env = "LENSCAST_FENCE_STALE")]
    pub fence_stale: bool,

    #[arg(long, env = "LENSCAST_SOURCE", value_enum, default_value_t = SourceKind::Synthetic)]
    pub source: SourceKind,

    /// Directory of images for `--source directory`
    #[arg(long, env = "LENSCAST_SOURCE_DIR", required_if_eq("source", "directory"))]
    pub source_dir: Option<PathBuf>,

    /// Camera device index for `--source camera`
    #[arg(long, env = "LENSCAST_CAMERA_INDEX", default_value_t = 0)]
    pub camera_index: u32,

    /// Width of synthetic frames
    #[arg(long, default_value_t = DEFAULT_FRAME_WIDTH)]
    pub frame_width: u32,

    /// Height of synthetic frames
    #[arg(long, default_value_t = DEFAULT_FRAME_HEIGHT)]
    pub frame_height: u32,

    /// Wait for a `start` command instead of capturing right away
    #[arg(long, env = "LENSCAST_MANUAL_START")]
    pub manual_start: bool,
}

impl CaptureArgs {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            capture_interval: Duration::from_millis(self.interval_ms),
            min_gap: Duration::from_millis(self.min_gap_ms),
            encode: EncodeOptions {
                format: self.format,
                quality: self.quality,
            },
            fence_stale_results: self.fence_stale,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            gateway_url: self.gateway_url.clone(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }

    pub fn build_source(&self) -> anyhow::Result<Box<dyn FrameSource>> {
        match self.source {
            SourceKind::Synthetic => Ok(Box::new(SyntheticSource::new(self.frame_width, self.frame_height))),
            SourceKind::Directory => {
                let dir = self
                    .source_dir
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("--source-dir is required for the directory source"))?;
                Ok(Box::new(DirectorySource::new(dir)))
            }
            #[cfg(feature = "camera")]
            SourceKind::Camera => Ok(Box::new(crate::video::CameraSource::new(self.camera_index))),
            #[cfg(not(feature = "camera"))]
            SourceKind::Camera => anyhow::bail!("camera support not compiled in; rebuild with --features camera"),
        }
    }
}
