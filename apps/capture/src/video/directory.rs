//! Replays still images from a directory as if they were camera frames.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{Frame, FrameSource, FrameSourceError, PixelLayout, SourceResult};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Cycles through the JPEG/PNG files of a directory in name order.
pub struct DirectorySource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    next: usize,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            next: 0,
        }
    }

    fn scan(dir: &Path) -> SourceResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FrameSourceError::NotFound(dir.display().to_string()),
            std::io::ErrorKind::PermissionDenied => FrameSourceError::PermissionDenied,
            _ => FrameSourceError::Capture(format!("{}: {e}", dir.display())),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

impl FrameSource for DirectorySource {
    fn open(&mut self) -> SourceResult<()> {
        let files = Self::scan(&self.dir)?;
        if files.is_empty() {
            return Err(FrameSourceError::NotFound(format!(
                "no images in {}",
                self.dir.display()
            )));
        }

        info!("Replaying {} images from {}", files.len(), self.dir.display());
        self.files = files;
        self.next = 0;
        Ok(())
    }

    fn capture(&mut self) -> SourceResult<Frame> {
        if self.files.is_empty() {
            return Err(FrameSourceError::NotReady);
        }

        let path = &self.files[self.next % self.files.len()];
        self.next = (self.next + 1) % self.files.len();
        debug!("Loading frame from {}", path.display());

        let img = image::open(path)
            .map_err(|e| FrameSourceError::Capture(format!("{}: {e}", path.display())))?;

        let (width, height) = (img.width(), img.height());
        let (data, layout) = if img.color().has_alpha() {
            (img.into_rgba8().into_raw(), PixelLayout::Rgba8)
        } else {
            (img.into_rgb8().into_raw(), PixelLayout::Rgb8)
        };

        Ok(Frame {
            data,
            width,
            height,
            layout,
        })
    }

    fn close(&mut self) {
        self.files.clear();
    }

    fn name(&self) -> &str {
        "directory"
    }
}
