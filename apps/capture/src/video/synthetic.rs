//! Moving test pattern for headless runs and tests.

use super::{Frame, FrameSource, FrameSourceError, PixelLayout, SourceResult};

/// Generates an RGB gradient that shifts by a few pixels on every capture.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
    open: bool,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            frame_count: 0,
            open: false,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self) -> SourceResult<()> {
        self.open = true;
        Ok(())
    }

    fn capture(&mut self) -> SourceResult<Frame> {
        if !self.open {
            return Err(FrameSourceError::NotReady);
        }

        let offset = (self.frame_count * 4) as u32;
        let mut data = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                data.push(((x + offset) % 256) as u8);
                data.push((y % 256) as u8);
                data.push((offset % 256) as u8);
            }
        }
        self.frame_count += 1;

        Ok(Frame {
            data,
            width: self.width,
            height: self.height,
            layout: PixelLayout::Rgb8,
        })
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
