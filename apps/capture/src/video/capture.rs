//! Live camera source using nokhwa.
//!
//! nokhwa's `Camera` is not `Send`, so it lives on a dedicated thread that
//! keeps the most recent decoded frame in a shared slot. `capture` hands out
//! a copy of that frame, the way a canvas snapshots a playing video element.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tracing::{debug, error, info, warn};

use super::{Frame, FrameSource, FrameSourceError, PixelLayout, SourceResult, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH};

/// Frame rate requested from the device; snapshots are taken far less often.
const CAMERA_FPS: u32 = 15;

/// How long `open` waits for the device to report its first frame.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct CameraSource {
    device_index: u32,
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl CameraSource {
    pub fn new(device_index: u32) -> Self {
        Self {
            device_index,
            latest: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    fn capture_loop(
        device_index: u32,
        latest: Arc<Mutex<Option<Frame>>>,
        running: Arc<AtomicBool>,
        ready_tx: mpsc::Sender<SourceResult<()>>,
    ) {
        info!("CAMERA: Starting capture loop for device index {}", device_index);

        let target_format = CameraFormat::new(
            Resolution::new(DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT),
            FrameFormat::MJPEG, // Most cameras support MJPEG
            CAMERA_FPS,
        );
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(target_format));

        let mut camera = match Camera::new(CameraIndex::Index(device_index), requested) {
            Ok(camera) => camera,
            Err(e) => {
                let _ = ready_tx.send(Err(classify_error(&e.to_string())));
                return;
            }
        };

        if let Err(e) = camera.open_stream() {
            let _ = ready_tx.send(Err(classify_error(&e.to_string())));
            return;
        }

        let resolution = camera.resolution();
        info!(
            "CAMERA: Successfully opened {}x{} @ {} fps",
            resolution.width(),
            resolution.height(),
            CAMERA_FPS
        );
        let _ = ready_tx.send(Ok(()));

        let frame_interval = Duration::from_millis(1000 / CAMERA_FPS as u64);
        let mut last_frame_time = Instant::now();

        while running.load(Ordering::Relaxed) {
            // Rate limiting
            let elapsed = last_frame_time.elapsed();
            if elapsed < frame_interval {
                thread::sleep(frame_interval - elapsed);
            }
            last_frame_time = Instant::now();

            let buffer = match camera.frame() {
                Ok(f) => f,
                Err(e) => {
                    warn!("CAMERA: Failed to capture frame: {e}");
                    continue;
                }
            };

            let decoded = match buffer.decode_image::<RgbFormat>() {
                Ok(img) => img,
                Err(e) => {
                    warn!("CAMERA: Failed to decode frame: {e}");
                    continue;
                }
            };

            let frame = Frame {
                width: decoded.width(),
                height: decoded.height(),
                data: decoded.into_raw(),
                layout: PixelLayout::Rgb8,
            };
            if let Ok(mut slot) = latest.lock() {
                *slot = Some(frame);
            }
        }

        if let Err(e) = camera.stop_stream() {
            error!("CAMERA: Failed to stop stream: {e}");
        }
        info!("Camera capture loop ended");
    }
}

/// Map a backend error message onto the closed error kinds.
fn classify_error(message: &str) -> FrameSourceError {
    let lower = message.to_ascii_lowercase();
    if lower.contains("permission") || lower.contains("denied") {
        FrameSourceError::PermissionDenied
    } else if lower.contains("busy") || lower.contains("in use") {
        FrameSourceError::InUse
    } else if lower.contains("not found") || lower.contains("no such") {
        FrameSourceError::NotFound(message.to_string())
    } else if lower.contains("not supported") || lower.contains("unsupported") {
        FrameSourceError::Unsupported
    } else {
        FrameSourceError::Capture(message.to_string())
    }
}

impl CameraSource {
    /// Fresh stop flag for one capture thread. A thread abandoned by a timed
    /// out `open` keeps its own flag, which stays lowered.
    fn arm(&mut self) -> Arc<AtomicBool> {
        self.running.store(false, Ordering::Relaxed);
        self.running = Arc::new(AtomicBool::new(true));
        self.running.clone()
    }
}

impl FrameSource for CameraSource {
    fn open(&mut self) -> SourceResult<()> {
        if self.thread.is_some() {
            return Ok(());
        }

        let running = self.arm();
        let (ready_tx, ready_rx) = mpsc::channel();
        let index = self.device_index;
        let latest = self.latest.clone();
        let thread_running = running.clone();

        let handle = thread::Builder::new()
            .name("camera-capture".into())
            .spawn(move || Self::capture_loop(index, latest, thread_running, ready_tx))
            .map_err(|e| FrameSourceError::Capture(format!("Failed to spawn capture thread: {e}")))?;

        match ready_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(Ok(())) => {
                self.thread = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                running.store(false, Ordering::Relaxed);
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                warn!("CAMERA: Device did not report ready within {:?}", OPEN_TIMEOUT);
                running.store(false, Ordering::Relaxed);
                Err(FrameSourceError::NotReady)
            }
        }
    }

    fn capture(&mut self) -> SourceResult<Frame> {
        let slot = self
            .latest
            .lock()
            .map_err(|_| FrameSourceError::Capture("frame slot poisoned".into()))?;
        slot.clone().ok_or(FrameSourceError::NotReady)
    }

    fn close(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
        if let Ok(mut slot) = self.latest.lock() {
            *slot = None;
        }
        debug!("Camera source closed");
    }

    fn name(&self) -> &str {
        "camera"
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        self.close();
    }
}
