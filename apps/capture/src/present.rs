//! Human-readable rendering of session state for the console.

use std::fmt::Write;

use lenscast_protocol::AnalysisResult;

use crate::managers::capture_manager::SchedulerState;
use crate::managers::session::{CaptureMode, SessionState, SessionStats};
use crate::video::FrameSourceError;

/// User-facing explanation for a source that could not be opened.
pub fn source_error_message(error: &FrameSourceError) -> String {
    match error {
        FrameSourceError::PermissionDenied => {
            "Camera access was denied. Please allow camera access to use this feature.".into()
        }
        FrameSourceError::NotFound(_) => {
            "No camera device found. Please connect a camera and try again.".into()
        }
        FrameSourceError::InUse => "Camera is already in use by another application.".into(),
        FrameSourceError::Unsupported => "Camera capture is not supported on this platform.".into(),
        FrameSourceError::NotReady => "Camera is not ready yet. Please try again.".into(),
        FrameSourceError::Capture(message) => format!("Failed to access camera: {message}"),
    }
}

/// Multi-line summary of one analysis result.
pub fn render_result(result: &AnalysisResult) -> String {
    if !result.success {
        return format!("Failed to process image: {}", result.message);
    }

    let mut out = String::from(&result.message);
    if let Some(info) = &result.image_info {
        let _ = write!(out, "\n  Dimensions: {}x{}", info.width, info.height);
        let _ = write!(out, "\n  Format: {}", info.format);
        let _ = write!(out, "\n  Size: {}KB", (info.size_bytes + 512) / 1024);
        let _ = write!(out, "\n  Aspect Ratio: {:.2}", info.aspect_ratio);
    }
    if let Some(color) = &result.color_info {
        let _ = write!(out, "\n  Dominant Color: {}", color.dominant_color);
        let _ = write!(out, "\n  Is Grayscale: {}", yes_no(color.is_grayscale));
        let _ = write!(out, "\n  Has Transparency: {}", yes_no(color.has_transparency));
    }
    for b in &result.bounding_boxes {
        let _ = write!(
            out,
            "\n  {} ({:.0}%) at ({:.0}, {:.0})-({:.0}, {:.0})",
            b.label,
            b.confidence * 100.0,
            b.x1,
            b.y1,
            b.x2,
            b.y2
        );
    }
    out
}

pub fn render_stats(stats: &SessionStats) -> String {
    format!(
        "Processed: {} | Last: {} ms | Average: {} ms",
        stats.processed_count, stats.last_response_time_ms, stats.average_response_time_ms
    )
}

/// Full status block as printed by the `status` command.
pub fn render_status(state: &SessionState, scheduler: SchedulerState, in_flight: usize) -> String {
    let mode = match state.mode {
        CaptureMode::Running => "running",
        CaptureMode::Stopped => "stopped",
    };

    let mut out = format!("Capture {mode} ({scheduler:?}, {in_flight} in flight)");
    if let Some(id) = state.session_id {
        let _ = write!(out, "\nSession {id}");
        if let Some(started) = state.started_at {
            let _ = write!(out, " started {}", started.format("%Y-%m-%d %H:%M:%S UTC"));
        }
    }
    let _ = write!(out, "\n{}", render_stats(&state.stats));
    match &state.current {
        Some(result) => {
            let _ = write!(out, "\n{}", render_result(result));
        }
        None => out.push_str("\nNo results yet"),
    }
    out
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
