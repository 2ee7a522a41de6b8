//! Commands controlling the capture session.

use crate::client::AnalysisClient;
use crate::managers::capture_manager::{CaptureManager, SchedulerError};
use crate::managers::session::CaptureMode;
use crate::present;

fn describe(e: SchedulerError) -> String {
    match e {
        SchedulerError::Source(source) => present::source_error_message(&source),
        other => other.to_string(),
    }
}

/// Start capturing
pub async fn start_capture<C: AnalysisClient>(manager: &CaptureManager<C>) -> Result<String, String> {
    manager.start().await.map_err(describe)?;
    Ok(format!(
        "Capturing every {} ms",
        manager.config().capture_interval.as_millis()
    ))
}

/// Stop capturing. Replies already on their way are still shown.
pub fn stop_capture<C: AnalysisClient>(manager: &CaptureManager<C>) -> Result<String, String> {
    manager.stop();
    Ok("Capture stopped".to_string())
}

pub async fn toggle_capture<C: AnalysisClient>(manager: &CaptureManager<C>) -> Result<String, String> {
    match manager.toggle().await.map_err(describe)? {
        CaptureMode::Running => Ok(format!(
            "Capturing every {} ms",
            manager.config().capture_interval.as_millis()
        )),
        CaptureMode::Stopped => Ok("Capture stopped".to_string()),
    }
}

/// Current mode, stats and latest result
pub fn capture_status<C: AnalysisClient>(manager: &CaptureManager<C>) -> Result<String, String> {
    Ok(present::render_status(
        &manager.session().snapshot(),
        manager.state(),
        manager.in_flight(),
    ))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lenscast_protocol::AnalysisResult;

    use super::*;
    use crate::client::TransportError;
    use crate::managers::capture_manager::SchedulerConfig;
    use crate::managers::session::SessionHandle;
    use crate::video::{CaptureRequest, Frame, FrameSource, FrameSourceError, SourceResult, SyntheticSource};

    struct EchoClient;

    impl crate::client::AnalysisClient for EchoClient {
        async fn analyze(&self, request: CaptureRequest) -> Result<AnalysisResult, TransportError> {
            Ok(AnalysisResult {
                success: true,
                message: format!("{}x{}", request.width, request.height),
                image_info: None,
                color_info: None,
                bounding_boxes: vec![],
            })
        }
    }

    struct BusySource;

    impl FrameSource for BusySource {
        fn open(&mut self) -> SourceResult<()> {
            Err(FrameSourceError::InUse)
        }

        fn capture(&mut self) -> SourceResult<Frame> {
            Err(FrameSourceError::NotReady)
        }

        fn name(&self) -> &str {
            "busy"
        }
    }

    fn manager(source: Box<dyn FrameSource>) -> CaptureManager<EchoClient> {
        let config = SchedulerConfig {
            capture_interval: Duration::from_millis(1000),
            ..SchedulerConfig::default()
        };
        CaptureManager::new(config, source, EchoClient, SessionHandle::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_status_stop() {
        let manager = manager(Box::new(SyntheticSource::new(8, 6)));
        assert_eq!(start_capture(&manager).await.unwrap(), "Capturing every 1000 ms");

        let mut rx = manager.session().subscribe();
        rx.wait_for(|s| s.stats.processed_count >= 1).await.unwrap();

        let status = capture_status(&manager).unwrap();
        assert!(status.starts_with("Capture running"));
        assert!(status.contains("Processed: 1"));
        assert!(status.contains("8x6"));

        assert_eq!(stop_capture(&manager).unwrap(), "Capture stopped");
        assert!(capture_status(&manager).unwrap().starts_with("Capture stopped"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_is_user_message() {
        let manager = manager(Box::new(BusySource));
        let err = start_capture(&manager).await.unwrap_err();
        assert_eq!(err, "Camera is already in use by another application.");

        let err = toggle_capture(&manager).await.unwrap_err();
        assert_eq!(err, "Camera is already in use by another application.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_twice() {
        let manager = manager(Box::new(SyntheticSource::new(8, 6)));
        assert!(toggle_capture(&manager).await.unwrap().starts_with("Capturing"));
        assert_eq!(toggle_capture(&manager).await.unwrap(), "Capture stopped");
    }
}
