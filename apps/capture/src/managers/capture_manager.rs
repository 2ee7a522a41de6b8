//! Periodic capture and dispatch.
//!
//! A session arms one timer task. Every tick that passes the minimum-gap
//! gate spawns a cycle task that snapshots a frame, encodes it, sends it for
//! analysis and folds the outcome into the session. Ticks never wait for
//! earlier cycles, so dispatches may overlap and finish out of order.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lenscast_protocol::AnalysisResult;

use super::session::{CaptureMode, Completion, SessionHandle};
use crate::client::AnalysisClient;
use crate::video::{encode, EncodeOptions, Frame, FrameSource, FrameSourceError};

/// Default time between ticks
pub const DEFAULT_CAPTURE_INTERVAL: Duration = Duration::from_millis(2000);
/// Default minimum time between the starts of two cycles
pub const DEFAULT_MIN_GAP: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub capture_interval: Duration,
    pub min_gap: Duration,
    pub encode: EncodeOptions,
    /// Keep the newest applied result when an older cycle completes late.
    pub fence_stale_results: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            capture_interval: DEFAULT_CAPTURE_INTERVAL,
            min_gap: DEFAULT_MIN_GAP,
            encode: EncodeOptions::default(),
            fence_stale_results: false,
        }
    }
}

/// Externally visible scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Starting,
    Capturing,
    Dispatching,
    Stopped,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Frame source unavailable: {0}")]
    Source(#[from] FrameSourceError),

    #[error("Capture session has been shut down")]
    ShutDown,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Starting,
    Running,
    Stopped,
}

struct Control {
    phase: Phase,
    cancel: Option<CancellationToken>,
}

/// State shared between the manager, its timer task and cycle tasks.
struct Shared<C> {
    config: SchedulerConfig,
    source: Mutex<Box<dyn FrameSource>>,
    client: C,
    session: SessionHandle,
    last_capture_start: Mutex<Option<Instant>>,
    next_cycle: AtomicU64,
    in_flight: AtomicUsize,
    torn_down: AtomicBool,
}

/// Drives capture sessions. The only writer of its `SessionHandle`.
pub struct CaptureManager<C: AnalysisClient> {
    shared: Arc<Shared<C>>,
    control: Mutex<Control>,
}

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<C: AnalysisClient> CaptureManager<C> {
    pub fn new(
        config: SchedulerConfig,
        source: Box<dyn FrameSource>,
        client: C,
        session: SessionHandle,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                source: Mutex::new(source),
                client,
                session,
                last_capture_start: Mutex::new(None),
                next_cycle: AtomicU64::new(0),
                in_flight: AtomicUsize::new(0),
                torn_down: AtomicBool::new(false),
            }),
            control: Mutex::new(Control {
                phase: Phase::Idle,
                cancel: None,
            }),
        }
    }

    /// Open the source, reset the session and arm the timer. The first
    /// capture fires immediately. A no-op when already running or starting.
    ///
    /// The source is opened on the blocking pool; a `stop` issued meanwhile
    /// wins and the freshly opened source is closed again.
    pub async fn start(&self) -> SchedulerResult<()> {
        {
            let mut control = lock(&self.control);
            if self.shared.torn_down.load(Ordering::SeqCst) {
                return Err(SchedulerError::ShutDown);
            }
            if matches!(control.phase, Phase::Running | Phase::Starting) {
                debug!("Capture already running");
                return Ok(());
            }
            control.phase = Phase::Starting;
        }

        let shared = self.shared.clone();
        let opened = tokio::task::spawn_blocking(move || {
            let mut source = lock(&shared.source);
            let opened = source.open();
            if let Err(e) = &opened {
                warn!("Failed to open {} source: {e}", source.name());
            }
            opened
        })
        .await
        .unwrap_or_else(|e| Err(FrameSourceError::Capture(format!("source open task failed: {e}"))));

        let mut control = lock(&self.control);
        if let Err(e) = opened {
            if control.phase == Phase::Starting {
                control.phase = Phase::Stopped;
            }
            return Err(e.into());
        }
        if control.phase != Phase::Starting {
            debug!("Capture stopped while the source was opening");
            lock(&self.shared.source).close();
            return if self.shared.torn_down.load(Ordering::SeqCst) {
                Err(SchedulerError::ShutDown)
            } else {
                Ok(())
            };
        }

        let generation = self.shared.session.begin();
        *lock(&self.shared.last_capture_start) = None;

        let token = CancellationToken::new();
        tokio::spawn(Shared::run_timer(self.shared.clone(), generation, token.clone()));
        control.cancel = Some(token);
        control.phase = Phase::Running;

        info!(
            "Capture started (session generation {}, every {:?}, min gap {:?})",
            generation, self.shared.config.capture_interval, self.shared.config.min_gap
        );
        Ok(())
    }

    /// Cancel the timer and release the source. In-flight cycles finish and
    /// still report into the session. Idempotent.
    pub fn stop(&self) {
        let mut control = lock(&self.control);
        if let Some(token) = control.cancel.take() {
            token.cancel();
            lock(&self.shared.source).close();
            info!("Capture stopped");
        }
        control.phase = Phase::Stopped;
        self.shared.session.set_mode(CaptureMode::Stopped);
    }

    /// Stop when running, start otherwise. Returns the resulting mode.
    pub async fn toggle(&self) -> SchedulerResult<CaptureMode> {
        let running = lock(&self.control).phase == Phase::Running;
        if running {
            self.stop();
            Ok(CaptureMode::Stopped)
        } else {
            self.start().await?;
            Ok(CaptureMode::Running)
        }
    }

    /// Stop for good. Completions arriving afterwards are discarded.
    pub fn shutdown(&self) {
        self.shared.torn_down.store(true, Ordering::SeqCst);
        self.stop();
    }

    pub fn state(&self) -> SchedulerState {
        match lock(&self.control).phase {
            Phase::Idle => SchedulerState::Idle,
            Phase::Starting => SchedulerState::Starting,
            Phase::Stopped => SchedulerState::Stopped,
            Phase::Running if self.in_flight() > 0 => SchedulerState::Dispatching,
            Phase::Running => SchedulerState::Capturing,
        }
    }

    /// Number of dispatches currently awaiting a reply
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> &SessionHandle {
        &self.shared.session
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }
}

impl<C: AnalysisClient> Drop for CaptureManager<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Decrements the in-flight counter when a dispatch ends, however it ends.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl<C: AnalysisClient> Shared<C> {
    async fn run_timer(shared: Arc<Self>, generation: u64, token: CancellationToken) {
        let mut ticker = time::interval(shared.config.capture_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => Self::tick(&shared, generation, &token),
            }
        }
        debug!("Capture timer for generation {} ended", generation);
    }

    /// Admit or skip one tick. Skipped ticks leave no trace in the session.
    ///
    /// The frame is taken here, before the cycle task is spawned, so a
    /// `stop` that closes the source afterwards cannot strand the cycle.
    fn tick(shared: &Arc<Self>, generation: u64, token: &CancellationToken) {
        let now = Instant::now();
        {
            let mut last = lock(&shared.last_capture_start);
            if let Some(previous) = *last {
                let since = now.duration_since(previous);
                if since < shared.config.min_gap {
                    debug!("Skipping tick: previous capture started {:?} ago", since);
                    return;
                }
            }
            *last = Some(now);
        }

        let cycle = shared.next_cycle.fetch_add(1, Ordering::SeqCst);
        let frame = match lock(&shared.source).capture() {
            Ok(frame) => frame,
            Err(_) if token.is_cancelled() => {
                debug!("Cycle {}: cancelled by stop before capture", cycle);
                return;
            }
            Err(e) => {
                warn!("Cycle {}: frame capture failed: {e}", cycle);
                return;
            }
        };

        let shared = shared.clone();
        tokio::spawn(async move { shared.run_cycle(generation, cycle, frame).await });
    }

    async fn run_cycle(&self, generation: u64, cycle: u64, frame: Frame) {
        let request = match encode(&frame.data, frame.layout, frame.width, frame.height, self.config.encode) {
            Ok(request) => request,
            Err(e) => {
                warn!("Cycle {}: encoding failed: {e}", cycle);
                return;
            }
        };

        let (outcome, elapsed) = {
            let _in_flight = InFlight::enter(&self.in_flight);
            let dispatch_start = Instant::now();
            let outcome = self.client.analyze(request).await;
            (outcome, dispatch_start.elapsed())
        };
        let response_time_ms = elapsed.as_millis() as u64;

        let result = match outcome {
            Ok(result) => {
                debug!(
                    "Cycle {}: analysis finished in {} ms (success={})",
                    cycle, response_time_ms, result.success
                );
                result
            }
            Err(e) => {
                warn!("Cycle {}: dispatch failed after {} ms: {e}", cycle, response_time_ms);
                AnalysisResult::failure(format!("Transport error: {e}"))
            }
        };

        if self.torn_down.load(Ordering::SeqCst) {
            debug!("Cycle {}: session torn down, dropping result", cycle);
            return;
        }

        let completion = Completion {
            generation,
            cycle,
            response_time_ms,
            result,
        };
        if !self.session.apply(completion, self.config.fence_stale_results) {
            debug!("Cycle {}: belongs to an earlier session, dropped", cycle);
        }
    }
}

#[cfg(test)]
mod tests {
    use lenscast_protocol::ImageInfo;

    use super::*;
    use crate::client::TransportError;
    use crate::managers::session::SessionState;
    use crate::video::{CaptureRequest, PixelLayout, SourceResult, SyntheticSource};

    type Responder = Box<dyn Fn(usize) -> Result<AnalysisResult, TransportError> + Send + Sync>;

    /// Replies after a scripted delay; the last delay repeats.
    struct ScriptedClient {
        latencies_ms: Vec<u64>,
        respond: Responder,
        calls: Arc<AtomicUsize>,
    }

    impl AnalysisClient for ScriptedClient {
        async fn analyze(&self, _request: CaptureRequest) -> Result<AnalysisResult, TransportError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let ms = self
                .latencies_ms
                .get(n)
                .or(self.latencies_ms.last())
                .copied()
                .unwrap_or(0);
            time::sleep(Duration::from_millis(ms)).await;
            (self.respond)(n)
        }
    }

    fn numbered(n: usize) -> Result<AnalysisResult, TransportError> {
        Ok(AnalysisResult {
            success: true,
            message: format!("cycle {n}"),
            image_info: None,
            color_info: None,
            bounding_boxes: vec![],
        })
    }

    fn config(interval_ms: u64, gap_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            capture_interval: Duration::from_millis(interval_ms),
            min_gap: Duration::from_millis(gap_ms),
            ..SchedulerConfig::default()
        }
    }

    fn manager_with(
        config: SchedulerConfig,
        source: Box<dyn FrameSource>,
        latencies_ms: Vec<u64>,
        respond: Responder,
    ) -> (CaptureManager<ScriptedClient>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let client = ScriptedClient {
            latencies_ms,
            respond,
            calls: calls.clone(),
        };
        let manager = CaptureManager::new(config, source, client, SessionHandle::new());
        (manager, calls)
    }

    fn manager(
        config: SchedulerConfig,
        latencies_ms: Vec<u64>,
    ) -> (CaptureManager<ScriptedClient>, Arc<AtomicUsize>) {
        manager_with(
            config,
            Box::new(SyntheticSource::new(16, 16)),
            latencies_ms,
            Box::new(numbered),
        )
    }

    async fn wait_processed(session: &SessionHandle, count: u64) -> SessionState {
        let mut rx = session.subscribe();
        let state = time::timeout(
            Duration::from_secs(60),
            rx.wait_for(|s| s.stats.processed_count >= count),
        )
        .await
        .expect("timed out waiting for cycles")
        .expect("session channel closed");
        (*state).clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_cycles_accumulate_stats() {
        let (manager, _) = manager(config(1000, 500), vec![100, 200, 300]);
        manager.start().await.unwrap();

        let state = wait_processed(manager.session(), 3).await;
        manager.stop();

        assert_eq!(state.stats.processed_count, 3);
        assert_eq!(state.stats.total_response_time_ms, 600);
        assert_eq!(state.stats.last_response_time_ms, 300);
        assert_eq!(state.stats.average_response_time_ms, 200);
        assert_eq!(state.current.unwrap().message, "cycle 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_inside_min_gap_are_skipped() {
        let (manager, calls) = manager(config(100, 250), vec![10]);
        manager.start().await.unwrap();

        // Ticks at 0..=600 every 100ms; only 0, 300 and 600 clear the gap.
        time::sleep(Duration::from_millis(650)).await;
        manager.stop();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(manager.session().snapshot().stats.processed_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_is_folded_as_result() {
        let (manager, _) = manager_with(
            config(2000, 500),
            Box::new(SyntheticSource::new(16, 16)),
            vec![40],
            Box::new(|_| Err(TransportError::Connect("connection refused".into()))),
        );
        manager.start().await.unwrap();

        let state = wait_processed(manager.session(), 1).await;
        manager.stop();

        let current = state.current.unwrap();
        assert!(!current.success);
        assert!(current.message.starts_with("Transport error"));
        assert!(current.message.contains("connection refused"));
        assert!(current.image_info.is_none());
        assert!(current.bounding_boxes.is_empty());
        assert_eq!(state.stats.processed_count, 1);
        assert_eq!(state.stats.last_response_time_ms, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_metadata_reaches_session() {
        let (manager, _) = manager_with(
            config(2000, 500),
            Box::new(SyntheticSource::new(16, 16)),
            vec![25],
            Box::new(|_| {
                Ok(AnalysisResult {
                    success: true,
                    message: "Image processed successfully".into(),
                    image_info: Some(ImageInfo {
                        width: 640,
                        height: 480,
                        format: "jpeg".into(),
                        size_bytes: 51200,
                        aspect_ratio: 1.333,
                    }),
                    color_info: None,
                    bounding_boxes: vec![],
                })
            }),
        );
        manager.start().await.unwrap();

        let state = wait_processed(manager.session(), 1).await;
        manager.stop();

        let current = state.current.unwrap();
        assert_eq!(current.message, "Image processed successfully");
        let info = current.image_info.unwrap();
        assert!((info.aspect_ratio - 1.33).abs() < 0.01);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (manager, _) = manager(config(100, 0), vec![10]);
        manager.stop();
        assert_eq!(manager.state(), SchedulerState::Stopped);

        manager.start().await.unwrap();
        manager.stop();
        manager.stop();

        assert_eq!(manager.state(), SchedulerState::Stopped);
        assert_eq!(manager.session().snapshot().mode, CaptureMode::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_ticks_after_stop() {
        let (manager, calls) = manager(config(100, 0), vec![10]);
        manager.start().await.unwrap();
        time::sleep(Duration::from_millis(250)).await;
        manager.stop();

        let before = calls.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(calls.load(Ordering::SeqCst), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_stats_before_first_cycle() {
        let (manager, _) = manager(config(100, 0), vec![10]);
        manager.start().await.unwrap();
        wait_processed(manager.session(), 2).await;
        manager.stop();

        manager.start().await.unwrap();
        let state = manager.session().snapshot();
        assert_eq!(state.stats.processed_count, 0);
        assert_eq!(state.stats.total_response_time_ms, 0);
        assert_eq!(state.stats.last_response_time_ms, 0);
        assert_eq!(state.stats.average_response_time_ms, 0);
        assert!(state.current.is_none());
        assert_eq!(state.mode, CaptureMode::Running);

        let state = wait_processed(manager.session(), 1).await;
        assert_eq!(state.stats.processed_count, 1);
        manager.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_cycle_completes_after_stop() {
        let (manager, _) = manager(config(2000, 500), vec![500]);
        manager.start().await.unwrap();

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.state(), SchedulerState::Dispatching);
        assert_eq!(manager.in_flight(), 1);

        manager.stop();
        assert_eq!(manager.state(), SchedulerState::Stopped);

        time::sleep(Duration::from_millis(600)).await;
        let state = manager.session().snapshot();
        assert_eq!(state.stats.processed_count, 1);
        assert_eq!(state.stats.last_response_time_ms, 500);
        assert_eq!(manager.in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_drops_previous_session_completions() {
        let (manager, _) = manager(config(2000, 0), vec![500]);
        manager.start().await.unwrap();
        time::sleep(Duration::from_millis(100)).await;
        manager.stop();
        manager.start().await.unwrap();

        // The first session's reply lands at 500ms and must be ignored.
        time::sleep(Duration::from_millis(450)).await;
        assert_eq!(manager.session().snapshot().stats.processed_count, 0);

        let state = wait_processed(manager.session(), 1).await;
        manager.stop();
        assert_eq!(state.current.unwrap().message, "cycle 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_late_results() {
        let (manager, _) = manager(config(2000, 0), vec![500]);
        manager.start().await.unwrap();
        time::sleep(Duration::from_millis(100)).await;
        manager.shutdown();

        time::sleep(Duration::from_millis(600)).await;
        assert_eq!(manager.session().snapshot().stats.processed_count, 0);
        assert!(matches!(manager.start().await, Err(SchedulerError::ShutDown)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_completion_last_write_wins() {
        let (manager, _) = manager(config(500, 0), vec![800, 100]);
        manager.start().await.unwrap();

        let state = wait_processed(manager.session(), 2).await;
        manager.stop();

        // Cycle 1 finished at 600ms, cycle 0 overwrote it at 800ms.
        assert_eq!(state.current.unwrap().message, "cycle 0");
        assert_eq!(state.stats.last_response_time_ms, 800);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fencing_keeps_fresher_result() {
        let mut config = config(500, 0);
        config.fence_stale_results = true;
        let (manager, _) = manager(config, vec![800, 100]);
        manager.start().await.unwrap();

        let state = wait_processed(manager.session(), 2).await;
        manager.stop();

        assert_eq!(state.current.unwrap().message, "cycle 1");
        assert_eq!(state.stats.processed_count, 2);
        assert_eq!(state.stats.total_response_time_ms, 900);
    }

    /// Fails once at the source, once at encoding, then behaves.
    struct FlakySource {
        captures: usize,
    }

    impl FrameSource for FlakySource {
        fn capture(&mut self) -> SourceResult<Frame> {
            self.captures += 1;
            match self.captures {
                1 => Err(FrameSourceError::NotReady),
                2 => Ok(Frame {
                    data: vec![],
                    width: 0,
                    height: 0,
                    layout: PixelLayout::Rgb8,
                }),
                _ => Ok(Frame {
                    data: vec![0; 4 * 4 * 3],
                    width: 4,
                    height: 4,
                    layout: PixelLayout::Rgb8,
                }),
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycles_do_not_stop_the_timer() {
        let (manager, calls) = manager_with(
            config(100, 0),
            Box::new(FlakySource { captures: 0 }),
            vec![10],
            Box::new(numbered),
        );
        manager.start().await.unwrap();

        time::sleep(Duration::from_millis(250)).await;
        manager.stop();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.session().snapshot().stats.processed_count, 1);
    }

    struct DeniedSource;

    impl FrameSource for DeniedSource {
        fn open(&mut self) -> SourceResult<()> {
            Err(FrameSourceError::PermissionDenied)
        }

        fn capture(&mut self) -> SourceResult<Frame> {
            Err(FrameSourceError::NotReady)
        }

        fn name(&self) -> &str {
            "denied"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_failure_aborts_start() {
        let (manager, calls) = manager_with(config(100, 0), Box::new(DeniedSource), vec![10], Box::new(numbered));
        assert_eq!(manager.state(), SchedulerState::Idle);

        let err = manager.start().await.unwrap_err();
        assert!(matches!(err, SchedulerError::Source(FrameSourceError::PermissionDenied)));
        assert_eq!(manager.state(), SchedulerState::Stopped);
        assert_eq!(manager.session().snapshot().mode, CaptureMode::Stopped);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_flips_mode() {
        let (manager, _) = manager(config(100, 0), vec![10]);
        assert_eq!(manager.toggle().await.unwrap(), CaptureMode::Running);
        assert_eq!(manager.session().snapshot().mode, CaptureMode::Running);
        assert_eq!(manager.toggle().await.unwrap(), CaptureMode::Stopped);
        assert_eq!(manager.state(), SchedulerState::Stopped);
    }

    /// Blocks in `open` until released, like a camera that is slow to come up.
    struct GatedSource {
        release: std::sync::mpsc::Receiver<()>,
    }

    impl FrameSource for GatedSource {
        fn open(&mut self) -> SourceResult<()> {
            let _ = self.release.recv();
            Ok(())
        }

        fn capture(&mut self) -> SourceResult<Frame> {
            Ok(Frame {
                data: vec![0; 4 * 4 * 3],
                width: 4,
                height: 4,
                layout: PixelLayout::Rgb8,
            })
        }

        fn name(&self) -> &str {
            "gated"
        }
    }

    #[tokio::test]
    async fn test_slow_open_does_not_block_runtime_and_stop_wins() {
        let (release, gate) = std::sync::mpsc::channel();
        let (manager, calls) = manager_with(
            config(100, 0),
            Box::new(GatedSource { release: gate }),
            vec![10],
            Box::new(numbered),
        );
        let manager = Arc::new(manager);

        let starting = tokio::spawn({
            let manager = manager.clone();
            async move { manager.start().await }
        });
        while manager.state() != SchedulerState::Starting {
            tokio::task::yield_now().await;
        }

        // Still on the runtime while the source is opening.
        assert!(manager.start().await.is_ok());
        manager.stop();
        release.send(()).unwrap();

        starting.await.unwrap().unwrap();
        assert_eq!(manager.state(), SchedulerState::Stopped);
        assert_eq!(manager.session().snapshot().mode, CaptureMode::Stopped);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    /// Counts captures and refuses to capture once closed.
    struct CountingSource {
        captures: Arc<AtomicUsize>,
        open: bool,
    }

    impl FrameSource for CountingSource {
        fn open(&mut self) -> SourceResult<()> {
            self.open = true;
            Ok(())
        }

        fn capture(&mut self) -> SourceResult<Frame> {
            if !self.open {
                return Err(FrameSourceError::NotReady);
            }
            self.captures.fetch_add(1, Ordering::SeqCst);
            Ok(Frame {
                data: vec![0; 4 * 4 * 3],
                width: 4,
                height: 4,
                layout: PixelLayout::Rgb8,
            })
        }

        fn close(&mut self) {
            self.open = false;
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_frame_taken_at_tick_survives_stop() {
        let captures = Arc::new(AtomicUsize::new(0));
        let (manager, calls) = manager_with(
            config(2000, 0),
            Box::new(CountingSource {
                captures: captures.clone(),
                open: false,
            }),
            vec![50],
            Box::new(numbered),
        );
        manager.start().await.unwrap();
        while captures.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        manager.stop();

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.session().snapshot().stats.processed_count, 1);
    }
}
