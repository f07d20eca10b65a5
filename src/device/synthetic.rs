// In-process camera and encoder backend
//
// Simulates camera hardware with exclusive access and a chunk-emitting
// encoder. Used by the control service when no hardware backend is wired in,
// and by the tests to observe how many streams and tracks are alive.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::encoder::{EncoderConfig, EncoderEvent, EncoderFactory, MediaEncoder};
use super::stream::{DeviceError, FacingMode, MediaDevices, MediaStream, StreamConstraints};

/// Live counters shared by every stream a `SyntheticDevices` hands out
#[derive(Debug, Clone, Default)]
pub struct DeviceStats {
    active_streams: Arc<AtomicUsize>,
    peak_streams: Arc<AtomicUsize>,
    live_tracks: Arc<AtomicUsize>,
    acquisitions: Arc<AtomicUsize>,
}

impl DeviceStats {
    /// Streams currently holding a camera
    pub fn active_streams(&self) -> usize {
        self.active_streams.load(Ordering::SeqCst)
    }

    /// Highest number of streams ever held at the same time
    pub fn peak_streams(&self) -> usize {
        self.peak_streams.load(Ordering::SeqCst)
    }

    /// Tracks across all streams that have not been stopped
    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    /// Successful acquisitions so far
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }
}

/// One simulated camera
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    pub label: String,
    pub facing_mode: FacingMode,
    in_use: Arc<AtomicBool>,
}

impl SyntheticCamera {
    pub fn new(label: impl Into<String>, facing_mode: FacingMode) -> Self {
        Self {
            label: label.into(),
            facing_mode,
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Simulated camera/microphone backend
pub struct SyntheticDevices {
    cameras: Vec<SyntheticCamera>,
    permission_denied: AtomicBool,
    failures_pending: AtomicUsize,
    stats: DeviceStats,
}

impl SyntheticDevices {
    pub fn new(cameras: Vec<SyntheticCamera>) -> Self {
        Self {
            cameras,
            permission_denied: AtomicBool::new(false),
            failures_pending: AtomicUsize::new(0),
            stats: DeviceStats::default(),
        }
    }

    /// A phone-like device with one front and one back camera
    pub fn front_and_back() -> Self {
        Self::new(vec![
            SyntheticCamera::new("Front Camera", FacingMode::User),
            SyntheticCamera::new("Back Camera", FacingMode::Environment),
        ])
    }

    /// Refuse every acquisition as if the user denied camera access
    pub fn deny_permission(&self, denied: bool) {
        self.permission_denied.store(denied, Ordering::SeqCst);
    }

    /// Make the next `count` acquisitions fail with `DeviceError::Busy`
    pub fn fail_next(&self, count: usize) {
        self.failures_pending.store(count, Ordering::SeqCst);
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats.clone()
    }

    fn take_scripted_failure(&self) -> bool {
        self.failures_pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait::async_trait]
impl MediaDevices for SyntheticDevices {
    async fn acquire(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError> {
        if self.permission_denied.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied(
                "camera access was denied".to_string(),
            ));
        }

        if self.take_scripted_failure() {
            return Err(DeviceError::Busy("camera is in use".to_string()));
        }

        let mut matched = false;
        for camera in &self.cameras {
            if let Some(mode) = constraints.facing_mode {
                if camera.facing_mode != mode {
                    continue;
                }
            }
            matched = true;

            if camera
                .in_use
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                continue;
            }

            let tracks = if constraints.audio { 2 } else { 1 };
            let active = self.stats.active_streams.fetch_add(1, Ordering::SeqCst) + 1;
            self.stats.peak_streams.fetch_max(active, Ordering::SeqCst);
            self.stats.live_tracks.fetch_add(tracks, Ordering::SeqCst);
            self.stats.acquisitions.fetch_add(1, Ordering::SeqCst);

            let stream = SyntheticStream {
                id: format!("stream-{}", uuid::Uuid::new_v4()),
                facing_mode: camera.facing_mode,
                tracks,
                in_use: Arc::clone(&camera.in_use),
                stats: self.stats.clone(),
                stopped: false,
            };

            debug!(
                "Acquired {} ({}, {} tracks) as {}",
                camera.label, camera.facing_mode, tracks, stream.id
            );

            return Ok(Box::new(stream));
        }

        match (matched, constraints.facing_mode) {
            (true, _) => Err(DeviceError::Busy("all matching cameras are in use".to_string())),
            (false, Some(mode)) => Err(DeviceError::NotFound(format!("no {} camera", mode))),
            (false, None) => Err(DeviceError::NotFound("no camera".to_string())),
        }
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[derive(Debug)]
struct SyntheticStream {
    id: String,
    facing_mode: FacingMode,
    tracks: usize,
    in_use: Arc<AtomicBool>,
    stats: DeviceStats,
    stopped: bool,
}

impl MediaStream for SyntheticStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn facing_mode(&self) -> Option<FacingMode> {
        Some(self.facing_mode)
    }

    fn live_tracks(&self) -> usize {
        if self.stopped {
            0
        } else {
            self.tracks
        }
    }

    fn stop_all(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.stats.live_tracks.fetch_sub(self.tracks, Ordering::SeqCst);
        self.stats.active_streams.fetch_sub(1, Ordering::SeqCst);
        self.in_use.store(false, Ordering::SeqCst);
    }
}

/// What a synthetic encoder emits
#[derive(Debug, Clone)]
pub enum ChunkSource {
    /// Emit these chunks in order; whatever is left is flushed on stop
    Script(Vec<Vec<u8>>),
    /// Emit `chunk_size` bytes every timeslice until stopped
    Timed { chunk_size: usize },
}

/// How a scripted encoder finishes once its chunks are sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScriptEnding {
    /// Wait for `request_stop`, then emit `Stopped`
    #[default]
    OnRequest,
    /// Emit `Stopped` without being asked, like a track that ended
    Spontaneous,
    /// Drop the channel without a `Stopped` event
    HangUp,
}

/// Builds encoders that replay a `ChunkSource`
#[derive(Debug, Clone)]
pub struct SyntheticEncoderFactory {
    source: ChunkSource,
    interval: Option<Duration>,
    fail_after: Option<usize>,
    ending: ScriptEnding,
}

impl SyntheticEncoderFactory {
    /// Scripted chunks delivered without delay
    pub fn scripted(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            source: ChunkSource::Script(chunks),
            interval: Some(Duration::ZERO),
            fail_after: None,
            ending: ScriptEnding::OnRequest,
        }
    }

    /// Fixed-size chunks at the configured timeslice
    pub fn timed(chunk_size: usize) -> Self {
        Self {
            source: ChunkSource::Timed { chunk_size },
            interval: None,
            fail_after: None,
            ending: ScriptEnding::OnRequest,
        }
    }

    /// Emit `EncoderEvent::Error` after this many chunks
    pub fn failing_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    /// Change how a scripted encoder ends
    pub fn ending(mut self, ending: ScriptEnding) -> Self {
        self.ending = ending;
        self
    }
}

impl EncoderFactory for SyntheticEncoderFactory {
    fn create(&self, config: &EncoderConfig) -> Result<Box<dyn MediaEncoder>, DeviceError> {
        let interval = self
            .interval
            .unwrap_or_else(|| Duration::from_millis(config.timeslice_ms.max(1)));

        Ok(Box::new(SyntheticEncoder {
            source: Some(self.source.clone()),
            interval,
            fail_after: self.fail_after,
            ending: self.ending,
            mime_type: config.mime_type.clone(),
            channel_capacity: config.channel_capacity.max(1),
            stop_tx: None,
        }))
    }
}

struct SyntheticEncoder {
    source: Option<ChunkSource>,
    interval: Duration,
    fail_after: Option<usize>,
    ending: ScriptEnding,
    mime_type: String,
    channel_capacity: usize,
    stop_tx: Option<oneshot::Sender<()>>,
}

#[async_trait::async_trait]
impl MediaEncoder for SyntheticEncoder {
    async fn start(
        &mut self,
        stream: &dyn MediaStream,
    ) -> Result<mpsc::Receiver<EncoderEvent>, DeviceError> {
        if stream.live_tracks() == 0 {
            return Err(DeviceError::Inactive);
        }

        let source = self
            .source
            .take()
            .ok_or_else(|| DeviceError::Encoder("encoder already started".to_string()))?;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_tx = Some(stop_tx);

        info!("Synthetic encoder started on {} ({})", stream.id(), self.mime_type);

        let interval = self.interval;
        let fail_after = self.fail_after;
        let ending = self.ending;
        tokio::spawn(async move {
            match source {
                ChunkSource::Script(chunks) => {
                    run_script(chunks, interval, fail_after, ending, tx, stop_rx).await
                }
                ChunkSource::Timed { chunk_size } => {
                    run_timed(chunk_size, interval, fail_after, tx, stop_rx).await
                }
            }
        });

        Ok(rx)
    }

    async fn request_stop(&mut self) -> Result<(), DeviceError> {
        match self.stop_tx.take() {
            Some(stop_tx) => {
                if stop_tx.send(()).is_err() {
                    warn!("Synthetic encoder already finished");
                }
                Ok(())
            }
            None => Err(DeviceError::Encoder("encoder is not running".to_string())),
        }
    }

    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

async fn run_script(
    chunks: Vec<Vec<u8>>,
    interval: Duration,
    fail_after: Option<usize>,
    ending: ScriptEnding,
    tx: mpsc::Sender<EncoderEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut stop_requested = false;

    for (sent, chunk) in chunks.into_iter().enumerate() {
        if !stop_requested && !interval.is_zero() {
            tokio::select! {
                _ = &mut stop_rx => stop_requested = true,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        if fail_after == Some(sent) {
            let _ = tx.send(EncoderEvent::Error("encoder failed".to_string())).await;
            return;
        }

        if tx.send(EncoderEvent::Chunk(chunk)).await.is_err() {
            return;
        }
    }

    match ending {
        ScriptEnding::HangUp => return,
        ScriptEnding::Spontaneous => {}
        ScriptEnding::OnRequest => {
            if !stop_requested {
                let _ = stop_rx.await;
            }
        }
    }

    let _ = tx.send(EncoderEvent::Stopped).await;
}

async fn run_timed(
    chunk_size: usize,
    interval: Duration,
    fail_after: Option<usize>,
    tx: mpsc::Sender<EncoderEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick completes immediately
    ticker.tick().await;

    let mut sent = 0usize;
    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                if fail_after == Some(sent) {
                    let _ = tx.send(EncoderEvent::Error("encoder failed".to_string())).await;
                    return;
                }
                let chunk = vec![(sent % 256) as u8; chunk_size];
                if tx.send(EncoderEvent::Chunk(chunk)).await.is_err() {
                    return;
                }
                sent += 1;
            }
        }
    }

    // Flush the partially filled timeslice
    let _ = tx.send(EncoderEvent::Chunk(vec![(sent % 256) as u8; chunk_size / 2])).await;
    let _ = tx.send(EncoderEvent::Stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exclusive_camera_reports_busy() {
        let devices = SyntheticDevices::new(vec![SyntheticCamera::new("Only", FacingMode::User)]);

        let first = devices.acquire(StreamConstraints::any(false)).await.unwrap();
        let second = devices.acquire(StreamConstraints::any(false)).await;

        assert!(matches!(second, Err(DeviceError::Busy(_))));
        assert_eq!(first.live_tracks(), 1);
        assert_eq!(devices.stats().active_streams(), 1);
    }

    #[tokio::test]
    async fn stopping_frees_the_camera() {
        let devices = SyntheticDevices::front_and_back();

        let mut stream = devices
            .acquire(StreamConstraints::facing(FacingMode::User, true))
            .await
            .unwrap();
        assert_eq!(devices.stats().live_tracks(), 2);

        stream.stop_all();
        stream.stop_all();
        assert_eq!(devices.stats().live_tracks(), 0);
        assert_eq!(devices.stats().active_streams(), 0);

        let again = devices
            .acquire(StreamConstraints::facing(FacingMode::User, true))
            .await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn missing_facing_mode_is_not_found() {
        let devices =
            SyntheticDevices::new(vec![SyntheticCamera::new("Back", FacingMode::Environment)]);

        let result = devices
            .acquire(StreamConstraints::facing(FacingMode::User, false))
            .await;

        assert!(matches!(result, Err(DeviceError::NotFound(_))));
    }
}
