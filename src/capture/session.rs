use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::preview::PreviewSurface;
use super::recorder::{Recorder, RecorderPhase, RecorderStatus};
use super::recording::FinalizedRecording;
use crate::device::{
    DeviceError, EncoderConfig, EncoderFactory, FacingMode, MediaDevices, StreamConstraints,
    StreamGuard,
};
use crate::error::CaptureError;
use crate::form::AttachmentList;

/// Options applied when a capture session opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Preferred camera
    pub facing_mode: FacingMode,
    /// Request a microphone track alongside video
    pub audio: bool,
    /// Encoder settings for every recording in the session
    pub encoder: EncoderConfig,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            facing_mode: FacingMode::Environment,
            audio: true,
            encoder: EncoderConfig::default(),
        }
    }
}

/// Snapshot of a capture session
#[derive(Debug, Clone, Serialize)]
pub struct CaptureStatus {
    pub session_id: String,
    /// Preferred camera
    pub facing_mode: FacingMode,
    /// Camera the live stream actually comes from
    pub camera: Option<FacingMode>,
    pub stream_id: Option<String>,
    pub live_tracks: usize,
    pub recorder: RecorderStatus,
    pub preview: PreviewSurface,
    pub opened_at: DateTime<Utc>,
}

/// One capture modal: a camera stream plus the recorder that consumes it
///
/// The stream is acquired in `open` and released on every way out of the
/// session: `accept`, `close`, or dropping the value.
pub struct CaptureSession {
    id: String,
    devices: Arc<dyn MediaDevices>,
    audio: bool,
    facing_mode: FacingMode,
    stream: Option<StreamGuard>,
    recorder: Recorder,
    preview: PreviewSurface,
    opened_at: DateTime<Utc>,
}

impl CaptureSession {
    /// Acquire a camera and open the session
    ///
    /// Tries the preferred facing mode first, then any camera. If both fail
    /// no session exists.
    pub async fn open(
        devices: Arc<dyn MediaDevices>,
        encoders: Arc<dyn EncoderFactory>,
        options: CaptureOptions,
    ) -> Result<Self, CaptureError> {
        let id = format!("capture-{}", uuid::Uuid::new_v4());
        info!(
            "Opening capture session {} ({} camera via {})",
            id,
            options.facing_mode,
            devices.name()
        );

        let stream = acquire_with_fallback(devices.as_ref(), options.facing_mode, options.audio)
            .await
            .map_err(|e| {
                error!("Could not access camera for {}: {}", id, e);
                CaptureError::CameraUnavailable(e)
            })?;

        let mut preview = PreviewSurface::default();
        preview.attach_live(stream.id());

        Ok(Self {
            id,
            devices,
            audio: options.audio,
            facing_mode: options.facing_mode,
            stream: Some(stream),
            recorder: Recorder::new(encoders, options.encoder),
            preview,
            opened_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.facing_mode
    }

    pub fn recorder_phase(&self) -> RecorderPhase {
        self.recorder.phase()
    }

    pub fn preview(&self) -> &PreviewSurface {
        &self.preview
    }

    pub fn live_tracks(&self) -> usize {
        self.stream.as_ref().map(|s| s.live_tracks()).unwrap_or(0)
    }

    pub fn status(&self) -> CaptureStatus {
        let stream = self.stream.as_ref().and_then(|g| g.stream());

        CaptureStatus {
            session_id: self.id.clone(),
            facing_mode: self.facing_mode,
            camera: stream.and_then(|s| s.facing_mode()),
            stream_id: stream.map(|s| s.id().to_string()),
            live_tracks: self.live_tracks(),
            recorder: self.recorder.status(),
            preview: self.preview.clone(),
            opened_at: self.opened_at,
        }
    }

    /// Collect chunks delivered so far and report the current status
    pub fn poll(&mut self) -> Result<CaptureStatus, CaptureError> {
        let was_recording = self.recorder.phase() == RecorderPhase::Recording;
        self.recorder.drain_available()?;

        if was_recording && self.recorder.phase() == RecorderPhase::Stopped {
            self.refresh_preview();
        }

        Ok(self.status())
    }

    /// Flip the facing mode and re-acquire the camera
    ///
    /// The current stream is stopped before the new one is requested. If no
    /// replacement can be acquired the previous camera is restored and
    /// `CaptureError::SwitchFailed` is returned.
    pub async fn switch_camera(&mut self) -> Result<FacingMode, CaptureError> {
        if self.recorder.phase() == RecorderPhase::Recording {
            return Err(CaptureError::invalid(RecorderPhase::Recording, "switch camera"));
        }

        let previous = self.facing_mode;
        let requested = previous.flipped();

        info!("Switching {} camera: {} -> {}", self.id, previous, requested);

        self.release_stream();

        match acquire_with_fallback(self.devices.as_ref(), requested, self.audio).await {
            Ok(stream) => {
                self.attach(stream);
                self.facing_mode = requested;
                Ok(requested)
            }
            Err(switch_error) => {
                warn!(
                    "Could not switch {} to {} camera: {}",
                    self.id, requested, switch_error
                );

                match acquire_with_fallback(self.devices.as_ref(), previous, self.audio).await {
                    Ok(stream) => {
                        self.attach(stream);
                        Err(CaptureError::SwitchFailed {
                            requested,
                            source: switch_error,
                        })
                    }
                    Err(restore_error) => {
                        error!(
                            "Could not restore {} camera for {}: {}",
                            previous, self.id, restore_error
                        );
                        Err(CaptureError::CameraUnavailable(restore_error))
                    }
                }
            }
        }
    }

    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        let stream = self
            .stream
            .as_ref()
            .and_then(|g| g.stream())
            .ok_or(CaptureError::NoActiveStream)?;

        self.recorder.start(stream).await?;
        self.refresh_preview();

        Ok(())
    }

    pub async fn stop_recording(&mut self) -> Result<RecorderStatus, CaptureError> {
        let status = self.recorder.stop().await?;
        self.refresh_preview();
        Ok(status)
    }

    /// Turn the stopped recording into a finished file, keeping the session open
    pub fn finalize(&mut self) -> Result<FinalizedRecording, CaptureError> {
        let recording = self.recorder.finalize()?;
        self.refresh_preview();
        Ok(recording)
    }

    /// Drop the stopped recording; the camera keeps running
    pub fn discard(&mut self) -> Result<(), CaptureError> {
        self.recorder.discard()?;
        self.refresh_preview();
        info!("Recording discarded in {}", self.id);
        Ok(())
    }

    /// Attach the stopped recording to `attachments` and close the session
    ///
    /// The session is closed whether or not finalizing succeeds. Returns the
    /// index of the new attachment.
    pub fn accept(mut self, attachments: &mut AttachmentList) -> Result<usize, CaptureError> {
        let result = self.recorder.finalize().map(|recording| {
            let file_name = recording.file_name().to_string();
            let index = attachments.push(recording.into_attachment());
            info!("Attached {} to form as video #{}", file_name, index);
            index
        });

        self.release();
        result
    }

    /// Close the modal, discarding any in-progress or stopped recording
    pub fn close(mut self) {
        self.release();
        info!("Capture session {} closed", self.id);
    }

    fn attach(&mut self, stream: StreamGuard) {
        self.stream = Some(stream);
        self.refresh_preview();
    }

    /// A stopped recording stays on screen until it is accepted or discarded
    fn refresh_preview(&mut self) {
        if self.recorder.phase() == RecorderPhase::Stopped {
            let status = self.recorder.status();
            self.preview.show_playback(status.chunks, status.bytes);
            return;
        }

        match &self.stream {
            Some(stream) => self.preview.attach_live(stream.id()),
            None => self.preview.detach(),
        }
    }

    fn release_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.release();
        }
        self.refresh_preview();
    }

    fn release(&mut self) {
        self.recorder.abort();
        self.release_stream();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.stream.is_some() {
            debug!("Capture session {} dropped while open", self.id);
        }
        self.release();
    }
}

async fn acquire_with_fallback(
    devices: &dyn MediaDevices,
    facing_mode: FacingMode,
    audio: bool,
) -> Result<StreamGuard, DeviceError> {
    match devices
        .acquire(StreamConstraints::facing(facing_mode, audio))
        .await
    {
        Ok(stream) => Ok(StreamGuard::new(stream)),
        Err(e) => {
            debug!("{} camera unavailable ({}), trying any camera", facing_mode, e);
            let stream = devices.acquire(StreamConstraints::any(audio)).await?;
            Ok(StreamGuard::new(stream))
        }
    }
}
