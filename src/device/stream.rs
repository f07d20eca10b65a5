use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Which camera the user prefers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    /// Front camera, facing the user
    User,
    /// Back camera, facing away from the user
    #[default]
    Environment,
}

impl FacingMode {
    pub fn flipped(self) -> Self {
        match self {
            FacingMode::User => FacingMode::Environment,
            FacingMode::Environment => FacingMode::User,
        }
    }
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::User => write!(f, "user"),
            FacingMode::Environment => write!(f, "environment"),
        }
    }
}

/// Constraints passed to a stream acquisition request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    /// Requested camera; `None` accepts any available camera
    pub facing_mode: Option<FacingMode>,
    /// Whether a microphone track is requested alongside video
    pub audio: bool,
}

impl StreamConstraints {
    pub fn facing(mode: FacingMode, audio: bool) -> Self {
        Self {
            facing_mode: Some(mode),
            audio,
        }
    }

    pub fn any(audio: bool) -> Self {
        Self {
            facing_mode: None,
            audio,
        }
    }
}

/// Failures reported by a device or encoder backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no matching device: {0}")]
    NotFound(String),

    #[error("device busy: {0}")]
    Busy(String),

    #[error("stream has no live tracks")]
    Inactive,

    #[error("encoder error: {0}")]
    Encoder(String),
}

/// Live audio/video tracks from a capture device
pub trait MediaStream: Send + Sync + fmt::Debug {
    /// Backend-assigned stream identifier
    fn id(&self) -> &str;

    /// Camera the stream actually came from, if known
    fn facing_mode(&self) -> Option<FacingMode>;

    /// Number of tracks still delivering media
    fn live_tracks(&self) -> usize;

    /// Stop every track. Calling it twice is a no-op.
    fn stop_all(&mut self);
}

/// Camera/microphone acquisition backend
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a new stream matching `constraints`
    async fn acquire(
        &self,
        constraints: StreamConstraints,
    ) -> Result<Box<dyn MediaStream>, DeviceError>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Owns a stream and stops all of its tracks when dropped
#[derive(Debug)]
pub struct StreamGuard {
    stream: Option<Box<dyn MediaStream>>,
}

impl StreamGuard {
    pub fn new(stream: Box<dyn MediaStream>) -> Self {
        Self {
            stream: Some(stream),
        }
    }

    pub fn stream(&self) -> Option<&dyn MediaStream> {
        self.stream.as_deref()
    }

    pub fn id(&self) -> &str {
        self.stream.as_deref().map(|s| s.id()).unwrap_or_default()
    }

    pub fn live_tracks(&self) -> usize {
        self.stream.as_deref().map(|s| s.live_tracks()).unwrap_or(0)
    }

    /// Stop the stream now instead of at end of scope
    pub fn release(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all();
            debug!("Released stream {}", stream.id());
        }
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.stop();
    }
}
