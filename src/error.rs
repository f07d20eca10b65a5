//! Error types for the capture flow and listing submission

use thiserror::Error;

use crate::capture::RecorderPhase;
use crate::device::{DeviceError, FacingMode};

/// Errors raised by a capture session and its recorder
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Permission or hardware denial while opening; the session never opens
    #[error("could not access camera: {0}")]
    CameraUnavailable(#[source] DeviceError),

    /// Switching failed; the previous camera is still running
    #[error("could not switch to the {requested} camera, using current camera: {source}")]
    SwitchFailed {
        requested: FacingMode,
        #[source]
        source: DeviceError,
    },

    #[error("cannot {action} while recorder is {state}")]
    InvalidTransition {
        state: RecorderPhase,
        action: &'static str,
    },

    #[error("no active camera stream")]
    NoActiveStream,

    /// The encoder failed mid-recording; the partial recording was dropped
    #[error("recording failed: {0}")]
    Encoder(String),

    #[error("recording contains no data")]
    EmptyRecording,
}

impl CaptureError {
    pub(crate) fn invalid(state: RecorderPhase, action: &'static str) -> Self {
        Self::InvalidTransition { state, action }
    }
}

/// Errors raised while submitting a listing form
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("you must be signed in to create a listing")]
    NotAuthenticated,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("please upload both {0}")]
    MissingAttachment(&'static str),

    /// Attachments stay on the form so the user can retry
    #[error("failed to upload {file_name} to {destination}: {message}")]
    Upload {
        file_name: String,
        destination: String,
        message: String,
    },

    #[error("backend rejected the listing: {0}")]
    Backend(String),
}
