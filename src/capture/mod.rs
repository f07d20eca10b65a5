//! In-browser style video capture
//!
//! This module provides the pieces behind the "record a video" modal:
//! - `CaptureSession`: owns the camera stream for the lifetime of the modal
//! - `Recorder`: idle/recording/stopped state machine over an encoder
//! - `FinalizedRecording`: the concatenated, named result
//! - `PreviewSurface`: what the modal displays

mod preview;
mod recorder;
mod recording;
mod session;

pub use preview::PreviewSurface;
pub use recorder::{ChunkBuffer, Recorder, RecorderPhase, RecorderState, RecorderStatus};
pub use recording::FinalizedRecording;
pub use session::{CaptureOptions, CaptureSession, CaptureStatus};
