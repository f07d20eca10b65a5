use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tracing::{debug, error, info, warn};

use super::recording::FinalizedRecording;
use crate::device::{EncoderConfig, EncoderEvent, EncoderFactory, MediaEncoder, MediaStream};
use crate::error::CaptureError;

/// Which state the recorder is in, without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderPhase {
    Idle,
    Recording,
    Stopped,
}

impl fmt::Display for RecorderPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecorderPhase::Idle => write!(f, "idle"),
            RecorderPhase::Recording => write!(f, "recording"),
            RecorderPhase::Stopped => write!(f, "stopped"),
        }
    }
}

/// Ordered encoded segments of one recording
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    total_bytes: usize,
}

impl ChunkBuffer {
    /// Append a segment. Zero-length segments are ignored.
    pub fn push(&mut self, chunk: Vec<u8>) -> bool {
        if chunk.is_empty() {
            return false;
        }
        self.total_bytes += chunk.len();
        self.chunks.push(chunk);
        true
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Concatenate all segments in arrival order
    pub fn concat(self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.total_bytes);
        for chunk in self.chunks {
            data.extend_from_slice(&chunk);
        }
        data
    }
}

/// Recorder state with the data each state owns
#[derive(Debug, Default, PartialEq, Eq)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording { buffer: ChunkBuffer },
    Stopped { buffer: ChunkBuffer },
}

impl RecorderState {
    pub fn phase(&self) -> RecorderPhase {
        match self {
            RecorderState::Idle => RecorderPhase::Idle,
            RecorderState::Recording { .. } => RecorderPhase::Recording,
            RecorderState::Stopped { .. } => RecorderPhase::Stopped,
        }
    }

    pub fn buffer(&self) -> Option<&ChunkBuffer> {
        match self {
            RecorderState::Idle => None,
            RecorderState::Recording { buffer } | RecorderState::Stopped { buffer } => Some(buffer),
        }
    }

    /// `Idle -> Recording` with an empty buffer
    pub fn start(&mut self) -> Result<(), CaptureError> {
        match self {
            RecorderState::Idle => {
                *self = RecorderState::Recording {
                    buffer: ChunkBuffer::default(),
                };
                Ok(())
            }
            other => Err(CaptureError::invalid(other.phase(), "start recording")),
        }
    }

    /// Append a chunk; only valid while recording
    pub fn append(&mut self, chunk: Vec<u8>) -> Result<bool, CaptureError> {
        match self {
            RecorderState::Recording { buffer } => Ok(buffer.push(chunk)),
            other => Err(CaptureError::invalid(other.phase(), "append chunk")),
        }
    }

    /// `Recording -> Stopped`
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        match std::mem::take(self) {
            RecorderState::Recording { buffer } => {
                *self = RecorderState::Stopped { buffer };
                Ok(())
            }
            other => {
                let phase = other.phase();
                *self = other;
                Err(CaptureError::invalid(phase, "stop recording"))
            }
        }
    }

    /// `Stopped -> Idle`, handing out the buffered data
    ///
    /// An empty recording is rejected and the state stays `Stopped`.
    pub fn take_recording(&mut self) -> Result<ChunkBuffer, CaptureError> {
        match std::mem::take(self) {
            RecorderState::Stopped { buffer } if buffer.is_empty() => {
                *self = RecorderState::Stopped { buffer };
                Err(CaptureError::EmptyRecording)
            }
            RecorderState::Stopped { buffer } => Ok(buffer),
            other => {
                let phase = other.phase();
                *self = other;
                Err(CaptureError::invalid(phase, "finalize recording"))
            }
        }
    }

    /// `Stopped -> Idle`, dropping the buffered data
    pub fn discard(&mut self) -> Result<(), CaptureError> {
        match std::mem::take(self) {
            RecorderState::Stopped { .. } => Ok(()),
            other => {
                let phase = other.phase();
                *self = other;
                Err(CaptureError::invalid(phase, "discard recording"))
            }
        }
    }

    /// Back to `Idle` from anywhere, dropping any data
    pub fn reset(&mut self) {
        *self = RecorderState::Idle;
    }
}

/// Snapshot of the recorder for status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderStatus {
    pub phase: RecorderPhase,
    pub chunks: usize,
    pub bytes: usize,
}

struct ActiveEncoder {
    encoder: Box<dyn MediaEncoder>,
    events: mpsc::Receiver<EncoderEvent>,
}

const ENCODER_HUNG_UP: &str = "encoder closed before the recording stopped";

/// Drives one encoder per recording and collects its chunks
pub struct Recorder {
    state: RecorderState,
    encoders: Arc<dyn EncoderFactory>,
    config: EncoderConfig,
    active: Option<ActiveEncoder>,
}

impl Recorder {
    pub fn new(encoders: Arc<dyn EncoderFactory>, config: EncoderConfig) -> Self {
        Self {
            state: RecorderState::Idle,
            encoders,
            config,
            active: None,
        }
    }

    pub fn phase(&self) -> RecorderPhase {
        self.state.phase()
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    pub fn status(&self) -> RecorderStatus {
        let (chunks, bytes) = self
            .state
            .buffer()
            .map(|b| (b.len(), b.total_bytes()))
            .unwrap_or((0, 0));

        RecorderStatus {
            phase: self.phase(),
            chunks,
            bytes,
        }
    }

    /// Start a new recording of `stream`
    pub async fn start(&mut self, stream: &dyn MediaStream) -> Result<(), CaptureError> {
        if self.phase() != RecorderPhase::Idle {
            return Err(CaptureError::invalid(self.phase(), "start recording"));
        }
        if stream.live_tracks() == 0 {
            return Err(CaptureError::NoActiveStream);
        }

        let mut encoder = self
            .encoders
            .create(&self.config)
            .map_err(|e| CaptureError::Encoder(e.to_string()))?;

        let events = encoder
            .start(stream)
            .await
            .map_err(|e| CaptureError::Encoder(e.to_string()))?;

        self.state.start()?;

        info!(
            "Recording started on {} ({} via {})",
            stream.id(),
            encoder.mime_type(),
            encoder.name()
        );

        self.active = Some(ActiveEncoder { encoder, events });

        Ok(())
    }

    /// Pull every chunk the encoder has already delivered
    ///
    /// Returns the number of non-empty chunks appended.
    pub fn drain_available(&mut self) -> Result<usize, CaptureError> {
        let mut appended = 0;

        loop {
            let event = match self.active.as_mut() {
                Some(active) => match active.events.try_recv() {
                    Ok(event) => event,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        return Err(self.fail(ENCODER_HUNG_UP.to_string()))
                    }
                },
                None => break,
            };

            match event {
                EncoderEvent::Chunk(chunk) => {
                    if self.state.append(chunk)? {
                        appended += 1;
                    }
                }
                EncoderEvent::Stopped => {
                    warn!("Encoder stopped on its own; recording ends here");
                    self.active = None;
                    self.state.stop()?;
                    break;
                }
                EncoderEvent::Error(message) => return Err(self.fail(message)),
            }
        }

        Ok(appended)
    }

    /// Flush the encoder and wait for its stop event
    pub async fn stop(&mut self) -> Result<RecorderStatus, CaptureError> {
        if self.phase() != RecorderPhase::Recording {
            return Err(CaptureError::invalid(self.phase(), "stop recording"));
        }

        if let Some(mut active) = self.active.take() {
            if let Err(e) = active.encoder.request_stop().await {
                warn!("Encoder stop request failed: {}", e);
            }

            let mut saw_stop = false;
            while let Some(event) = active.events.recv().await {
                match event {
                    EncoderEvent::Chunk(chunk) => {
                        self.state.append(chunk)?;
                    }
                    EncoderEvent::Stopped => {
                        saw_stop = true;
                        break;
                    }
                    EncoderEvent::Error(message) => return Err(self.fail(message)),
                }
            }

            // A closed channel without a stop event means chunks may be missing
            if !saw_stop {
                return Err(self.fail(ENCODER_HUNG_UP.to_string()));
            }
        }

        self.state.stop()?;

        let status = self.status();
        info!(
            "Recording stopped: {} chunks, {} bytes",
            status.chunks, status.bytes
        );

        Ok(status)
    }

    /// Concatenate the stopped recording into one immutable object
    pub fn finalize(&mut self) -> Result<FinalizedRecording, CaptureError> {
        let buffer = self.state.take_recording()?;
        let recording = FinalizedRecording::new(buffer.concat(), &self.config.mime_type);

        info!(
            "Finalized {} ({} bytes)",
            recording.file_name(),
            recording.size()
        );

        Ok(recording)
    }

    /// Drop the stopped recording and return to idle
    pub fn discard(&mut self) -> Result<(), CaptureError> {
        self.state.discard()?;
        debug!("Recording discarded");
        Ok(())
    }

    /// Abandon whatever is in progress. Dropping the encoder ends its task.
    pub fn abort(&mut self) {
        if self.active.take().is_some() {
            debug!("In-progress recording abandoned");
        }
        self.state.reset();
    }

    fn fail(&mut self, message: String) -> CaptureError {
        error!("Encoder failed mid-recording: {}", message);
        self.abort();
        CaptureError::Encoder(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_chunks_are_ignored() {
        let mut buffer = ChunkBuffer::default();

        assert!(buffer.push(vec![1, 2]));
        assert!(!buffer.push(Vec::new()));
        assert!(buffer.push(vec![3]));

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.total_bytes(), 3);
        assert_eq!(buffer.concat(), vec![1, 2, 3]);
    }

    #[test]
    fn stop_from_idle_is_rejected() {
        let mut state = RecorderState::Idle;

        let err = state.stop().unwrap_err();

        assert_eq!(
            err,
            CaptureError::InvalidTransition {
                state: RecorderPhase::Idle,
                action: "stop recording"
            }
        );
        assert_eq!(state, RecorderState::Idle);
    }

    #[test]
    fn start_twice_keeps_existing_buffer() {
        let mut state = RecorderState::Idle;
        state.start().unwrap();
        state.append(vec![9; 4]).unwrap();

        assert!(state.start().is_err());
        assert_eq!(state.buffer().map(|b| b.total_bytes()), Some(4));
    }

    #[test]
    fn empty_recording_stays_stopped() {
        let mut state = RecorderState::Idle;
        state.start().unwrap();
        state.append(Vec::new()).unwrap();
        state.stop().unwrap();

        assert_eq!(state.take_recording(), Err(CaptureError::EmptyRecording));
        assert_eq!(state.phase(), RecorderPhase::Stopped);

        state.discard().unwrap();
        assert_eq!(state.phase(), RecorderPhase::Idle);
    }
}
