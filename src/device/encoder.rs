use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::stream::{DeviceError, MediaStream};

/// Events emitted by a running encoder, in capture order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// An encoded segment is available (may be empty)
    Chunk(Vec<u8>),
    /// The encoder flushed everything and will emit nothing more
    Stopped,
    /// The encoder failed and will emit nothing more
    Error(String),
}

/// Configuration for the streaming encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Container format of the produced chunks
    pub mime_type: String,
    /// How often the encoder hands out a chunk, in milliseconds
    pub timeslice_ms: u64,
    /// Capacity of the event channel
    pub channel_capacity: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            mime_type: "video/webm".to_string(),
            timeslice_ms: 1000,
            channel_capacity: 100,
        }
    }
}

/// Streaming media encoder bound to one stream
#[async_trait::async_trait]
pub trait MediaEncoder: Send {
    /// Start encoding `stream`
    ///
    /// Returns a channel receiver that will receive chunk and stop events
    async fn start(
        &mut self,
        stream: &dyn MediaStream,
    ) -> Result<mpsc::Receiver<EncoderEvent>, DeviceError>;

    /// Ask the encoder to flush; `EncoderEvent::Stopped` follows the last chunk
    async fn request_stop(&mut self) -> Result<(), DeviceError>;

    fn mime_type(&self) -> &str;

    /// Get encoder name for logging
    fn name(&self) -> &str;
}

/// Creates a fresh encoder for every recording
pub trait EncoderFactory: Send + Sync {
    fn create(&self, config: &EncoderConfig) -> Result<Box<dyn MediaEncoder>, DeviceError>;
}
