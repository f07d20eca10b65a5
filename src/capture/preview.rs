use serde::{Deserialize, Serialize};

/// What the capture modal is currently showing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewSurface {
    /// Nothing attached
    #[default]
    Detached,
    /// Live camera feed
    Live { stream_id: String },
    /// The stopped, not yet accepted recording
    Playback { chunks: usize, bytes: usize },
}

impl PreviewSurface {
    pub fn attach_live(&mut self, stream_id: &str) {
        *self = PreviewSurface::Live {
            stream_id: stream_id.to_string(),
        };
    }

    pub fn show_playback(&mut self, chunks: usize, bytes: usize) {
        *self = PreviewSurface::Playback { chunks, bytes };
    }

    pub fn detach(&mut self) {
        *self = PreviewSurface::Detached;
    }

    pub fn is_live(&self) -> bool {
        matches!(self, PreviewSurface::Live { .. })
    }
}
