use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

use crate::capture::CaptureOptions;
use crate::device::{EncoderConfig, FacingMode};
use crate::form::UploadPaths;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub capture: CaptureConfig,
    pub backend: BackendConfig,
    pub uploads: UploadPaths,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "listing-capture".to_string(),
            http: HttpConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8085,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera requested first when a capture modal opens
    pub facing_mode: FacingMode,
    /// Also capture the microphone
    pub audio: bool,
    pub mime_type: String,
    pub timeslice_ms: u64,
    pub channel_capacity: usize,
    /// Size of each chunk produced by the synthetic encoder
    pub synthetic_chunk_bytes: usize,
    /// Close HTTP capture sessions untouched for this long; 0 keeps them open
    pub idle_timeout_secs: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let encoder = EncoderConfig::default();
        Self {
            facing_mode: FacingMode::Environment,
            audio: true,
            mime_type: encoder.mime_type,
            timeslice_ms: encoder.timeslice_ms,
            channel_capacity: encoder.channel_capacity,
            synthetic_chunk_bytes: 64 * 1024,
            idle_timeout_secs: 300,
        }
    }
}

impl CaptureConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn options(&self) -> CaptureOptions {
        CaptureOptions {
            facing_mode: self.facing_mode,
            audio: self.audio,
            encoder: EncoderConfig {
                mime_type: self.mime_type.clone(),
                timeslice_ms: self.timeslice_ms,
                channel_capacity: self.channel_capacity,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            access_token: None,
            timeout_secs: 60,
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load `path` (any format the `config` crate knows, optional) and
    /// `LISTING_CAPTURE__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("LISTING_CAPTURE")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load config from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = Config::load("/nonexistent/listing-capture").unwrap();

        assert_eq!(cfg.service.http.port, 8085);
        assert_eq!(cfg.capture.facing_mode, FacingMode::Environment);
        assert_eq!(cfg.uploads.videos, "machines/videos");
        assert_eq!(cfg.capture.idle_timeout(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[capture]\nfacing_mode = \"user\"\ntimeslice_ms = 250\nidle_timeout_secs = 0\n\n[backend]\nbase_url = \"https://api.example.test\""
        )
        .unwrap();

        let path = file.path().to_string_lossy().to_string();
        let cfg = Config::load(&path).unwrap();

        assert_eq!(cfg.capture.facing_mode, FacingMode::User);
        assert_eq!(cfg.capture.options().encoder.timeslice_ms, 250);
        assert_eq!(cfg.capture.mime_type, "video/webm");
        assert_eq!(cfg.capture.idle_timeout(), None);
        assert_eq!(cfg.backend.base_url, "https://api.example.test");
    }
}
