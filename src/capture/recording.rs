use chrono::{DateTime, Utc};

use crate::form::Attachment;

/// A completed recording, immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedRecording {
    data: Vec<u8>,
    file_name: String,
    mime_type: String,
    captured_at: DateTime<Utc>,
}

impl FinalizedRecording {
    pub fn new(data: Vec<u8>, mime_type: &str) -> Self {
        Self::with_timestamp(data, mime_type, Utc::now())
    }

    /// Build a recording named after its capture time, e.g. `recorded-1700000000000.webm`
    pub fn with_timestamp(data: Vec<u8>, mime_type: &str, captured_at: DateTime<Utc>) -> Self {
        let file_name = format!(
            "recorded-{}.{}",
            captured_at.timestamp_millis(),
            extension_for(mime_type)
        );

        Self {
            data,
            file_name,
            mime_type: mime_type.to_string(),
            captured_at,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Hand the recording over as a form attachment
    pub fn into_attachment(self) -> Attachment {
        Attachment::new(self.file_name, self.mime_type, self.data)
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    // Drop codec parameters such as `video/webm;codecs=vp9`
    let essence = mime_type.split(';').next().unwrap_or_default().trim();
    match essence {
        "video/mp4" => "mp4",
        "video/ogg" => "ogv",
        "video/x-matroska" => "mkv",
        _ => "webm",
    }
}
