use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// A file-like payload ready to upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    file_name: String,
    mime_type: String,
    data: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Load a pre-recorded file from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read attachment: {:?}", path))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Attachment path has no file name: {:?}", path))?;

        let mime_type = mime_for_path(path);

        info!("Loaded attachment {} ({}, {} bytes)", file_name, mime_type, data.len());

        Ok(Self::new(file_name, mime_type, data))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "webm" => "video/webm",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// Attachment metadata without the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSummary {
    pub index: usize,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Ordered attachments owned by a form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentList {
    items: Vec<Attachment>,
}

impl AttachmentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the new attachment's index
    pub fn push(&mut self, attachment: Attachment) -> usize {
        self.items.push(attachment);
        self.items.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&Attachment> {
        self.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total_bytes(&self) -> usize {
        self.items.iter().map(Attachment::size).sum()
    }

    pub fn summaries(&self) -> Vec<AttachmentSummary> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, a)| AttachmentSummary {
                index,
                file_name: a.file_name.clone(),
                mime_type: a.mime_type.clone(),
                size_bytes: a.size(),
            })
            .collect()
    }
}
