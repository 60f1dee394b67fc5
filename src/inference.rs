// File: ./src/inference.rs
//! Contract with the upstream image-to-text service.
//!
//! The network client itself is not part of this crate. Anything that can turn
//! an [`EncodedImage`] into text implements [`TextRecognizer`]; failures are
//! classified into [`InferenceError`] so the caller can pick a message and fall
//! back to [`placeholder_events`].
use crate::model::CalendarEventRecord;
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, NaiveTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An image ready to be shipped to the recognizer as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub file_name: String,
    pub mime_type: String,
    pub data_base64: String,
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

impl EncodedImage {
    pub fn from_bytes(file_name: &str, bytes: &[u8]) -> Self {
        Self {
            file_name: file_name.to_string(),
            mime_type: mime_for(file_name).to_string(),
            data_base64: STANDARD.encode(bytes),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read image {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::from_bytes(&name, &bytes))
    }
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference credentials are not configured")]
    MissingCredentials,
    #[error("could not reach the inference service: {0}")]
    Connectivity(String),
    #[error("inference request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("inference service returned {status}: {message}")]
    Service { status: u16, message: String },
}

impl InferenceError {
    /// Message shown to the person who uploaded the image.
    pub fn user_message(&self) -> &'static str {
        match self {
            InferenceError::MissingCredentials => {
                "Image recognition is not configured. Showing sample events instead."
            }
            InferenceError::Connectivity(_) => {
                "Could not connect to the image recognition service. Check your connection and try again."
            }
            InferenceError::Timeout { .. } => {
                "Image recognition took too long. Try a smaller or clearer image."
            }
            InferenceError::Service { .. } => {
                "The image recognition service had a problem processing this image."
            }
        }
    }
}

pub trait TextRecognizer {
    fn recognize(&self, image: &EncodedImage) -> Result<String, InferenceError>;
}

/// Demo records shown when recognition fails or yields nothing.
pub fn placeholder_events(now: DateTime<Utc>) -> Vec<CalendarEventRecord> {
    let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    vec![
        CalendarEventRecord::new("Sample Event", today)
            .with_time("10:00")
            .with_description("Sample event created because no text could be extracted"),
        CalendarEventRecord::new("Follow-up Meeting", today + Duration::days(1))
            .with_time("14:00")
            .with_description("Edit or delete these sample events before saving"),
    ]
}

/// Reads text that an external OCR step already wrote next to the image:
/// `flyer.png.txt` first, then `flyer.txt`.
#[derive(Debug, Clone)]
pub struct SidecarRecognizer {
    dir: PathBuf,
}

impl SidecarRecognizer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn candidates(&self, file_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![self.dir.join(format!("{}.txt", file_name))];
        if let Some(stem) = Path::new(file_name).file_stem() {
            paths.push(self.dir.join(format!("{}.txt", stem.to_string_lossy())));
        }
        paths
    }
}

impl TextRecognizer for SidecarRecognizer {
    fn recognize(&self, image: &EncodedImage) -> Result<String, InferenceError> {
        let candidates = self.candidates(&image.file_name);
        for path in &candidates {
            if path.exists() {
                log::debug!("Reading sidecar text from {:?}", path);
                return fs::read_to_string(path)
                    .map_err(|e| InferenceError::Connectivity(format!("{:?}: {}", path, e)));
            }
        }
        Err(InferenceError::Connectivity(format!(
            "no sidecar text found for {}",
            image.file_name
        )))
    }
}
