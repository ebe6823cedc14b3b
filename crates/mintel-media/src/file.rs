//! Raw media file handles.

use std::path::Path;

use bytes::Bytes;

use crate::error::{MediaError, MediaResult};

/// Media type used when the declared type is unknown.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// A user's raw file: bytes plus declared media type.
#[derive(Debug, Clone)]
pub struct MediaFile {
    /// Original file name, for logging only
    pub name: String,
    /// Declared media type (e.g. `video/mp4`)
    pub media_type: String,
    /// File contents
    pub bytes: Bytes,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its media type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, guess_media_type(path), bytes))
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the declared type is a video type.
    pub fn is_video(&self) -> bool {
        self.media_type.starts_with("video/")
    }

    /// Reject files the analyzer cannot meaningfully process.
    ///
    /// An unknown (`application/octet-stream`) type is accepted and left to
    /// the engine to recognize.
    pub fn validate(&self) -> MediaResult<()> {
        if self.is_empty() {
            return Err(MediaError::InvalidVideo(format!("{} is empty", self.name)));
        }
        if !self.is_video() && self.media_type != UNKNOWN_MEDIA_TYPE {
            return Err(MediaError::UnsupportedFormat(self.media_type.clone()));
        }
        Ok(())
    }
}

/// Media type for common video container extensions.
pub fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" => "video/mp4",
        "m4v" => "video/x-m4v",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mpg" | "mpeg" => "video/mpeg",
        "ts" => "video/mp2t",
        "3gp" => "video/3gpp",
        "ogv" => "video/ogg",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        _ => UNKNOWN_MEDIA_TYPE,
    }
}
