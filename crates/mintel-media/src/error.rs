//! Error types for media analysis.

use std::time::Duration;

use thiserror::Error;

use mintel_models::AnalysisStage;

use crate::probe::ProbeField;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while loading the engine or analyzing a file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    EngineNotFound,

    #[error("Engine failed to load: {0}")]
    EngineLoad(String),

    #[error("Engine is not loaded")]
    EngineNotLoaded,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Metadata probe failed: {0}")]
    ProbeFailed(#[source] Box<MediaError>),

    #[error("Metadata probe found no match for {0:?}")]
    ProbeMiss(Vec<ProbeField>),

    #[error("Scene detection failed: {0}")]
    SceneDetection(#[source] Box<MediaError>),

    #[error("Analysis timed out in {stage} stage after {timeout:?}")]
    AnalysisTimedOut { stage: AnalysisStage, timeout: Duration },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Security violation: {0}")]
    SecurityViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an engine load error.
    pub fn engine_load(message: impl Into<String>) -> Self {
        Self::EngineLoad(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Wrap an engine command failure raised while probing.
    ///
    /// Lifecycle errors (engine not loaded, cancellation, timeouts) pass
    /// through unchanged.
    pub fn probe_failed(source: MediaError) -> Self {
        if source.is_command_failure() {
            Self::ProbeFailed(Box::new(source))
        } else {
            source
        }
    }

    /// Wrap an engine command failure raised while detecting scenes.
    pub fn scene_detection(source: MediaError) -> Self {
        if source.is_command_failure() {
            Self::SceneDetection(Box::new(source))
        } else {
            source
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    fn is_command_failure(&self) -> bool {
        matches!(
            self,
            MediaError::FfmpegFailed { .. } | MediaError::Io(_) | MediaError::Internal(_)
        )
    }

    /// True for failures of the engine load sequence.
    pub fn is_load_error(&self) -> bool {
        matches!(self, MediaError::EngineNotFound | MediaError::EngineLoad(_))
    }

    /// Check if error is retryable.
    ///
    /// A failed load leaves the engine unloaded, so calling `load()` again is
    /// valid. Timeouts may succeed on a less loaded machine.
    pub fn is_retryable(&self) -> bool {
        self.is_load_error() || matches!(self, MediaError::AnalysisTimedOut { .. })
    }

    /// Stage that produced this error, when it is tied to one.
    pub fn stage(&self) -> Option<AnalysisStage> {
        match self {
            MediaError::ProbeFailed(_) | MediaError::ProbeMiss(_) => Some(AnalysisStage::Probing),
            MediaError::SceneDetection(_) => Some(AnalysisStage::Segmenting),
            MediaError::AnalysisTimedOut { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_failed_wraps_command_errors_only() {
        let err = MediaError::probe_failed(MediaError::ffmpeg_failed("boom", None, Some(1)));
        assert!(matches!(err, MediaError::ProbeFailed(_)));
        assert_eq!(err.stage(), Some(AnalysisStage::Probing));

        let err = MediaError::probe_failed(MediaError::EngineNotLoaded);
        assert!(matches!(err, MediaError::EngineNotLoaded));
    }

    #[test]
    fn test_scene_detection_keeps_cancellation() {
        let err = MediaError::scene_detection(MediaError::Cancelled);
        assert!(matches!(err, MediaError::Cancelled));

        let err = MediaError::scene_detection(MediaError::internal("stderr closed"));
        assert_eq!(err.stage(), Some(AnalysisStage::Segmenting));
        assert!(err.to_string().contains("stderr closed"));
    }

    #[test]
    fn test_retryable() {
        assert!(MediaError::engine_load("network").is_retryable());
        assert!(MediaError::EngineNotFound.is_retryable());
        assert!(MediaError::AnalysisTimedOut {
            stage: AnalysisStage::Segmenting,
            timeout: Duration::from_secs(600)
        }
        .is_retryable());
        assert!(!MediaError::Cancelled.is_retryable());
    }

    #[test]
    fn test_timeout_display() {
        let err = MediaError::AnalysisTimedOut {
            stage: AnalysisStage::Probing,
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "Analysis timed out in probing stage after 30s");

        let err = MediaError::AnalysisTimedOut {
            stage: AnalysisStage::Segmenting,
            timeout: Duration::from_millis(50),
        };
        assert_eq!(err.to_string(), "Analysis timed out in segmenting stage after 50ms");
    }
}
