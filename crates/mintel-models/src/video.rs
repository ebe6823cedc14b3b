//! Video metadata models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Structural metadata probed from a video file.
///
/// Zero `duration`, `width` or `height` means the value was not found in the
/// engine's diagnostic trace. Treat zeros as "unknown", not ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    /// Container duration in seconds
    pub duration: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Whether the file carries an audio stream
    pub has_audio: bool,
}

impl Default for VideoMetadata {
    fn default() -> Self {
        Self {
            duration: 0.0,
            width: 0,
            height: 0,
            has_audio: true,
        }
    }
}
