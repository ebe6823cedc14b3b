//! The composed media intelligence record.
//!
//! `MediaIntelligence` is the single artifact produced by an analysis run.
//! It is serialized to JSON and attached as a form field next to the
//! uploaded file, so job configuration and previews can be pre-populated
//! without a server round-trip.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scene::SceneInfo;
use crate::video::VideoMetadata;

/// Placeholder integrated loudness (LUFS).
pub const PLACEHOLDER_LUFS: f64 = -14.0;

/// Placeholder true peak (dBTP).
pub const PLACEHOLDER_PEAK: f64 = -1.0;

/// Mean scene length over the whole clip, `None` when there are no scenes.
///
/// Divides the full duration rather than summing scene lengths, so gaps
/// left by dropped short candidates still count toward the mean.
pub fn average_shot_length(duration: f64, scenes: &[SceneInfo]) -> Option<f64> {
    if scenes.is_empty() {
        None
    } else {
        Some(duration / scenes.len() as f64)
    }
}

/// Visual half of the record: metadata plus scene segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VisualIntelligence {
    /// Probed container/stream metadata
    pub metadata: VideoMetadata,
    /// Detected scenes, ordered by start time
    pub scenes: Vec<SceneInfo>,
    /// `metadata.duration / scenes.len()`, or `None` when no scenes
    pub avg_shot_length: Option<f64>,
}

impl VisualIntelligence {
    /// Build the visual block, deriving the average shot length.
    pub fn new(metadata: VideoMetadata, scenes: Vec<SceneInfo>) -> Self {
        let avg_shot_length = average_shot_length(metadata.duration, &scenes);

        Self {
            metadata,
            scenes,
            avg_shot_length,
        }
    }

    /// Number of detected scenes.
    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }
}

/// Audio loudness slot.
///
/// Loudness is not measured yet; the values are constants reserved for a
/// future measurement so consumers can already rely on the shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AudioIntelligence {
    /// Integrated loudness in LUFS
    pub overall_lufs: f64,
    /// True peak in dBTP
    pub overall_peak: f64,
    /// Whether the track should be loudness-normalized before use
    pub needs_normalization: bool,
}

impl AudioIntelligence {
    /// The constant placeholder values.
    pub fn placeholder() -> Self {
        Self {
            overall_lufs: PLACEHOLDER_LUFS,
            overall_peak: PLACEHOLDER_PEAK,
            needs_normalization: false,
        }
    }
}

impl Default for AudioIntelligence {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Everything derived from a raw video before upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaIntelligence {
    pub visual: VisualIntelligence,
    pub audio: AudioIntelligence,
}

impl MediaIntelligence {
    /// Compose a record from probed metadata and detected scenes.
    pub fn new(metadata: VideoMetadata, scenes: Vec<SceneInfo>) -> Self {
        Self {
            visual: VisualIntelligence::new(metadata, scenes),
            audio: AudioIntelligence::placeholder(),
        }
    }

    /// Serialize for attachment as a multipart form field.
    pub fn to_form_field(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(duration: f64) -> VideoMetadata {
        VideoMetadata {
            duration,
            width: 1920,
            height: 1080,
            has_audio: true,
        }
    }

    #[test]
    fn test_avg_shot_length() {
        let scenes = vec![
            SceneInfo::new(1, 0.0, 10.0),
            SceneInfo::new(2, 10.3, 60.0),
            SceneInfo::new(3, 60.0, 120.0),
        ];
        let visual = VisualIntelligence::new(meta(120.0), scenes);
        assert_eq!(visual.avg_shot_length, Some(40.0));
        assert_eq!(visual.scene_count(), 3);
    }

    #[test]
    fn test_avg_shot_length_none_without_scenes() {
        let visual = VisualIntelligence::new(meta(0.0), Vec::new());
        assert_eq!(visual.avg_shot_length, None);
    }

    #[test]
    fn test_form_field_shape() {
        let record = MediaIntelligence::new(meta(45.0), vec![SceneInfo::new(1, 0.0, 45.0)]);
        let json: serde_json::Value =
            serde_json::from_str(&record.to_form_field().unwrap()).unwrap();

        assert_eq!(json["visual"]["metadata"]["width"], 1920);
        assert_eq!(json["visual"]["metadata"]["has_audio"], true);
        assert_eq!(json["visual"]["scenes"][0]["scene_number"], 1);
        assert_eq!(json["visual"]["avg_shot_length"], 45.0);
        assert_eq!(json["audio"]["overall_lufs"], -14.0);
        assert_eq!(json["audio"]["needs_normalization"], false);
    }

    #[test]
    fn test_null_avg_shot_length_serializes() {
        let record = MediaIntelligence::new(meta(0.0), Vec::new());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["visual"]["avg_shot_length"].is_null());
    }
}
