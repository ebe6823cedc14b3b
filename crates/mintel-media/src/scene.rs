//! Scene segmentation.
//!
//! FFmpeg's `select` filter passes only frames whose scene score exceeds the
//! threshold, and `showinfo` prints a `pts_time:` line for each of them. The
//! collected timestamps become scene boundaries.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mintel_models::SceneInfo;

pub use mintel_models::average_shot_length;

use crate::command::FfmpegCommand;
use crate::diagnostics;
use crate::engine::{EngineEvent, MediaEngine};
use crate::error::{MediaError, MediaResult};
use crate::progress::ProgressReporter;
use crate::stager::INPUT_NAME;

/// Default scene-change score threshold (0–1).
pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.3;

/// Default minimum scene length in seconds.
pub const DEFAULT_MIN_SCENE_SECS: f64 = 0.5;

/// Scene detection settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneDetectionConfig {
    /// Scene score a frame must exceed to start a new scene.
    /// Lower values detect more (weaker) cuts.
    pub threshold: f64,
    /// Candidates this short or shorter are dropped
    pub min_scene_duration: f64,
}

impl Default for SceneDetectionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SCENE_THRESHOLD,
            min_scene_duration: DEFAULT_MIN_SCENE_SECS,
        }
    }
}

impl SceneDetectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the threshold, clamped into `0..=1`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        if threshold.is_finite() {
            self.threshold = threshold.clamp(0.0, 1.0);
        }
        self
    }

    /// Set the minimum scene length; negative values become zero.
    pub fn with_min_scene_duration(mut self, secs: f64) -> Self {
        if secs.is_finite() {
            self.min_scene_duration = secs.max(0.0);
        }
        self
    }
}

/// The scene detection command over the staged input.
pub fn scene_command(threshold: f64) -> FfmpegCommand {
    FfmpegCommand::new(INPUT_NAME)
        .video_filter(format!("select='gt(scene,{})',showinfo", threshold))
        .no_audio()
        .with_progress()
}

/// Turn scene-change timestamps into scenes covering `[0, duration]`.
///
/// Boundaries are `0`, every finite non-negative timestamp, and `duration`
/// when it lies past the last timestamp. Consecutive boundaries form a scene
/// only when they are more than `min_scene_duration` apart; shorter
/// candidates are dropped, not merged.
pub fn build_scenes(timestamps: &[f64], duration: f64, min_scene_duration: f64) -> Vec<SceneInfo> {
    let mut boundaries = Vec::with_capacity(timestamps.len() + 2);
    boundaries.push(0.0);
    boundaries.extend(
        timestamps
            .iter()
            .copied()
            .filter(|t| t.is_finite() && *t >= 0.0),
    );

    let last = boundaries.last().copied().unwrap_or(0.0);
    if duration.is_finite() && duration > last {
        boundaries.push(duration);
    }

    boundaries.sort_by(f64::total_cmp);
    boundaries.dedup();

    let mut scenes = Vec::with_capacity(boundaries.len().saturating_sub(1));
    for pair in boundaries.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        if end - start > min_scene_duration {
            scenes.push(SceneInfo::new(scenes.len() as u32 + 1, start, end));
        }
    }
    scenes
}

/// Run scene detection over the staged input.
///
/// Progress fractions go to `progress`; attach a listener to it before
/// calling. Any engine failure fails the whole detection, no partial
/// scene list is returned.
pub async fn detect_scenes(
    engine: &MediaEngine,
    config: &SceneDetectionConfig,
    duration: f64,
    progress: &ProgressReporter,
) -> MediaResult<Vec<SceneInfo>> {
    let timestamps = Mutex::new(Vec::new());

    let observer = |event: EngineEvent| match event {
        EngineEvent::Log(line) => {
            if let Some(t) = diagnostics::parse_pts_time(&line) {
                if let Ok(mut timestamps) = timestamps.lock() {
                    timestamps.push(t);
                }
            }
        }
        EngineEvent::Progress(ratio) => progress.report(ratio),
    };

    let args = scene_command(config.threshold).build_args();
    debug!(threshold = config.threshold, "Running scene detection");
    engine
        .exec(&args, &observer)
        .await
        .map_err(MediaError::scene_detection)?;

    let timestamps = timestamps
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let scenes = build_scenes(&timestamps, duration, config.min_scene_duration);
    debug!(
        cuts = timestamps.len(),
        scenes = scenes.len(),
        "Scene detection complete"
    );

    Ok(scenes)
}
