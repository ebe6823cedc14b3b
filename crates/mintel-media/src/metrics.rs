//! Analysis metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder.

use metrics::{counter, gauge, histogram};

use mintel_models::AnalysisStage;

use crate::error::MediaError;

/// Metric names as constants for consistency.
pub mod names {
    // Engine metrics
    pub const ENGINE_LOADS_TOTAL: &str = "mintel_engine_loads_total";
    pub const ENGINE_LOAD_DURATION_SECONDS: &str = "mintel_engine_load_duration_seconds";

    // Run metrics
    pub const RUNS_STARTED_TOTAL: &str = "mintel_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "mintel_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "mintel_runs_failed_total";
    pub const RUNS_QUEUED: &str = "mintel_runs_queued";
    pub const STAGE_DURATION_SECONDS: &str = "mintel_stage_duration_seconds";

    // Result metrics
    pub const SCENES_DETECTED: &str = "mintel_scenes_detected";
    pub const PROBE_MISSES_TOTAL: &str = "mintel_probe_misses_total";
}

/// Record an engine load attempt.
pub fn record_engine_load(success: bool, duration_secs: f64) {
    let labels = [("result", if success { "ok" } else { "error" }.to_string())];
    counter!(names::ENGINE_LOADS_TOTAL, &labels).increment(1);
    histogram!(names::ENGINE_LOAD_DURATION_SECONDS).record(duration_secs);
}

/// Record a run entering the queue.
pub fn record_run_started() {
    counter!(names::RUNS_STARTED_TOTAL).increment(1);
}

/// Update the number of runs waiting for the engine.
pub fn set_runs_queued(count: usize) {
    gauge!(names::RUNS_QUEUED).set(count as f64);
}

/// Record a completed run.
pub fn record_run_completed(scene_count: usize) {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
    histogram!(names::SCENES_DETECTED).record(scene_count as f64);
}

/// Record a failed run.
pub fn record_run_failed(stage: AnalysisStage, error: &MediaError) {
    let labels = [
        ("stage", stage.as_str().to_string()),
        ("error", error_kind(error).to_string()),
    ];
    counter!(names::RUNS_FAILED_TOTAL, &labels).increment(1);
}

/// Record how long a stage took.
pub fn record_stage_duration(stage: AnalysisStage, duration_secs: f64) {
    let labels = [("stage", stage.as_str().to_string())];
    histogram!(names::STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record probe fields that fell back to defaults.
pub fn record_probe_misses(count: usize) {
    if count > 0 {
        counter!(names::PROBE_MISSES_TOTAL).increment(count as u64);
    }
}

/// Low-cardinality label for an error.
pub fn error_kind(error: &MediaError) -> &'static str {
    match error {
        MediaError::EngineNotFound | MediaError::EngineLoad(_) => "engine_load",
        MediaError::EngineNotLoaded => "engine_not_loaded",
        MediaError::FfmpegFailed { .. } => "ffmpeg",
        MediaError::ProbeFailed(_) => "probe_failed",
        MediaError::ProbeMiss(_) => "probe_miss",
        MediaError::SceneDetection(_) => "scene_detection",
        MediaError::AnalysisTimedOut { .. } => "timeout",
        MediaError::Cancelled => "cancelled",
        MediaError::InvalidVideo(_) | MediaError::UnsupportedFormat(_) => "invalid_input",
        MediaError::SecurityViolation(_) => "security",
        MediaError::Io(_) => "io",
        MediaError::Json(_) => "json",
        MediaError::Internal(_) => "internal",
    }
}
