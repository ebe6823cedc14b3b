#![deny(unreachable_patterns)]
//! FFmpeg-backed media intelligence analyzer.
//!
//! This crate provides:
//! - A caller-owned, lazily loaded media engine with a private workspace
//! - A versioned grammar for FFmpeg's diagnostic trace
//! - Metadata probing and scene segmentation over a staged input
//! - Progress reporting with removable listeners
//! - A queued, bounded, cancellable analysis orchestrator

pub mod analyzer;
pub mod command;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod file;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod scene;
pub mod stager;

#[cfg(test)]
mod testing;

pub use analyzer::{CancelSignal, MediaAnalyzer};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use config::AnalyzerConfig;
pub use engine::{
    EngineBackend, EngineEvent, EngineInfo, EngineState, FfmpegBackend, MediaEngine, RunPermit,
};
pub use error::{MediaError, MediaResult};
pub use file::MediaFile;
pub use logging::RunLogger;
pub use probe::{probe_metadata, ProbeField, ProbeReport};
pub use progress::{to_percent, ProgressCallback, ProgressReporter, ProgressSubscription};
pub use scene::{build_scenes, detect_scenes, SceneDetectionConfig};
pub use stager::{stage, unstage, INPUT_NAME};

pub use mintel_models::{
    AnalysisStage, AudioIntelligence, MediaIntelligence, SceneInfo, VideoMetadata,
    VisualIntelligence,
};
