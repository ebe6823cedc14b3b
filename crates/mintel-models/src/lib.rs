//! Shared data models for media intelligence.
//!
//! This crate provides Serde-serializable types for:
//! - Container and video stream metadata
//! - Detected scene segments
//! - The composed `MediaIntelligence` record attached to uploads
//! - Per-run analysis stages

pub mod analysis;
pub mod intelligence;
pub mod scene;
pub mod video;

// Re-export common types
pub use analysis::AnalysisStage;
pub use intelligence::{average_shot_length, AudioIntelligence, MediaIntelligence, VisualIntelligence};
pub use scene::SceneInfo;
pub use video::VideoMetadata;
