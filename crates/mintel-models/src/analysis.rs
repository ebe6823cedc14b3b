//! Analysis run stages.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stage of a single analysis run.
///
/// A run moves strictly forward through
/// `Idle -> Staging -> Probing -> Segmenting -> Complete`. Any stage may
/// instead end in `Failed`, which short-circuits the remaining stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Run created, engine not yet confirmed loaded
    #[default]
    Idle,
    /// Copying file bytes into the engine workspace
    Staging,
    /// Reading container duration and stream dimensions
    Probing,
    /// Running scene-change detection
    Segmenting,
    /// Result assembled
    Complete,
    /// A stage rejected; no result is produced
    Failed,
}

impl AnalysisStage {
    /// Returns the stage as a string for display and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Staging => "staging",
            Self::Probing => "probing",
            Self::Segmenting => "segmenting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Returns true if the stage is terminal (complete or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// The stage that follows this one on the success path.
    ///
    /// Terminal stages return themselves.
    pub fn next(&self) -> Self {
        match self {
            Self::Idle => Self::Staging,
            Self::Staging => Self::Probing,
            Self::Probing => Self::Segmenting,
            Self::Segmenting => Self::Complete,
            Self::Complete => Self::Complete,
            Self::Failed => Self::Failed,
        }
    }
}

impl std::fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
