//! Metadata probe.
//!
//! Runs one engine command that decodes nothing (`-t 0`) but still makes
//! FFmpeg print its container and stream description, and scrapes that
//! trace for duration, dimensions and audio presence.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use mintel_models::VideoMetadata;

use crate::command::FfmpegCommand;
use crate::diagnostics;
use crate::engine::{EngineEvent, MediaEngine};
use crate::error::{MediaError, MediaResult};
use crate::stager::INPUT_NAME;

/// A metadata field the probe could not find in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeField {
    Duration,
    Dimensions,
}

impl fmt::Display for ProbeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeField::Duration => f.write_str("duration"),
            ProbeField::Dimensions => f.write_str("dimensions"),
        }
    }
}

/// Probe outcome: metadata plus the fields that fell back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub metadata: VideoMetadata,
    pub misses: Vec<ProbeField>,
}

impl ProbeReport {
    /// Whether every field was found.
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }

    /// Fail with [`MediaError::ProbeMiss`] unless every field was found.
    pub fn require_complete(self) -> MediaResult<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(MediaError::ProbeMiss(self.misses))
        }
    }
}

/// Accumulates probe fields from diagnostic lines; first match wins.
#[derive(Debug, Default)]
pub(crate) struct MetadataCollector {
    duration: Option<f64>,
    dimensions: Option<(u32, u32)>,
    saw_stream: bool,
    saw_audio: bool,
}

impl MetadataCollector {
    pub(crate) fn observe(&mut self, line: &str) {
        if self.duration.is_none() {
            self.duration = diagnostics::parse_duration(line);
        }
        if diagnostics::is_stream(line) {
            self.saw_stream = true;
            if self.dimensions.is_none() {
                self.dimensions = diagnostics::parse_video_dimensions(line);
            }
            if diagnostics::is_audio_stream(line) {
                self.saw_audio = true;
            }
        }
    }

    pub(crate) fn finish(self) -> ProbeReport {
        let mut misses = Vec::new();
        if self.duration.is_none() {
            misses.push(ProbeField::Duration);
        }
        if self.dimensions.is_none() {
            misses.push(ProbeField::Dimensions);
        }

        let (width, height) = self.dimensions.unwrap_or((0, 0));
        ProbeReport {
            metadata: VideoMetadata {
                duration: self.duration.unwrap_or(0.0),
                width,
                height,
                // Without any stream description, audio presence is unknown
                has_audio: self.saw_audio || !self.saw_stream,
            },
            misses,
        }
    }
}

/// The probe command over the staged input.
pub fn probe_command() -> FfmpegCommand {
    FfmpegCommand::new(INPUT_NAME).duration(0.0)
}

/// Probe the staged input for metadata.
///
/// Missing fields keep their zero defaults and are reported in
/// [`ProbeReport::misses`]; an engine command failure is an error.
pub async fn probe_metadata(engine: &MediaEngine) -> MediaResult<ProbeReport> {
    let collector = Mutex::new(MetadataCollector::default());

    let observer = |event: EngineEvent| {
        if let EngineEvent::Log(line) = event {
            if let Ok(mut collector) = collector.lock() {
                collector.observe(&line);
            }
        }
    };

    engine
        .exec(&probe_command().build_args(), &observer)
        .await
        .map_err(MediaError::probe_failed)?;

    let report = collector
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .finish();

    for miss in &report.misses {
        warn!(field = %miss, "Probe found no {} in engine trace; defaulting to zero", miss);
    }
    debug!(
        duration = report.metadata.duration,
        width = report.metadata.width,
        height = report.metadata.height,
        has_audio = report.metadata.has_audio,
        "Probe complete"
    );

    Ok(report)
}
