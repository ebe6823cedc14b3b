//! Structured run logging utilities.
//!
//! Provides consistent, structured logging for analysis runs with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

use mintel_models::AnalysisStage;

/// Run logger for structured logging with consistent formatting.
///
/// Every analysis run gets a fresh run ID so interleaved log lines from
/// queued runs can be told apart.
#[derive(Debug, Clone)]
pub struct RunLogger {
    run_id: String,
    operation: String,
}

impl RunLogger {
    /// Create a logger with a new run ID.
    ///
    /// # Arguments
    /// * `operation` - The type of operation (e.g., "analyze", "load")
    pub fn new(operation: &str) -> Self {
        Self::with_run_id(&Uuid::new_v4().to_string(), operation)
    }

    /// Create a logger for an existing run ID.
    pub fn with_run_id(run_id: &str, operation: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a run.
    pub fn log_start(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run started: {}", message
        );
    }

    /// Log a stage transition.
    pub fn log_stage(&self, stage: AnalysisStage) {
        if stage.is_terminal() {
            info!(
                run_id = %self.run_id,
                operation = %self.operation,
                stage = %stage,
                "Run finished: {}", stage
            );
        } else {
            info!(
                run_id = %self.run_id,
                operation = %self.operation,
                stage = %stage,
                "Run stage: {}", stage
            );
        }
    }

    /// Log a warning during the run.
    pub fn log_warning(&self, message: &str) {
        warn!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run warning: {}", message
        );
    }

    /// Log an error during the run.
    pub fn log_error(&self, message: &str) {
        error!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run error: {}", message
        );
    }

    /// Log the completion of a run.
    pub fn log_completion(&self, message: &str) {
        info!(
            run_id = %self.run_id,
            operation = %self.operation,
            "Run completed: {}", message
        );
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "analysis_run",
            run_id = %self.run_id,
            operation = %self.operation
        )
    }
}
