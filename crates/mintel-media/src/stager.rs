//! Stages file bytes into the engine workspace.

use tracing::debug;

use crate::engine::MediaEngine;
use crate::error::MediaResult;
use crate::file::MediaFile;

/// Logical name every analysis command reads from.
pub const INPUT_NAME: &str = "input";

/// Copy `file` into the engine workspace as [`INPUT_NAME`].
///
/// Overwrites whatever a previous run left there. The engine must be loaded.
pub async fn stage(engine: &MediaEngine, file: &MediaFile) -> MediaResult<()> {
    debug!(file = %file.name, bytes = file.len(), "Staging input");
    engine.write_file(INPUT_NAME, &file.bytes).await
}

/// Remove the staged input.
pub async fn unstage(engine: &MediaEngine) -> MediaResult<()> {
    engine.remove_file(INPUT_NAME).await
}
