//! FFmpeg executable backend.
//!
//! Loading resolves the executable (configured path first, then `PATH`),
//! reads its version banner and creates a private temporary workspace.
//! Staged files live in that workspace and commands run with it as their
//! working directory, so logical names such as `input` resolve there.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

use super::{EngineBackend, EngineInfo, EventSink};
use crate::command::{check_ffmpeg, FfmpegRunner};
use crate::diagnostics::parse_engine_major;
use crate::error::{MediaError, MediaResult};

struct LoadedFfmpeg {
    runner: FfmpegRunner,
    workspace: TempDir,
}

/// Backend driving an FFmpeg executable as a child process.
pub struct FfmpegBackend {
    /// Explicit executable; `None` searches `PATH`
    binary: Option<PathBuf>,
    /// Parent for the private workspace; `None` uses the system temp dir
    work_root: Option<PathBuf>,
    loaded: OnceLock<LoadedFfmpeg>,
}

impl FfmpegBackend {
    pub fn new(binary: Option<PathBuf>, work_root: Option<PathBuf>) -> Self {
        Self {
            binary,
            work_root,
            loaded: OnceLock::new(),
        }
    }

    fn resolve_binary(&self) -> MediaResult<PathBuf> {
        match &self.binary {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(path) => Err(MediaError::engine_load(format!(
                "configured FFmpeg executable does not exist: {}",
                path.display()
            ))),
            None => check_ffmpeg(),
        }
    }

    fn create_workspace(&self) -> MediaResult<TempDir> {
        let builder = {
            let mut builder = tempfile::Builder::new();
            builder.prefix("mintel-");
            builder
        };
        let dir = match &self.work_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    fn loaded(&self) -> MediaResult<&LoadedFfmpeg> {
        self.loaded.get().ok_or(MediaError::EngineNotLoaded)
    }

    fn workspace_path(&self, name: &str) -> MediaResult<PathBuf> {
        if name.is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == ".."
        {
            return Err(MediaError::SecurityViolation(format!(
                "invalid workspace file name: {name:?}"
            )));
        }
        Ok(self.loaded()?.workspace.path().join(name))
    }
}

/// First line of `ffmpeg -version`.
async fn read_version_banner(binary: &Path) -> MediaResult<String> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| MediaError::engine_load(format!("failed to run {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(MediaError::engine_load(format!(
            "{} -version exited with {}: {}",
            binary.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .next()
        .filter(|line| line.starts_with("ffmpeg version"))
        .map(str::to_string)
        .ok_or_else(|| {
            MediaError::engine_load(format!(
                "{} does not look like FFmpeg",
                binary.display()
            ))
        })
}

#[async_trait]
impl EngineBackend for FfmpegBackend {
    async fn load(&self) -> MediaResult<EngineInfo> {
        let binary = self.resolve_binary()?;
        let version = read_version_banner(&binary).await?;
        let major = parse_engine_major(&version);

        let loaded = match self.loaded.get() {
            Some(loaded) => loaded,
            None => {
                let workspace = self.create_workspace().map_err(|e| {
                    MediaError::engine_load(format!("failed to create engine workspace: {e}"))
                })?;
                debug!("Engine workspace: {}", workspace.path().display());
                let runner = FfmpegRunner::new(&binary, workspace.path());
                self.loaded.get_or_init(|| LoadedFfmpeg { runner, workspace })
            }
        };

        Ok(EngineInfo {
            binary,
            version,
            major,
            work_dir: loaded.workspace.path().to_path_buf(),
        })
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> MediaResult<()> {
        let path = self.workspace_path(name)?;
        fs::write(&path, data).await?;
        debug!("Staged {} bytes at {}", data.len(), path.display());
        Ok(())
    }

    async fn remove_file(&self, name: &str) -> MediaResult<()> {
        let path = self.workspace_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exec(&self, args: &[String], on_event: EventSink<'_>) -> MediaResult<()> {
        self.loaded()?.runner.run(args, on_event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_configured_binary_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FfmpegBackend::new(
            Some(dir.path().join("no-such-ffmpeg")),
            Some(dir.path().to_path_buf()),
        );

        let err = backend.load().await.unwrap_err();
        assert!(err.is_load_error());
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_workspace_requires_load() {
        let backend = FfmpegBackend::new(None, None);
        let err = backend.write_file("input", b"data").await.unwrap_err();
        assert!(matches!(err, MediaError::EngineNotLoaded));
    }

    #[test]
    fn test_create_workspace_under_root() {
        let root = tempfile::tempdir().unwrap();
        let backend = FfmpegBackend::new(None, Some(root.path().join("nested")));

        let workspace = backend.create_workspace().unwrap();
        assert!(workspace.path().starts_with(root.path().join("nested")));
        assert!(workspace
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("mintel-"));
    }
}
