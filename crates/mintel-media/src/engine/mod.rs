//! Media engine lifecycle.
//!
//! [`MediaEngine`] is a caller-owned handle around an [`EngineBackend`].
//! Construct it once at application start, share it by `Arc`, and pass it
//! to every analyzer. The first call to [`MediaEngine::load`] initializes the
//! backend; concurrent first callers all await that same initialization.
//! If it fails the engine stays unloaded and a later call retries.
//!
//! The workspace holds a single staged input, so analyses over one engine
//! must take turns: each run holds a [`RunPermit`] from staging until the
//! input is removed again, whichever analyzer issued it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::diagnostics::PINNED_FFMPEG_MAJOR;
use crate::error::{MediaError, MediaResult};

pub mod ffmpeg;

pub use ffmpeg::FfmpegBackend;

/// Event emitted by the engine while a command runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One line of the diagnostic trace
    Log(String),
    /// Fraction of the input processed (nominally 0–1, not monotonic
    /// across commands)
    Progress(f64),
}

/// Observer installed for the duration of one command.
pub type EventSink<'a> = &'a (dyn Fn(EngineEvent) + Send + Sync);

/// Details of a loaded engine.
#[derive(Debug, Clone)]
pub struct EngineInfo {
    /// Executable driving the engine
    pub binary: PathBuf,
    /// Version banner line
    pub version: String,
    /// Parsed major version, when the banner carries one
    pub major: Option<u32>,
    /// Private directory holding staged files
    pub work_dir: PathBuf,
}

impl EngineInfo {
    /// Whether the engine matches the version the diagnostic grammar targets.
    pub fn matches_grammar(&self) -> bool {
        self.major == Some(PINNED_FFMPEG_MAJOR)
    }
}

/// The operations an engine implementation must provide.
///
/// File names are logical names inside the engine's private workspace.
#[async_trait]
pub trait EngineBackend: Send + Sync {
    /// Fetch and initialize the engine.
    async fn load(&self) -> MediaResult<EngineInfo>;

    /// Write `data` to the workspace under `name`, replacing any previous file.
    async fn write_file(&self, name: &str, data: &[u8]) -> MediaResult<()>;

    /// Remove `name` from the workspace. Missing files are not an error.
    async fn remove_file(&self, name: &str) -> MediaResult<()>;

    /// Run one engine command, streaming events to `on_event`.
    async fn exec(&self, args: &[String], on_event: EventSink<'_>) -> MediaResult<()>;
}

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Unloaded,
    Loading,
    Loaded,
}

/// Exclusive use of the engine workspace for one analysis run.
pub type RunPermit<'a> = MutexGuard<'a, ()>;

/// Shared, lazily loaded engine handle.
pub struct MediaEngine {
    backend: Arc<dyn EngineBackend>,
    info: OnceCell<EngineInfo>,
    loading: AtomicBool,
    run_lock: Mutex<()>,
}

/// Clears the loading flag however the load future ends.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MediaEngine {
    /// Wrap a backend. Nothing is loaded until [`load`](Self::load).
    pub fn new(backend: impl EngineBackend + 'static) -> Self {
        Self::from_backend(Arc::new(backend))
    }

    /// Wrap an already shared backend.
    pub fn from_backend(backend: Arc<dyn EngineBackend>) -> Self {
        Self {
            backend,
            info: OnceCell::new(),
            loading: AtomicBool::new(false),
            run_lock: Mutex::new(()),
        }
    }

    /// Engine driving the FFmpeg executable selected by `config`.
    pub fn ffmpeg(config: &AnalyzerConfig) -> Self {
        Self::new(FfmpegBackend::new(
            config.ffmpeg_path.clone(),
            config.work_dir.clone(),
        ))
    }

    /// Load the engine once; later calls return the cached info.
    pub async fn load(&self) -> MediaResult<&EngineInfo> {
        self.info
            .get_or_try_init(|| async {
                self.loading.store(true, Ordering::Release);
                let _guard = LoadingGuard(&self.loading);

                info!("Loading media engine");
                let info = self.backend.load().await.map_err(|e| {
                    warn!("Media engine failed to load: {}", e);
                    e
                })?;

                if !info.matches_grammar() {
                    warn!(
                        version = %info.version,
                        pinned_major = PINNED_FFMPEG_MAJOR,
                        "Engine version differs from the diagnostic grammar target; \
                         metadata extraction may degrade"
                    );
                }
                info!(version = %info.version, binary = %info.binary.display(), "Media engine loaded");
                Ok::<_, MediaError>(info)
            })
            .await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        if self.info.initialized() {
            EngineState::Loaded
        } else if self.loading.load(Ordering::Acquire) {
            EngineState::Loading
        } else {
            EngineState::Unloaded
        }
    }

    /// Whether [`load`](Self::load) has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.info.initialized()
    }

    /// Info of the loaded engine.
    pub fn info(&self) -> Option<&EngineInfo> {
        self.info.get()
    }

    /// Wait for exclusive use of the workspace; runs are granted in FIFO
    /// order.
    pub async fn acquire_run(&self) -> RunPermit<'_> {
        self.run_lock.lock().await
    }

    fn ensure_loaded(&self) -> MediaResult<()> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(MediaError::EngineNotLoaded)
        }
    }

    /// Write a file into the engine workspace.
    pub async fn write_file(&self, name: &str, data: &[u8]) -> MediaResult<()> {
        self.ensure_loaded()?;
        self.backend.write_file(name, data).await
    }

    /// Remove a file from the engine workspace.
    pub async fn remove_file(&self, name: &str) -> MediaResult<()> {
        self.ensure_loaded()?;
        self.backend.remove_file(name).await
    }

    /// Run one engine command.
    pub async fn exec(&self, args: &[String], on_event: EventSink<'_>) -> MediaResult<()> {
        self.ensure_loaded()?;
        self.backend.exec(args, on_event).await
    }
}
