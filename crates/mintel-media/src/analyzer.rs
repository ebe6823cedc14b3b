//! Analysis orchestrator.
//!
//! A run moves through `Idle -> Staging -> Probing -> Segmenting -> Complete`.
//! Every stage is bounded by a wall-clock timeout and an optional cancel
//! signal; the first failure ends the run and no partial record is returned.
//! Runs are queued on the engine and execute one at a time, since every
//! analyzer sharing that engine also shares its single staged input.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, Instrument};

use mintel_models::{AnalysisStage, MediaIntelligence};

use crate::config::AnalyzerConfig;
use crate::engine::MediaEngine;
use crate::error::{MediaError, MediaResult};
use crate::file::MediaFile;
use crate::logging::RunLogger;
use crate::metrics;
use crate::probe::probe_metadata;
use crate::progress::{ProgressCallback, ProgressReporter};
use crate::scene::detect_scenes;
use crate::stager;

/// Cancel signal for a run: the run stops once the value becomes `true`.
pub type CancelSignal = watch::Receiver<bool>;

/// Runs analyses against a shared [`MediaEngine`].
pub struct MediaAnalyzer {
    engine: Arc<MediaEngine>,
    config: AnalyzerConfig,
    queued: AtomicUsize,
    progress: ProgressReporter,
}

impl MediaAnalyzer {
    pub fn new(engine: Arc<MediaEngine>, config: AnalyzerConfig) -> Self {
        Self {
            engine,
            config,
            queued: AtomicUsize::new(0),
            progress: ProgressReporter::new(),
        }
    }

    /// Analyzer over a fresh FFmpeg engine built from `config`.
    pub fn ffmpeg(config: AnalyzerConfig) -> Self {
        let engine = Arc::new(MediaEngine::ffmpeg(&config));
        Self::new(engine, config)
    }

    pub fn engine(&self) -> &Arc<MediaEngine> {
        &self.engine
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Load the engine ahead of the first analysis.
    pub async fn load(&self) -> MediaResult<()> {
        bounded(
            AnalysisStage::Idle,
            self.config.load_timeout,
            None,
            self.load_engine(),
        )
        .await
    }

    /// Analyze `file`, reporting scene detection progress to `on_progress`.
    pub async fn analyze(
        &self,
        file: &MediaFile,
        on_progress: Option<ProgressCallback>,
    ) -> MediaResult<MediaIntelligence> {
        self.analyze_with_cancel(file, on_progress, None).await
    }

    /// Like [`analyze`](Self::analyze), stopping with
    /// [`MediaError::Cancelled`] once `cancel` turns `true`.
    pub async fn analyze_with_cancel(
        &self,
        file: &MediaFile,
        on_progress: Option<ProgressCallback>,
        mut cancel: Option<CancelSignal>,
    ) -> MediaResult<MediaIntelligence> {
        let logger = RunLogger::new("analyze");
        let span = logger.create_span();
        self.run(file, on_progress, cancel.as_mut(), &logger)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        file: &MediaFile,
        on_progress: Option<ProgressCallback>,
        mut cancel: Option<&mut CancelSignal>,
        logger: &RunLogger,
    ) -> MediaResult<MediaIntelligence> {
        metrics::record_run_started();
        logger.log_start(&format!("{} ({} bytes, {})", file.name, file.len(), file.media_type));

        let waiting = self.queued.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_runs_queued(waiting);
        let permit = tokio::select! {
            biased;
            _ = cancelled(cancel.as_deref_mut()) => None,
            permit = self.engine.acquire_run() => Some(permit),
        };
        let waiting = self.queued.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_runs_queued(waiting);

        let Some(_permit) = permit else {
            let err = MediaError::Cancelled;
            logger.log_error("cancelled while queued");
            metrics::record_run_failed(AnalysisStage::Idle, &err);
            return Err(err);
        };

        let mut stage = AnalysisStage::Idle;
        let result = self
            .run_stages(file, on_progress, cancel, logger, &mut stage)
            .await;

        if stage != AnalysisStage::Idle && self.engine.is_loaded() {
            if let Err(e) = stager::unstage(&self.engine).await {
                logger.log_warning(&format!("failed to remove staged input: {}", e));
            }
        }

        match &result {
            Ok(intelligence) => {
                logger.log_stage(AnalysisStage::Complete);
                metrics::record_run_completed(intelligence.visual.scene_count());
                logger.log_completion(&format!(
                    "{:.2}s, {}x{}, {} scenes",
                    intelligence.visual.metadata.duration,
                    intelligence.visual.metadata.width,
                    intelligence.visual.metadata.height,
                    intelligence.visual.scene_count()
                ));
            }
            Err(e) => {
                logger.log_stage(AnalysisStage::Failed);
                logger.log_error(&format!("{} stage: {}", stage, e));
                metrics::record_run_failed(stage, e);
            }
        }

        result
    }

    async fn run_stages(
        &self,
        file: &MediaFile,
        on_progress: Option<ProgressCallback>,
        mut cancel: Option<&mut CancelSignal>,
        logger: &RunLogger,
        stage: &mut AnalysisStage,
    ) -> MediaResult<MediaIntelligence> {
        file.validate()?;

        bounded(
            AnalysisStage::Idle,
            self.config.load_timeout,
            cancel.as_deref_mut(),
            self.load_engine(),
        )
        .await?;

        *stage = stage.next();
        logger.log_stage(*stage);
        let started = Instant::now();
        bounded(
            *stage,
            self.config.probe_timeout,
            cancel.as_deref_mut(),
            stager::stage(&self.engine, file),
        )
        .await?;
        metrics::record_stage_duration(*stage, started.elapsed().as_secs_f64());

        *stage = stage.next();
        logger.log_stage(*stage);
        let started = Instant::now();
        let mut report = bounded(
            *stage,
            self.config.probe_timeout,
            cancel.as_deref_mut(),
            probe_metadata(&self.engine),
        )
        .await?;
        metrics::record_stage_duration(*stage, started.elapsed().as_secs_f64());
        metrics::record_probe_misses(report.misses.len());
        if self.config.strict_probe {
            report = report.require_complete()?;
        } else if !report.is_complete() {
            logger.log_warning(&format!(
                "metadata incomplete, defaulted: {:?}",
                report.misses
            ));
        }

        *stage = stage.next();
        logger.log_stage(*stage);
        let started = Instant::now();
        let subscription = on_progress.map(|callback| self.progress.attach(callback));
        let scenes = bounded(
            *stage,
            self.config.scene_timeout,
            cancel.as_deref_mut(),
            detect_scenes(
                &self.engine,
                &self.config.scene,
                report.metadata.duration,
                &self.progress,
            ),
        )
        .await;
        drop(subscription);
        let scenes = scenes?;
        metrics::record_stage_duration(*stage, started.elapsed().as_secs_f64());

        *stage = stage.next();
        Ok(MediaIntelligence::new(report.metadata, scenes))
    }

    async fn load_engine(&self) -> MediaResult<()> {
        if self.engine.is_loaded() {
            return Ok(());
        }

        let started = Instant::now();
        let result = self.engine.load().await.map(|info| {
            debug!(version = %info.version, "Engine ready");
        });
        metrics::record_engine_load(result.is_ok(), started.elapsed().as_secs_f64());
        result
    }
}

/// Resolves once `cancel` turns `true`; never resolves without a signal or
/// after its sender is gone.
async fn cancelled(cancel: Option<&mut CancelSignal>) {
    if let Some(rx) = cancel {
        let signalled = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if signalled {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Run `fut` unless it outlives `limit` or the run is cancelled.
///
/// Dropping `fut` aborts the engine command it was driving.
async fn bounded<T, F>(
    stage: AnalysisStage,
    limit: Duration,
    cancel: Option<&mut CancelSignal>,
    fut: F,
) -> MediaResult<T>
where
    F: Future<Output = MediaResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancelled(cancel) => Err(MediaError::Cancelled),
        result = tokio::time::timeout(limit, fut) => result.unwrap_or_else(|_| {
            Err(MediaError::AnalysisTimedOut {
                stage,
                timeout: limit,
            })
        }),
    }
}
