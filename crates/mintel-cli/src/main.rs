//! Media intelligence command-line tool.
//!
//! Analyzes a local video file and prints the `MediaIntelligence` record that
//! would be attached to its upload.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mintel_media::diagnostics::{GRAMMAR_VERSION, PINNED_FFMPEG_MAJOR};
use mintel_media::{AnalyzerConfig, MediaAnalyzer, MediaFile, ProgressCallback};
use mintel_models::MediaIntelligence;

/// Media intelligence analyzer
#[derive(Debug, Parser)]
#[command(name = "mintel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Derive duration, resolution, scenes and shot length from a video file")]
struct Cli {
    /// FFmpeg executable (defaults to the one on PATH)
    #[arg(long, global = true)]
    ffmpeg: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Analyze a video file and print the result as JSON
    Analyze {
        /// Video file to analyze
        file: PathBuf,

        /// Override the media type guessed from the extension
        #[arg(long)]
        media_type: Option<String>,

        /// Scene-change threshold (0-1)
        #[arg(long)]
        threshold: Option<f64>,

        /// Fail when duration or dimensions cannot be read
        #[arg(long)]
        strict: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// Report scene detection progress on stderr
        #[arg(long)]
        progress: bool,

        /// Print Prometheus metrics on stderr after the run
        #[arg(long)]
        print_metrics: bool,
    },

    /// Load the engine and print what was found
    EngineInfo,

    /// Print the JSON schema of the analysis result
    Schema,
}

fn init_tracing() {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mintel_cli=info,mintel_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")
}

fn build_config(cli: &Cli) -> AnalyzerConfig {
    let mut config = AnalyzerConfig::from_env();
    if let Some(path) = &cli.ffmpeg {
        config = config.with_ffmpeg_path(path);
    }
    if let Commands::Analyze {
        threshold, strict, ..
    } = &cli.command
    {
        if let Some(threshold) = threshold {
            config = config.with_scene_threshold(*threshold);
        }
        if *strict {
            config = config.with_strict_probe(true);
        }
    }
    config
}

fn render(intelligence: &MediaIntelligence, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(intelligence)?
    } else {
        intelligence.to_form_field()?
    };
    Ok(json)
}

/// Flip the cancel signal on Ctrl-C.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received interrupt, cancelling analysis");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn analyze(
    config: AnalyzerConfig,
    file: PathBuf,
    media_type: Option<String>,
    pretty: bool,
    progress: bool,
) -> Result<()> {
    let mut media = MediaFile::from_path(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if let Some(media_type) = media_type {
        media.media_type = media_type;
    }

    let analyzer = MediaAnalyzer::ffmpeg(config);
    let on_progress: Option<ProgressCallback> = progress.then(|| {
        Arc::new(|percent: u8| eprintln!("progress: {percent}%")) as ProgressCallback
    });

    let intelligence = analyzer
        .analyze_with_cancel(&media, on_progress, Some(cancel_on_ctrl_c()))
        .await
        .with_context(|| format!("Analysis of {} failed", file.display()))?;

    println!("{}", render(&intelligence, pretty)?);
    Ok(())
}

async fn engine_info(config: AnalyzerConfig) -> Result<()> {
    let analyzer = MediaAnalyzer::ffmpeg(config);
    analyzer.load().await.context("Engine failed to load")?;
    let info = analyzer
        .engine()
        .info()
        .context("Engine reported loaded without info")?;

    let report = serde_json::json!({
        "binary": info.binary,
        "version": info.version,
        "major": info.major,
        "work_dir": info.work_dir,
        "grammar_version": GRAMMAR_VERSION,
        "pinned_major": PINNED_FFMPEG_MAJOR,
        "matches_grammar": info.matches_grammar(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn schema() -> Result<()> {
    let schema = schemars::schema_for!(MediaIntelligence);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let config = build_config(&cli);
    info!("Analyzer config: {:?}", config);

    let print_metrics = matches!(cli.command, Commands::Analyze { print_metrics: true, .. });
    let metrics = if print_metrics {
        match init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        }
    } else {
        None
    };

    let result = match cli.command {
        Commands::Analyze {
            file,
            media_type,
            pretty,
            progress,
            ..
        } => analyze(config, file, media_type, pretty, progress).await,
        Commands::EngineInfo => engine_info(config).await,
        Commands::Schema => schema(),
    };

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "mintel",
            "analyze",
            "clip.mp4",
            "--media-type",
            "video/webm",
            "--threshold",
            "0.4",
            "--pretty",
            "--progress",
        ])
        .unwrap();

        match cli.command {
            Commands::Analyze {
                file,
                media_type,
                threshold,
                pretty,
                progress,
                strict,
                print_metrics,
            } => {
                assert_eq!(file, PathBuf::from("clip.mp4"));
                assert_eq!(media_type.as_deref(), Some("video/webm"));
                assert_eq!(threshold, Some(0.4));
                assert!(pretty && progress);
                assert!(!strict && !print_metrics);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "mintel",
            "--ffmpeg",
            "/opt/ffmpeg",
            "analyze",
            "clip.mp4",
            "--threshold",
            "3",
            "--strict",
        ])
        .unwrap();

        let config = build_config(&cli);
        assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(config.scene.threshold, 1.0);
        assert!(config.strict_probe);
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let intelligence = MediaIntelligence::new(Default::default(), Vec::new());

        let compact = render(&intelligence, false).unwrap();
        assert!(!compact.contains('\n'));
        assert!(compact.contains("\"avg_shot_length\":null"));

        let pretty = render(&intelligence, true).unwrap();
        assert!(pretty.contains('\n'));
    }
}
