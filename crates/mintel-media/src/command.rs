//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::debug;

use crate::diagnostics;
use crate::engine::{EngineEvent, EventSink};
use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, parse_progress_line, FfmpegProgress};

/// Number of trailing diagnostic lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Longest diagnostic line kept; the remainder of a longer line is dropped.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Builder for FFmpeg analysis commands.
///
/// Analysis commands read one staged input and discard their output
/// (`-f null -`); only the diagnostic trace and progress stream matter.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file name, relative to the engine workspace
    input: String,
    /// Input arguments (before -i)
    input_args: Vec<String>,
    /// Output arguments (after -i)
    output_args: Vec<String>,
    /// Log level
    log_level: String,
    /// Whether to emit `-progress pipe:2`
    report_progress: bool,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command over `input`.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            // `info` is the lowest level that still prints stream
            // descriptions and showinfo lines
            log_level: "info".to_string(),
            report_progress: false,
        }
    }

    /// Add input arguments (before -i).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter:v").output_arg(filter)
    }

    /// Drop audio from the output.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Emit `-progress pipe:2` key/value blocks on stderr.
    pub fn with_progress(mut self) -> Self {
        self.report_progress = true;
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-nostdin".to_string(),
            "-nostats".to_string(),
            "-v".to_string(),
            self.log_level.clone(),
        ];

        if self.report_progress {
            args.push("-progress".to_string());
            args.push("pipe:2".to_string());
        }

        args.extend(self.input_args.iter().cloned());

        args.push("-i".to_string());
        args.push(self.input.clone());

        args.extend(self.output_args.iter().cloned());

        // Null muxer: decode and filter, write nothing
        args.push("-f".to_string());
        args.push("null".to_string());
        args.push("-".to_string());

        args
    }
}

/// Runs FFmpeg inside a working directory and streams its stderr as
/// [`EngineEvent`]s.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    binary: PathBuf,
    work_dir: PathBuf,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new(binary: impl AsRef<Path>, work_dir: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            work_dir: work_dir.as_ref().to_path_buf(),
        }
    }

    /// Run FFmpeg with `args`, forwarding every diagnostic line and progress
    /// fraction to `on_event`.
    ///
    /// Progress fractions are relative to the first `Duration:` announced in
    /// the trace; no progress is emitted when the input duration is unknown.
    /// The child is killed if the returned future is dropped.
    pub async fn run(&self, args: &[String], on_event: EventSink<'_>) -> MediaResult<()> {
        debug!("Running FFmpeg: {} {}", self.binary.display(), args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;
        let mut reader = BufReader::new(stderr);

        let mut current = FfmpegProgress::default();
        let mut total_secs: Option<f64> = None;
        let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if read_line_capped(&mut reader, &mut buf, MAX_LINE_BYTES).await? == 0 {
                break;
            }
            // Container metadata is not guaranteed to be UTF-8
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\r', '\n']);

            if is_progress_line(line) {
                if let Some(progress) = parse_progress_line(line, &mut current) {
                    if let Some(ratio) = total_secs.and_then(|total| progress.ratio(total)) {
                        on_event(EngineEvent::Progress(ratio));
                    }
                }
                continue;
            }

            if total_secs.is_none() {
                total_secs = diagnostics::parse_duration(line).filter(|secs| *secs > 0.0);
            }

            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line.to_string());

            on_event(EngineEvent::Log(line.to_string()));
        }

        let status = child.wait().await?;

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                Some(Vec::from(tail).join("\n")),
                status.code(),
            ))
        }
    }
}

/// Read one line into `buf`, keeping at most `max` bytes of it.
///
/// The rest of an over-long line is consumed and discarded so memory stays
/// bounded even when the stream never emits a newline. Returns the number of
/// bytes consumed, `0` at end of stream.
pub(crate) async fn read_line_capped<R>(reader: &mut R, buf: &mut Vec<u8>, max: usize) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut consumed = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(consumed);
        }

        let (len, done) = match available.iter().position(|b| *b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        let room = max.saturating_sub(buf.len());
        buf.extend_from_slice(&available[..len.min(room)]);
        reader.consume(len);
        consumed += len;

        if done {
            return Ok(consumed);
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::EngineNotFound)
}
