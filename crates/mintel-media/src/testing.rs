//! Scripted in-memory engine used by unit tests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{EngineBackend, EngineEvent, EngineInfo, EventSink};
use crate::error::{MediaError, MediaResult};

/// Trace of a 2-minute 1080p clip with one audio stream.
pub(crate) fn probe_trace(duration: &str) -> Vec<String> {
    vec![
        "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'input':".to_string(),
        format!("  Duration: {duration}, start: 0.000000, bitrate: 1205 kb/s"),
        "  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(progressive), 1920x1080 [SAR 1:1 DAR 16:9], 25 fps".to_string(),
        "  Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, stereo, fltp".to_string(),
    ]
}

/// showinfo lines for the given scene-change timestamps.
pub(crate) fn showinfo_trace(times: &[f64]) -> Vec<String> {
    times
        .iter()
        .enumerate()
        .map(|(n, t)| {
            format!("[Parsed_showinfo_1 @ 0x55d1] n:{n:4} pts:{:8} pts_time:{t} duration:512", (t * 1000.0) as i64)
        })
        .collect()
}

/// In-memory [`EngineBackend`] replaying scripted traces.
pub(crate) struct ScriptedBackend {
    failing_loads: AtomicUsize,
    load_calls: AtomicUsize,
    load_delay: Duration,
    files: Mutex<HashMap<String, Vec<u8>>>,
    writes: AtomicUsize,
    probe_lines: Vec<String>,
    probe_fails: bool,
    scene_lines: Vec<String>,
    scene_progress: Vec<f64>,
    scene_fails: bool,
    scene_delay: Duration,
    exec_calls: Mutex<Vec<Vec<String>>>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            failing_loads: AtomicUsize::new(0),
            load_calls: AtomicUsize::new(0),
            load_delay: Duration::ZERO,
            files: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
            probe_lines: probe_trace("00:02:00.00"),
            probe_fails: false,
            scene_lines: Vec::new(),
            scene_progress: Vec::new(),
            scene_fails: false,
            scene_delay: Duration::ZERO,
            exec_calls: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            peak_active: AtomicUsize::new(0),
        }
    }

    /// Fail the first `count` load attempts.
    pub(crate) fn failing_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    pub(crate) fn with_probe_lines(mut self, lines: Vec<String>) -> Self {
        self.probe_lines = lines;
        self
    }

    pub(crate) fn failing_probe(mut self) -> Self {
        self.probe_fails = true;
        self
    }

    pub(crate) fn with_scene_times(mut self, times: &[f64]) -> Self {
        self.scene_lines = showinfo_trace(times);
        self
    }

    pub(crate) fn with_scene_progress(mut self, ratios: &[f64]) -> Self {
        self.scene_progress = ratios.to_vec();
        self
    }

    pub(crate) fn failing_scenes(mut self) -> Self {
        self.scene_fails = true;
        self
    }

    pub(crate) fn with_scene_delay(mut self, delay: Duration) -> Self {
        self.scene_delay = delay;
        self
    }

    pub(crate) fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub(crate) fn has_file(&self, name: &str) -> bool {
        self.files.lock().unwrap().contains_key(name)
    }

    pub(crate) fn exec_calls(&self) -> Vec<Vec<String>> {
        self.exec_calls.lock().unwrap().clone()
    }

    pub(crate) fn peak_active(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }
}

/// Decrements the active command count however `exec` ends.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EngineBackend for ScriptedBackend {
    async fn load(&self) -> MediaResult<EngineInfo> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let remaining = self.failing_loads.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_loads.store(remaining - 1, Ordering::SeqCst);
            return Err(MediaError::engine_load("simulated network failure fetching engine core"));
        }

        Ok(EngineInfo {
            binary: PathBuf::from("scripted"),
            version: "ffmpeg version 7.0-scripted".to_string(),
            major: Some(7),
            work_dir: PathBuf::from("memory"),
        })
    }

    async fn write_file(&self, name: &str, data: &[u8]) -> MediaResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn remove_file(&self, name: &str) -> MediaResult<()> {
        self.files.lock().unwrap().remove(name);
        Ok(())
    }

    async fn exec(&self, args: &[String], on_event: EventSink<'_>) -> MediaResult<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = ActiveGuard(&self.active);
        self.peak_active.fetch_max(active, Ordering::SeqCst);
        self.exec_calls.lock().unwrap().push(args.to_vec());

        let input_pos = args.iter().position(|a| a == "-i");
        let input = input_pos.and_then(|pos| args.get(pos + 1));
        if let Some(input) = input {
            if !self.has_file(input) {
                return Err(MediaError::ffmpeg_failed(
                    format!("{input}: No such file or directory"),
                    None,
                    Some(1),
                ));
            }
        }

        let is_scene = args.iter().any(|a| a.contains("showinfo"));
        if !is_scene {
            for line in &self.probe_lines {
                on_event(EngineEvent::Log(line.clone()));
            }
            if self.probe_fails {
                return Err(MediaError::ffmpeg_failed(
                    "Invalid data found when processing input",
                    None,
                    Some(1),
                ));
            }
            return Ok(());
        }

        for line in &self.probe_lines {
            on_event(EngineEvent::Log(line.clone()));
        }
        for (i, line) in self.scene_lines.iter().enumerate() {
            on_event(EngineEvent::Log(line.clone()));
            if let Some(ratio) = self.scene_progress.get(i) {
                on_event(EngineEvent::Progress(*ratio));
            }
        }
        for ratio in self.scene_progress.iter().skip(self.scene_lines.len()) {
            on_event(EngineEvent::Progress(*ratio));
        }
        if !self.scene_delay.is_zero() {
            tokio::time::sleep(self.scene_delay).await;
        }
        if self.scene_fails {
            return Err(MediaError::ffmpeg_failed(
                "Error while decoding stream #0:0: Cannot allocate memory",
                None,
                Some(1),
            ));
        }
        Ok(())
    }
}
