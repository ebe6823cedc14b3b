//! FFmpeg progress parsing and percent reporting.
//!
//! FFmpeg's `-progress pipe:2` output is folded into [`FfmpegProgress`],
//! which the runner turns into a fractional 0–1 engine progress event.
//! [`ProgressReporter`] translates those fractions into whole percents for a
//! caller-supplied callback that is attached only for the duration of a
//! [`ProgressSubscription`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Whether the command reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `total_secs` processed so far.
    ///
    /// Not clamped: FFmpeg may report an output time slightly past the
    /// container duration. Returns `None` for an unknown total.
    pub fn ratio(&self, total_secs: f64) -> Option<f64> {
        if !(total_secs > 0.0) {
            return None;
        }
        if self.is_complete {
            return Some(1.0);
        }
        Some((self.out_time_ms as f64 / 1000.0) / total_secs)
    }
}

/// Parse a progress line from FFmpeg's -progress output.
///
/// Returns a snapshot each time a block ends with `progress=continue|end`.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();

    if let Some((key, value)) = line.split_once('=') {
        match key {
            // FFmpeg reports out_time_ms in microseconds as well
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<i64>() {
                    current.out_time_ms = us / 1000;
                }
            }
            "progress" => {
                if value == "end" {
                    current.is_complete = true;
                }
                return Some(current.clone());
            }
            _ => {}
        }
    }

    None
}

/// Whether a stderr line belongs to the `-progress` key/value stream rather
/// than the diagnostic trace.
pub(crate) fn is_progress_line(line: &str) -> bool {
    let line = line.trim();
    match line.split_once('=') {
        Some((key, value)) => {
            !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Callback receiving whole-percent progress (0–100).
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Convert an engine progress fraction to a whole percent.
///
/// Rounds to nearest and clamps into `0..=100`. Returns `None` for NaN or
/// infinite input.
pub fn to_percent(ratio: f64) -> Option<u8> {
    if !ratio.is_finite() {
        return None;
    }
    Some((ratio * 100.0).round().clamp(0.0, 100.0) as u8)
}

type Listener = (u64, ProgressCallback);

/// Bridges engine progress fractions to a removable percent listener.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    listener: Arc<Mutex<Option<Listener>>>,
    next_id: Arc<AtomicU64>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` until the returned subscription is dropped.
    ///
    /// Attaching replaces any earlier listener; dropping that earlier
    /// subscription afterwards leaves the newer listener in place.
    pub fn attach(&self, callback: ProgressCallback) -> ProgressSubscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.lock() = Some((id, callback));
        ProgressSubscription {
            listener: Arc::clone(&self.listener),
            id,
        }
    }

    /// Whether a listener is currently registered.
    pub fn is_attached(&self) -> bool {
        self.lock().is_some()
    }

    /// Forward an engine progress fraction to the current listener, if any.
    pub fn report(&self, ratio: f64) {
        let Some(percent) = to_percent(ratio) else {
            return;
        };
        // Clone out so the callback runs without holding the lock
        let callback = self.lock().as_ref().map(|(_, cb)| Arc::clone(cb));
        if let Some(callback) = callback {
            callback(percent);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps a progress listener registered; detaches it on drop.
#[must_use = "the listener is detached as soon as the subscription is dropped"]
pub struct ProgressSubscription {
    listener: Arc<Mutex<Option<Listener>>>,
    id: u64,
}

impl Drop for ProgressSubscription {
    fn drop(&mut self) {
        let mut slot = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if matches!(slot.as_ref(), Some((id, _)) if *id == self.id) {
            *slot = None;
        }
    }
}
