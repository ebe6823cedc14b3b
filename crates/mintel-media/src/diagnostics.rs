//! FFmpeg diagnostic trace grammar.
//!
//! The engine exposes no structured metadata API to this crate; instead the
//! free-text lines FFmpeg writes to stderr are scraped. That text is an
//! implementation-defined, version-sensitive format, so the grammar is kept
//! narrow and versioned: every rule is a named regex, and every parse
//! returns `Option` so a line that no longer matches is reported as a miss
//! rather than turned into a silent zero.
//!
//! Lines this grammar targets (FFmpeg 6.x/7.x):
//!
//! ```text
//!   Duration: 00:01:30.50, start: 0.000000, bitrate: 1205 kb/s
//!   Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p, 1920x1080 [SAR 1:1 DAR 16:9], 25 fps
//!   Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, stereo, fltp, 128 kb/s
//! [Parsed_showinfo_1 @ 0x5581] n:   0 pts:  12800 pts_time:10      duration:512 ...
//! ```

use std::sync::LazyLock;

use regex::Regex;

/// Version of the grammar below. Bump when a rule changes.
pub const GRAMMAR_VERSION: u32 = 1;

/// FFmpeg major version the rules were written against.
pub const PINNED_FFMPEG_MAJOR: u32 = 7;

static DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration:\s*(?P<hours>\d+):(?P<minutes>\d{2}):(?P<seconds>\d{2}(?:\.\d+)?)")
        .expect("DURATION rule is a valid regex")
});

static VIDEO_STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #.*?Video:.*?\b(?P<width>\d{2,5})x(?P<height>\d{2,5})\b")
        .expect("VIDEO_STREAM rule is a valid regex")
});

static AUDIO_STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #\d+:\d+.*?:\s*Audio:").expect("AUDIO_STREAM rule is a valid regex")
});

static ANY_STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Stream #\d+:\d+").expect("ANY_STREAM rule is a valid regex")
});

static PTS_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"pts_time:\s*(?P<time>-?\d+(?:\.\d+)?)").expect("PTS_TIME rule is a valid regex")
});

/// Container duration in seconds from a `Duration: H:MM:SS.ss` line.
///
/// `Duration: N/A` (live or raw streams) does not match.
pub fn parse_duration(line: &str) -> Option<f64> {
    let caps = DURATION.captures(line)?;
    let hours: f64 = caps["hours"].parse().ok()?;
    let minutes: f64 = caps["minutes"].parse().ok()?;
    let seconds: f64 = caps["seconds"].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// `(width, height)` from a video stream description line.
pub fn parse_video_dimensions(line: &str) -> Option<(u32, u32)> {
    let caps = VIDEO_STREAM.captures(line)?;
    let width = caps["width"].parse().ok()?;
    let height = caps["height"].parse().ok()?;
    Some((width, height))
}

/// Whether the line describes an audio stream.
pub fn is_audio_stream(line: &str) -> bool {
    AUDIO_STREAM.is_match(line)
}

/// Whether the line describes any stream.
pub fn is_stream(line: &str) -> bool {
    ANY_STREAM.is_match(line)
}

/// Frame timestamp from a `showinfo` line carrying `pts_time:<float>`.
pub fn parse_pts_time(line: &str) -> Option<f64> {
    PTS_TIME.captures(line)?["time"].parse().ok()
}

/// Leading major version from an `ffmpeg -version` banner.
///
/// Handles `ffmpeg version 6.1.1-3ubuntu5` and `ffmpeg version n7.0`.
/// Git snapshot builds (`N-113684-g...`) carry no release number and
/// return `None`.
pub fn parse_engine_major(banner: &str) -> Option<u32> {
    let version = banner
        .lines()
        .next()?
        .split_whitespace()
        .skip_while(|word| *word != "version")
        .nth(1)?;
    let version = version.strip_prefix('n').unwrap_or(version);
    let digits: String = version.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
