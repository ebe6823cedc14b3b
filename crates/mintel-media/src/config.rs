//! Analyzer configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::scene::{SceneDetectionConfig, DEFAULT_MIN_SCENE_SECS, DEFAULT_SCENE_THRESHOLD};

/// Analyzer configuration.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// FFmpeg executable; resolved from `PATH` when unset
    pub ffmpeg_path: Option<PathBuf>,
    /// Parent directory for the engine workspace; system temp dir when unset
    pub work_dir: Option<PathBuf>,
    /// Scene detection settings
    pub scene: SceneDetectionConfig,
    /// Engine load timeout
    pub load_timeout: Duration,
    /// Staging and probing timeout
    pub probe_timeout: Duration,
    /// Scene detection timeout
    pub scene_timeout: Duration,
    /// Fail the run when the probe misses duration or dimensions
    pub strict_probe: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            work_dir: None,
            scene: SceneDetectionConfig::default(),
            load_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(30),
            scene_timeout: Duration::from_secs(600), // 10 minutes
            strict_probe: false,
        }
    }
}

impl AnalyzerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(
                lookup(key)
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(default),
            )
        };

        let scene = SceneDetectionConfig::new()
            .with_threshold(
                lookup("MINTEL_SCENE_THRESHOLD")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(DEFAULT_SCENE_THRESHOLD),
            )
            .with_min_scene_duration(
                lookup("MINTEL_MIN_SCENE_SECS")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(DEFAULT_MIN_SCENE_SECS),
            );

        Self {
            ffmpeg_path: lookup("MINTEL_FFMPEG_PATH")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            work_dir: lookup("MINTEL_WORK_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            scene,
            load_timeout: secs("MINTEL_LOAD_TIMEOUT", 60),
            probe_timeout: secs("MINTEL_PROBE_TIMEOUT", 30),
            scene_timeout: secs("MINTEL_SCENE_TIMEOUT", 600),
            strict_probe: lookup("MINTEL_STRICT_PROBE")
                .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Set the scene threshold, clamped into `0..=1`.
    pub fn with_scene_threshold(mut self, threshold: f64) -> Self {
        self.scene = self.scene.with_threshold(threshold);
        self
    }

    pub fn with_min_scene_duration(mut self, secs: f64) -> Self {
        self.scene = self.scene.with_min_scene_duration(secs);
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_scene_timeout(mut self, timeout: Duration) -> Self {
        self.scene_timeout = timeout;
        self
    }

    pub fn with_strict_probe(mut self, strict: bool) -> Self {
        self.strict_probe = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::from_lookup(lookup(&[]));
        assert!(config.ffmpeg_path.is_none());
        assert_eq!(config.scene.threshold, 0.3);
        assert_eq!(config.scene.min_scene_duration, 0.5);
        assert_eq!(config.load_timeout, Duration::from_secs(60));
        assert_eq!(config.probe_timeout, Duration::from_secs(30));
        assert_eq!(config.scene_timeout, Duration::from_secs(600));
        assert!(!config.strict_probe);
    }

    #[test]
    fn test_from_lookup() {
        let config = AnalyzerConfig::from_lookup(lookup(&[
            ("MINTEL_FFMPEG_PATH", "/opt/ffmpeg/bin/ffmpeg"),
            ("MINTEL_SCENE_THRESHOLD", "2.5"),
            ("MINTEL_SCENE_TIMEOUT", "90"),
            ("MINTEL_PROBE_TIMEOUT", "soon"),
            ("MINTEL_STRICT_PROBE", "true"),
        ]));

        assert_eq!(config.ffmpeg_path, Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg")));
        assert_eq!(config.scene.threshold, 1.0);
        assert_eq!(config.scene_timeout, Duration::from_secs(90));
        assert_eq!(config.probe_timeout, Duration::from_secs(30));
        assert!(config.strict_probe);
    }

    #[test]
    fn test_builders() {
        let config = AnalyzerConfig::default()
            .with_scene_threshold(0.45)
            .with_min_scene_duration(1.0)
            .with_scene_timeout(Duration::from_secs(5));

        assert_eq!(config.scene.threshold, 0.45);
        assert_eq!(config.scene.min_scene_duration, 1.0);
        assert_eq!(config.scene_timeout, Duration::from_secs(5));
    }
}
