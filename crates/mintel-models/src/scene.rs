//! Scene segment models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One contiguous shot between two detected scene boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneInfo {
    /// Segment start in seconds
    pub start_time: f64,
    /// Segment end in seconds
    pub end_time: f64,
    /// `end_time - start_time`
    pub duration: f64,
    /// 1-based position in emission order
    pub scene_number: u32,
}

impl SceneInfo {
    /// Create a scene spanning `start_time..end_time`.
    pub fn new(scene_number: u32, start_time: f64, end_time: f64) -> Self {
        Self {
            start_time,
            end_time,
            duration: end_time - start_time,
            scene_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_computes_duration() {
        let scene = SceneInfo::new(2, 10.3, 60.0);
        assert!((scene.duration - 49.7).abs() < 1e-9);
        assert_eq!(scene.scene_number, 2);
    }
}
