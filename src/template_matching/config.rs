//! Configuration for template matching and match overlays

use crate::error::{DetectError, DetectResult};
use image::Rgb;

/// Similarity threshold used when none is given
pub const DEFAULT_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Minimum correlation score for a position to count as a match
    pub threshold: f32,
    /// Overlay colour for match rectangles
    pub box_color: Rgb<u8>,
    /// Border width of match rectangles in pixels
    pub box_thickness: u32,
    /// Collapse matches within this many pixels of a stronger one (off = draw every match)
    pub suppress_radius: Option<u32>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            box_color: Rgb([255, 0, 0]),
            box_thickness: 2,
            suppress_radius: None,
        }
    }
}

impl MatchConfig {
    pub fn with_threshold(threshold: f32) -> DetectResult<Self> {
        let config = Self {
            threshold,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DetectResult<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(DetectError::InvalidThreshold {
                value: self.threshold,
            });
        }
        Ok(())
    }
}
