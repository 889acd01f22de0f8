//! Template matching module for locating the electrode marker in frames
//!
//! This module provides:
//! - Zero-mean normalized cross-correlation over every template placement
//! - Threshold selection of every qualifying position (no merging by default)
//! - Rectangle overlays drawn onto the original color frame
//! - Optional suppression of overlapping matches
pub mod config;
pub mod grayscale;
pub mod matcher;
pub mod types;

pub use config::{DEFAULT_THRESHOLD, MatchConfig};
pub use matcher::TemplateMatcher;
pub use types::{Match, MatchSet, ScoreSurface, Template};
