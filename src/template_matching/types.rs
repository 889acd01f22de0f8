//! Template matching data types
use super::grayscale::image_to_gray;
use crate::error::{DetectError, DetectResult};
use image::GrayImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Grayscale reference image, loaded once and shared read-only by every match call
#[derive(Clone, Debug)]
pub struct Template {
    /// Where the template was loaded from (empty for in-memory templates)
    pub path: PathBuf,
    image: GrayImage,
    /// Template pixels with the mean removed, row-major
    zero_mean: Vec<f64>,
    /// sqrt(Σ(T - T̄)²)
    norm: f64,
}

/// A single match result
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    /// Top-left X coordinate in the frame
    pub x: u32,
    /// Top-left Y coordinate in the frame
    pub y: u32,
    /// Correlation coefficient (-1.0..=1.0)
    pub score: f32,
}

/// Every position whose score cleared the threshold, in row-major scan order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MatchSet {
    matches: Vec<Match>,
}

/// Correlation score for every valid template placement
#[derive(Clone, Debug)]
pub struct ScoreSurface {
    width: u32,
    height: u32,
    scores: Vec<f32>,
}

impl Template {
    /// Load a template from disk and convert it to grayscale
    pub fn load(path: impl AsRef<Path>) -> DetectResult<Self> {
        let path = path.as_ref().to_path_buf();
        let image = image::open(&path).map_err(|source| DetectError::TemplateLoadFailed {
            path: path.clone(),
            source,
        })?;
        Self::from_image(path, image_to_gray(image))
    }

    /// Build a template from an in-memory grayscale image
    pub fn from_image(path: impl Into<PathBuf>, image: GrayImage) -> DetectResult<Self> {
        let path = path.into();
        if image.width() == 0 || image.height() == 0 {
            return Err(DetectError::EmptyTemplate { path });
        }

        let count = (image.width() * image.height()) as f64;
        let mean = image.pixels().map(|p| p[0] as f64).sum::<f64>() / count;
        let zero_mean: Vec<f64> = image.pixels().map(|p| p[0] as f64 - mean).collect();
        let norm = zero_mean.iter().map(|v| v * v).sum::<f64>().sqrt();

        log::debug!(
            "Template {:?} loaded: {}x{}, mean={:.1}",
            path,
            image.width(),
            image.height(),
            mean
        );

        Ok(Self {
            path,
            image,
            zero_mean,
            norm,
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub(crate) fn zero_mean(&self) -> &[f64] {
        &self.zero_mean
    }

    pub(crate) fn norm(&self) -> f64 {
        self.norm
    }

    /// A constant template has no texture to correlate against
    pub fn is_flat(&self) -> bool {
        self.norm < f64::EPSILON
    }
}

impl MatchSet {
    pub fn new(matches: Vec<Match>) -> Self {
        Self { matches }
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        self.matches.iter().any(|m| m.x == x && m.y == y)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&Match> {
        self.matches.iter().find(|m| m.x == x && m.y == y)
    }

    /// Highest scoring match, if any
    pub fn best(&self) -> Option<&Match> {
        self.matches.iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    /// Keep only matches with no stronger neighbour within `radius` pixels on both axes.
    ///
    /// Ties are broken by scan order, so of two equal neighbours the first one wins. Kept
    /// matches are bucketed into `radius + 1` cells, so each candidate only checks the 3x3
    /// cells around it.
    pub fn suppressed(&self, radius: u32) -> MatchSet {
        let mut order: Vec<usize> = (0..self.matches.len()).collect();
        order.sort_by(|&a, &b| {
            self.matches[b]
                .score
                .partial_cmp(&self.matches[a].score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });

        let cell = radius.saturating_add(1);
        let mut grid: HashMap<(u32, u32), Vec<Match>> = HashMap::new();
        let mut kept: Vec<Match> = Vec::new();
        for idx in order {
            let candidate = self.matches[idx];
            let (cx, cy) = (candidate.x / cell, candidate.y / cell);
            let overlaps = (cy.saturating_sub(1)..=cy.saturating_add(1)).any(|gy| {
                (cx.saturating_sub(1)..=cx.saturating_add(1)).any(|gx| {
                    grid.get(&(gx, gy)).is_some_and(|bucket| {
                        bucket.iter().any(|k| {
                            k.x.abs_diff(candidate.x) <= radius
                                && k.y.abs_diff(candidate.y) <= radius
                        })
                    })
                })
            });
            if !overlaps {
                grid.entry((cx, cy)).or_default().push(candidate);
                kept.push(candidate);
            }
        }

        kept.sort_by_key(|m| (m.y, m.x));
        MatchSet { matches: kept }
    }
}

impl<'a> IntoIterator for &'a MatchSet {
    type Item = &'a Match;
    type IntoIter = std::slice::Iter<'a, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

impl ScoreSurface {
    pub(crate) fn new(width: u32, height: u32, scores: Vec<f32>) -> Self {
        debug_assert_eq!(scores.len(), (width * height) as usize);
        Self {
            width,
            height,
            scores,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.scores.get((y * self.width + x) as usize).copied()
    }

    /// Iterate `(x, y, score)` in row-major order
    pub fn enumerate(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        let width = self.width;
        self.scores
            .iter()
            .enumerate()
            .map(move |(i, &s)| (i as u32 % width, i as u32 / width, s))
    }

    /// All positions scoring at least `threshold`
    pub fn threshold(&self, threshold: f32) -> MatchSet {
        MatchSet::new(
            self.enumerate()
                .filter(|&(_, _, score)| score >= threshold)
                .map(|(x, y, score)| Match { x, y, score })
                .collect(),
        )
    }

    pub fn max(&self) -> Option<Match> {
        self.enumerate()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(x, y, score)| Match { x, y, score })
    }
}
