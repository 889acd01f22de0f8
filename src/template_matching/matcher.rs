//! Template matching implementation
//!
//! Zero-mean normalized cross-correlation over every template placement, with window
//! statistics taken from summed-area tables.
use super::config::MatchConfig;
use super::grayscale::rgb_to_gray;
use super::types::{MatchSet, ScoreSurface, Template};
use crate::error::{DetectError, DetectResult};
use image::{GrayImage, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

/// Template matcher for locating the reference pattern in frames
#[derive(Debug, Clone)]
pub struct TemplateMatcher {
    config: MatchConfig,
}

/// Summed-area tables of pixel values and squared pixel values
struct WindowSums {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl WindowSums {
    fn new(image: &GrayImage) -> Self {
        let width = image.width() as usize;
        let height = image.height() as usize;
        let stride = width + 1;
        let mut sum = vec![0u64; stride * (height + 1)];
        let mut sum_sq = vec![0u64; stride * (height + 1)];

        for (y, row) in image.as_raw().chunks_exact(width).enumerate() {
            let mut row_sum = 0u64;
            let mut row_sum_sq = 0u64;
            for (x, &value) in row.iter().enumerate() {
                let value = value as u64;
                row_sum += value;
                row_sum_sq += value * value;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sum_sq;
            }
        }

        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// (Σv, Σv²) over the window with top-left (x, y)
    fn window(&self, x: usize, y: usize, width: usize, height: usize) -> (u64, u64) {
        let top_left = y * self.stride + x;
        let top_right = top_left + width;
        let bottom_left = (y + height) * self.stride + x;
        let bottom_right = bottom_left + width;

        let area = |table: &[u64]| {
            (table[bottom_right] + table[top_left]) - (table[top_right] + table[bottom_left])
        };
        (area(&self.sum), area(&self.sum_sq))
    }
}

impl TemplateMatcher {
    pub fn new(config: MatchConfig) -> DetectResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Compute the correlation score at every valid placement of `template` in `frame`.
    ///
    /// The surface is `(frame_width - template_width + 1) x (frame_height - template_height + 1)`.
    /// A constant template scores 1.0 everywhere; a constant window scores 0.0 against a
    /// textured template.
    pub fn score_surface(
        &self,
        frame: &GrayImage,
        template: &Template,
    ) -> DetectResult<ScoreSurface> {
        check_dimensions(frame, template)?;

        let frame_width = frame.width() as usize;
        let tw = template.width() as usize;
        let th = template.height() as usize;
        let out_width = frame.width() - template.width() + 1;
        let out_height = frame.height() - template.height() + 1;
        let positions = (out_width * out_height) as usize;

        if template.is_flat() {
            return Ok(ScoreSurface::new(
                out_width,
                out_height,
                vec![1.0; positions],
            ));
        }

        let sums = WindowSums::new(frame);
        let pixels = frame.as_raw();
        let zero_mean = template.zero_mean();
        let template_norm = template.norm();
        let count = (tw * th) as u128;

        let mut scores = Vec::with_capacity(positions);
        for y in 0..out_height as usize {
            for x in 0..out_width as usize {
                let (sum, sum_sq) = sums.window(x, y, tw, th);
                // n·Σv² - (Σv)² is exact in integers and never negative
                let spread = count * sum_sq as u128 - (sum as u128) * (sum as u128);
                let window_norm = (spread as f64 / count as f64).sqrt();

                // Σ(I - Ī)(T - T̄) == Σ I·(T - T̄) because Σ(T - T̄) == 0
                let mut numerator = 0.0f64;
                for ty in 0..th {
                    let start = (y + ty) * frame_width + x;
                    let row = &pixels[start..start + tw];
                    let template_row = &zero_mean[ty * tw..(ty + 1) * tw];
                    numerator += row
                        .iter()
                        .zip(template_row)
                        .map(|(&p, &t)| p as f64 * t)
                        .sum::<f64>();
                }

                scores.push(normalize(numerator, window_norm * template_norm));
            }
        }

        Ok(ScoreSurface::new(out_width, out_height, scores))
    }

    /// All placements scoring at or above the configured threshold
    pub fn find_matches(&self, frame: &GrayImage, template: &Template) -> DetectResult<MatchSet> {
        let surface = self.score_surface(frame, template)?;
        let matches = surface.threshold(self.config.threshold);

        if let Some(best) = surface.max() {
            log::debug!(
                "{} positions >= {:.2} (best {:.3} at {},{})",
                matches.len(),
                self.config.threshold,
                best.score,
                best.x,
                best.y
            );
        }

        Ok(matches)
    }

    /// Match `template` against a color frame and draw every match onto it in place
    pub fn process_frame(
        &self,
        frame: &mut RgbImage,
        template: &Template,
    ) -> DetectResult<MatchSet> {
        let gray = rgb_to_gray(frame);
        let mut matches = self.find_matches(&gray, template)?;

        if let Some(radius) = self.config.suppress_radius {
            matches = matches.suppressed(radius);
        }

        self.annotate(frame, &matches, template);
        Ok(matches)
    }

    /// Draw an unfilled rectangle the size of the template at every match position
    pub fn annotate(&self, frame: &mut RgbImage, matches: &MatchSet, template: &Template) {
        for m in matches {
            draw_box(
                frame,
                m.x,
                m.y,
                template.width(),
                template.height(),
                &self.config,
            );
        }
    }
}

fn check_dimensions(frame: &GrayImage, template: &Template) -> DetectResult<()> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(DetectError::EmptyFrame);
    }
    if template.width() > frame.width() || template.height() > frame.height() {
        return Err(DetectError::TemplateLargerThanFrame {
            template_width: template.width(),
            template_height: template.height(),
            frame_width: frame.width(),
            frame_height: frame.height(),
        });
    }
    Ok(())
}

/// Turn a raw correlation into a coefficient, tolerating rounding just past ±1.
fn normalize(numerator: f64, denominator: f64) -> f32 {
    let score = if numerator.abs() < denominator {
        numerator / denominator
    } else if numerator.abs() < denominator * 1.125 {
        numerator.signum()
    } else {
        // Flat window: nothing to correlate with
        0.0
    };
    score.clamp(-1.0, 1.0) as f32
}

/// Corners span (x, y)..=(x + width, y + height). The stroke is centred on that outline the way
/// `cv::rectangle` centres it: a 2 px box covers one pixel outside and the outline itself.
fn draw_box(frame: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, config: &MatchConfig) {
    let thickness = config.box_thickness as i32;
    let outer = thickness / 2;
    for offset in -outer..thickness - outer {
        let w = width as i64 + 1 - 2 * offset as i64;
        let h = height as i64 + 1 - 2 * offset as i64;
        if w <= 0 || h <= 0 {
            break;
        }
        // Pixels falling outside the frame are clipped by the drawing routine
        let rect = Rect::at(x as i32 + offset, y as i32 + offset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(frame, rect, config.box_color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma, Rgb};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(width: u32, height: u32, seed: u64) -> GrayImage {
        let mut rng = StdRng::seed_from_u64(seed);
        GrayImage::from_fn(width, height, |_, _| Luma([rng.random::<u8>()]))
    }

    /// 20x20 bright cross on a dark background
    fn cross() -> GrayImage {
        GrayImage::from_fn(20, 20, |x, y| {
            if x.abs_diff(10) < 3 || y.abs_diff(10) < 3 {
                Luma([230])
            } else {
                Luma([20])
            }
        })
    }

    fn paste(frame: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
        image::imageops::replace(frame, patch, x as i64, y as i64);
    }

    fn matcher(threshold: f32) -> TemplateMatcher {
        TemplateMatcher::new(MatchConfig::with_threshold(threshold).unwrap()).unwrap()
    }

    #[test]
    fn test_exact_copy_scores_one() {
        let patch = noise(12, 9, 1);
        let mut frame = noise(64, 48, 2);
        paste(&mut frame, &patch, 17, 23);
        let template = Template::from_image("patch", patch).unwrap();

        let surface = matcher(0.3).score_surface(&frame, &template).unwrap();
        let score = surface.get(17, 23).unwrap();
        assert!((score - 1.0).abs() < 1e-5, "exact copy scored {score}");

        let best = surface.max().unwrap();
        assert_eq!((best.x, best.y), (17, 23));

        let matches = matcher(0.3).find_matches(&frame, &template).unwrap();
        assert!(matches.contains(17, 23));
    }

    #[test]
    fn test_surface_dimensions() {
        let frame = noise(50, 40, 3);
        for (tw, th) in [(1, 1), (7, 5), (50, 1), (1, 40), (50, 40), (13, 29)] {
            let template = Template::from_image("t", noise(tw, th, 4)).unwrap();
            let surface = matcher(0.3).score_surface(&frame, &template).unwrap();
            assert_eq!(surface.width(), 50 - tw + 1);
            assert_eq!(surface.height(), 40 - th + 1);
        }
    }

    #[test]
    fn test_noise_yields_few_matches() {
        let template = Template::from_image("cross", cross()).unwrap();
        let frame = noise(160, 120, 42);

        let matches = matcher(0.3).find_matches(&frame, &template).unwrap();
        assert!(
            matches.len() <= 3,
            "noise produced {} matches",
            matches.len()
        );
    }

    #[test]
    fn test_threshold_monotonic() {
        let template = Template::from_image("cross", cross()).unwrap();
        let mut frame = noise(90, 70, 7);
        paste(&mut frame, &cross(), 30, 25);

        let thresholds = [0.0, 0.1, 0.2, 0.3, 0.5, 0.7, 0.9, 1.0];
        let sets: Vec<MatchSet> = thresholds
            .iter()
            .map(|&t| matcher(t).find_matches(&frame, &template).unwrap())
            .collect();

        for pair in sets.windows(2) {
            let (lower, higher) = (&pair[0], &pair[1]);
            assert!(higher.len() <= lower.len());
            assert!(higher.iter().all(|m| lower.contains(m.x, m.y)));
        }
        assert!(sets[3].contains(30, 25));
    }

    #[test]
    fn test_matching_is_idempotent() {
        let template = Template::from_image("cross", cross()).unwrap();
        let mut frame = noise(80, 60, 11);
        paste(&mut frame, &cross(), 5, 9);

        let m = matcher(0.3);
        let first = m.find_matches(&frame, &template).unwrap();
        let second = m.find_matches(&frame, &template).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_white_square_on_black() {
        let square = GrayImage::from_pixel(10, 10, Luma([255]));
        let mut frame = GrayImage::new(100, 100);
        paste(&mut frame, &square, 20, 30);
        let template = Template::from_image("square", square).unwrap();

        let matches = matcher(0.3).find_matches(&frame, &template).unwrap();
        assert!(matches.contains(20, 30));
        assert!(matches.iter().all(|m| m.score >= 0.3));
        assert!(matches.get(20, 30).unwrap().score >= 0.999);
    }

    #[test]
    fn test_flat_window_scores_zero() {
        let template = Template::from_image("cross", cross()).unwrap();
        let mut frame = GrayImage::new(60, 60);
        paste(&mut frame, &cross(), 40, 40);

        let surface = matcher(0.3).score_surface(&frame, &template).unwrap();
        assert_eq!(surface.get(0, 0), Some(0.0));
        assert!(surface.get(40, 40).unwrap() > 0.999);
    }

    #[test]
    fn test_template_larger_than_frame() {
        let template = Template::from_image("big", noise(30, 10, 5)).unwrap();
        let frame = noise(20, 20, 6);

        let err = matcher(0.3).score_surface(&frame, &template).unwrap_err();
        assert!(matches!(
            err,
            DetectError::TemplateLargerThanFrame {
                template_width: 30,
                frame_width: 20,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_frame_rejected() {
        let template = Template::from_image("t", noise(3, 3, 5)).unwrap();
        let mut frame = RgbImage::new(0, 0);
        let err = matcher(0.3).process_frame(&mut frame, &template).unwrap_err();
        assert!(matches!(err, DetectError::EmptyFrame));
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        assert!(MatchConfig::with_threshold(1.5).is_err());
        assert!(MatchConfig::with_threshold(f32::NAN).is_err());

        let config = MatchConfig {
            threshold: -0.1,
            ..MatchConfig::default()
        };
        assert!(matches!(
            TemplateMatcher::new(config),
            Err(DetectError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_annotation_draws_red_border() {
        let patch = noise(16, 12, 21);
        let mut gray = GrayImage::new(80, 60);
        paste(&mut gray, &patch, 30, 20);
        let mut frame = DynamicImage::ImageLuma8(gray).to_rgb8();
        let original = frame.clone();
        let template = Template::from_image("patch", patch).unwrap();

        let matches = matcher(0.95).process_frame(&mut frame, &template).unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches.contains(30, 20));

        let red = Rgb([255, 0, 0]);
        // The outline spans the template size inclusive
        assert_eq!(*frame.get_pixel(30, 20), red);
        assert_eq!(*frame.get_pixel(46, 32), red);
        // Second pixel of the 2px stroke sits outside the outline
        assert_eq!(*frame.get_pixel(29, 19), red);
        assert_eq!(*frame.get_pixel(47, 33), red);
        assert_eq!(frame.get_pixel(31, 21), original.get_pixel(31, 21));
        // Inside the border and elsewhere the frame is untouched
        assert_eq!(frame.get_pixel(35, 25), original.get_pixel(35, 25));
        assert_eq!(frame.get_pixel(5, 5), original.get_pixel(5, 5));
    }

    #[test]
    fn test_box_at_frame_corner_is_clipped() {
        let mut frame = RgbImage::new(20, 20);
        let config = MatchConfig::default();
        draw_box(&mut frame, 0, 0, 5, 5, &config);

        let red = Rgb([255, 0, 0]);
        assert_eq!(*frame.get_pixel(0, 0), red);
        assert_eq!(*frame.get_pixel(5, 5), red);
        assert_eq!(*frame.get_pixel(6, 6), red);
        assert_eq!(*frame.get_pixel(3, 3), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_suppression_collapses_overlapping_boxes() {
        let square = GrayImage::from_pixel(10, 10, Luma([255]));
        let mut gray = GrayImage::new(100, 100);
        paste(&mut gray, &square, 20, 30);
        let mut frame = DynamicImage::ImageLuma8(gray).to_rgb8();
        let template = Template::from_image("square", square).unwrap();

        let raw = matcher(0.3)
            .process_frame(&mut frame.clone(), &template)
            .unwrap();
        assert!(raw.len() > 1);

        let config = MatchConfig {
            suppress_radius: Some(200),
            ..MatchConfig::default()
        };
        let suppressed = TemplateMatcher::new(config)
            .unwrap()
            .process_frame(&mut frame, &template)
            .unwrap();
        assert_eq!(suppressed.len(), 1);
    }
}
