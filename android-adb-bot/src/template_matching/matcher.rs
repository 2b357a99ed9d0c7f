/// Template matching implementation
///
/// Zero-mean normalized cross-correlation: the score of a position is the
/// Pearson correlation between the reference and the screen window under
/// it, so it ignores brightness offset and contrast scale.
///
/// Screens wider than the matcher's working width are searched at reduced
/// resolution (screen and reference shrunk by the same factor) and hits are
/// mapped back to screen coordinates.
use super::nms::{DEFAULT_OVERLAP_THRESHOLD, non_max_suppression};
use super::types::{MatchCandidate, RegionOfInterest};
use image::GrayImage;
use image::imageops::{self, FilterType};
use imageproc::template_matching::{MatchTemplateMethod, match_template_parallel};
use std::borrow::Cow;

/// Widest screen searched at full resolution.
pub const DEFAULT_MAX_WIDTH: u32 = 960;

/// Windows (or references) whose variance per pixel is below this are
/// treated as flat and never match.
const MIN_VARIANCE_PER_PIXEL: f64 = 1.0;

/// Finds every occurrence of a reference image in a screen buffer.
pub struct TemplateMatcher {
    overlap_threshold: f32,
    max_width: u32,
}

impl TemplateMatcher {
    pub fn new() -> Self {
        Self::with_max_width(DEFAULT_MAX_WIDTH)
    }

    /// Matcher that shrinks screens wider than `max_width` before searching.
    pub fn with_max_width(max_width: u32) -> Self {
        Self {
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            max_width: max_width.max(1),
        }
    }

    /// All boxes whose anchor lies in `roi` and whose score is at least
    /// `threshold`, with overlapping duplicates suppressed.
    ///
    /// "Not found" is an empty list, never an error.
    pub fn find_matches(
        &self,
        reference: &GrayImage,
        screen: &GrayImage,
        roi: RegionOfInterest,
        threshold: f32,
    ) -> Vec<MatchCandidate> {
        let raw = self.raw_matches(reference, screen, roi, threshold);
        let raw_count = raw.len();
        let kept = non_max_suppression(raw, self.overlap_threshold);
        if raw_count > 0 {
            log::debug!(
                "🔍 {} positions >= {:.2}, {} after suppression",
                raw_count,
                threshold,
                kept.len()
            );
        }
        kept
    }

    /// Every accepted position before suppression.
    pub fn raw_matches(
        &self,
        reference: &GrayImage,
        screen: &GrayImage,
        roi: RegionOfInterest,
        threshold: f32,
    ) -> Vec<MatchCandidate> {
        let Some(scores) = ScoreMap::compute(reference, screen, roi, self.max_width) else {
            return Vec::new();
        };
        let (tw, th) = reference.dimensions();
        scores
            .iter()
            .filter(|&(_, _, score)| score >= threshold)
            .map(|(x, y, score)| MatchCandidate::new(x, y, tw, th, score))
            .collect()
    }

    /// Highest score anywhere in `roi`, for diagnostics.
    pub fn best_score(
        &self,
        reference: &GrayImage,
        screen: &GrayImage,
        roi: RegionOfInterest,
    ) -> Option<f32> {
        ScoreMap::compute(reference, screen, roi, self.max_width)?
            .iter()
            .map(|(_, _, score)| score)
            .max_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Correlation score for every anchor position inside a region.
struct ScoreMap {
    origin_x: u32,
    origin_y: u32,
    width: u32,
    /// Searched size over screen size, 1.0 at full resolution
    scale: f64,
    /// Largest anchor offset from the origin, in screen pixels
    max_dx: u32,
    max_dy: u32,
    scores: Vec<f32>,
}

impl ScoreMap {
    fn compute(
        reference: &GrayImage,
        screen: &GrayImage,
        roi: RegionOfInterest,
        max_width: u32,
    ) -> Option<Self> {
        let (sw, sh) = screen.dimensions();
        let (tw, th) = reference.dimensions();
        if tw == 0 || th == 0 || tw > sw || th > sh {
            return None;
        }

        // Anchors may sit anywhere in the region as long as the reference
        // still fits on screen.
        let roi = roi.resolve(sw, sh);
        let max_ax = roi.x2.min(sw - tw);
        let max_ay = roi.y2.min(sh - th);
        if roi.x1 > max_ax || roi.y1 > max_ay {
            return None;
        }

        let area_w = max_ax - roi.x1 + tw;
        let area_h = max_ay - roi.y1 + th;
        let area = imageops::crop_imm(screen, roi.x1, roi.y1, area_w, area_h).to_image();

        let scale = if sw > max_width {
            max_width as f64 / sw as f64
        } else {
            1.0
        };
        let (area, reference) = if scale < 1.0 {
            (shrink(&area, scale), Cow::Owned(shrink(reference, scale)))
        } else {
            (area, Cow::Borrowed(reference))
        };

        let stats = ReferenceStats::new(&reference)?;
        let (rw, rh) = reference.dimensions();
        let cross =
            match_template_parallel(&area, &reference, MatchTemplateMethod::CrossCorrelation);
        let sums = SummedArea::new(&area);

        let scores = cross
            .enumerate_pixels()
            .map(|(x, y, pixel)| {
                let (sum, sum_sq) = sums.window(x, y, rw, rh);
                stats.score(pixel[0] as f64, sum, sum_sq)
            })
            .collect();

        Some(Self {
            origin_x: roi.x1,
            origin_y: roi.y1,
            width: cross.width(),
            scale,
            max_dx: max_ax - roi.x1,
            max_dy: max_ay - roi.y1,
            scores,
        })
    }

    /// `(screen_x, screen_y, score)` for every anchor.
    fn iter(&self) -> impl Iterator<Item = (u32, u32, f32)> + '_ {
        self.scores.iter().enumerate().map(|(i, &score)| {
            let i = i as u32;
            let dx = self.to_screen(i % self.width).min(self.max_dx);
            let dy = self.to_screen(i / self.width).min(self.max_dy);
            (self.origin_x + dx, self.origin_y + dy, score)
        })
    }

    fn to_screen(&self, offset: u32) -> u32 {
        if self.scale < 1.0 {
            (offset as f64 / self.scale).round() as u32
        } else {
            offset
        }
    }
}

/// `image` shrunk by `scale`, never below 1×1.
fn shrink(image: &GrayImage, scale: f64) -> GrayImage {
    let width = ((image.width() as f64 * scale).round() as u32).max(1);
    let height = ((image.height() as f64 * scale).round() as u32).max(1);
    imageops::resize(image, width, height, FilterType::Triangle)
}

struct ReferenceStats {
    pixels: f64,
    sum: f64,
    /// Sum of squared deviations from the mean
    variance_sum: f64,
}

impl ReferenceStats {
    fn new(reference: &GrayImage) -> Option<Self> {
        let pixels = (reference.width() as u64 * reference.height() as u64) as f64;
        let (sum, sum_sq) = reference.pixels().fold((0u64, 0u64), |(s, q), p| {
            let v = p[0] as u64;
            (s + v, q + v * v)
        });
        let sum = sum as f64;
        let variance_sum = sum_sq as f64 - sum * sum / pixels;
        if variance_sum < pixels * MIN_VARIANCE_PER_PIXEL {
            log::debug!("⚠️ Reference image is flat, it can not be located");
            return None;
        }
        Some(Self {
            pixels,
            sum,
            variance_sum,
        })
    }

    fn score(&self, cross: f64, window_sum: u64, window_sum_sq: u64) -> f32 {
        let window_sum = window_sum as f64;
        let window_variance = window_sum_sq as f64 - window_sum * window_sum / self.pixels;
        if window_variance < self.pixels * MIN_VARIANCE_PER_PIXEL {
            return 0.0;
        }
        let numerator = cross - window_sum * self.sum / self.pixels;
        let score = numerator / (window_variance * self.variance_sum).sqrt();
        score.clamp(-1.0, 1.0) as f32
    }
}

/// Summed-area tables of pixel values and squared pixel values.
struct SummedArea {
    stride: usize,
    sum: Vec<u64>,
    sum_sq: Vec<u64>,
}

impl SummedArea {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sum_sq = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = image.get_pixel(x as u32, y as u32)[0] as u64;
                row += v;
                row_sq += v * v;
                let idx = (y + 1) * stride + x + 1;
                sum[idx] = sum[idx - stride] + row;
                sum_sq[idx] = sum_sq[idx - stride] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    /// `(sum, sum of squares)` of the `w`×`h` window at `(x, y)`.
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (u64, u64) {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        let at = |table: &[u64]| {
            table[y1 * self.stride + x1] + table[y0 * self.stride + x0]
                - table[y0 * self.stride + x1]
                - table[y1 * self.stride + x0]
        };
        (at(&self.sum), at(&self.sum_sq))
    }
}
