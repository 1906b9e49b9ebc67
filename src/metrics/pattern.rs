//! Patch pattern matching.
//!
//! The reference image is cut into non-overlapping square patches. For each
//! patch the candidate is searched for the window with the smallest sum of
//! squared differences, and those minima are summed. Content that is merely
//! displaced still scores near zero, unlike pixel-space L2.
//!
//! Patches are drawn from the reference only, so the score is not
//! symmetric. Trailing rows and columns that do not fill a whole patch are
//! ignored.

use std::iter::FusedIterator;

use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::LinearImage;

use super::validate_shapes;

/// Line from a patch center to the center of its best match, in (x, y)
/// pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchSegment {
    /// Center of the reference patch.
    pub from: (f32, f32),
    /// Center of the matched candidate window.
    pub to: (f32, f32),
}

/// Best match found for one reference patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchMatch {
    /// Top-left (x, y) of the reference patch.
    pub patch: (usize, usize),
    /// Top-left (x, y) of the best candidate window.
    pub best: (usize, usize),
    /// Sum of squared differences at the best window.
    pub ssd: f64,
    /// Patch edge length.
    pub patch_size: usize,
}

impl PatchMatch {
    /// Euclidean distance between patch and match origins.
    pub fn displacement(&self) -> f64 {
        let dx = self.best.0 as f64 - self.patch.0 as f64;
        let dy = self.best.1 as f64 - self.patch.1 as f64;
        (dx * dx + dy * dy).sqrt()
    }

    /// Segment for visualization, present when the match moved less than
    /// one patch width.
    pub fn segment(&self) -> Option<MatchSegment> {
        if self.displacement() >= self.patch_size as f64 {
            return None;
        }
        let half = self.patch_size as f32 / 2.0;
        Some(MatchSegment {
            from: (self.patch.0 as f32 + half, self.patch.1 as f32 + half),
            to: (self.best.0 as f32 + half, self.best.1 as f32 + half),
        })
    }
}

/// Lazy sequence of per-patch best matches, in row-major patch order.
#[derive(Debug, Clone)]
pub struct PatchMatcher<'a> {
    reference: &'a LinearImage,
    candidate: &'a LinearImage,
    patch_size: usize,
    search_radius: Option<usize>,
    columns: usize,
    rows: usize,
    next: usize,
}

impl<'a> PatchMatcher<'a> {
    /// Prepare a matcher.
    ///
    /// `search_radius` limits candidate windows to that many pixels from the
    /// patch origin on each axis; `None` searches the whole image.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ShapeMismatch`] if the images differ in shape and
    /// [`EvalError::InvalidParameter`] for a zero patch size.
    pub fn new(
        reference: &'a LinearImage,
        candidate: &'a LinearImage,
        patch_size: usize,
        search_radius: Option<usize>,
    ) -> Result<Self> {
        validate_shapes(reference, candidate)?;
        if patch_size == 0 {
            return Err(EvalError::InvalidParameter(
                "patch size must be at least 1".into(),
            ));
        }

        let columns = reference.width() / patch_size;
        let rows = reference.height() / patch_size;
        if columns == 0 || rows == 0 {
            log::warn!(
                "Patch size {} exceeds image {}; no patches to match",
                patch_size,
                reference.shape()
            );
        }

        Ok(Self {
            reference,
            candidate,
            patch_size,
            search_radius,
            columns,
            rows,
            next: 0,
        })
    }

    /// Number of patches the reference is cut into.
    pub fn patch_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Search the candidate for the window closest to the patch at `(px, py)`.
    ///
    /// Ties keep the first window in row-major order. Panics if the patch
    /// does not fit inside the image.
    pub fn best_match(&self, px: usize, py: usize) -> PatchMatch {
        let p = self.patch_size;
        let max_x = self.candidate.width() - p;
        let max_y = self.candidate.height() - p;
        let (x_range, y_range) = match self.search_radius {
            Some(r) => (
                px.saturating_sub(r)..=px.saturating_add(r).min(max_x),
                py.saturating_sub(r)..=py.saturating_add(r).min(max_y),
            ),
            None => (0..=max_x, 0..=max_y),
        };

        let mut best = (px, py);
        let mut best_ssd = f64::INFINITY;
        for wy in y_range {
            for wx in x_range.clone() {
                let ssd = self.window_ssd(px, py, wx, wy);
                if ssd < best_ssd {
                    best_ssd = ssd;
                    best = (wx, wy);
                }
            }
        }

        PatchMatch {
            patch: (px, py),
            best,
            ssd: best_ssd,
            patch_size: p,
        }
    }

    fn window_ssd(&self, px: usize, py: usize, wx: usize, wy: usize) -> f64 {
        let channels = self.reference.channels();
        let mut sum = 0.0;
        for dy in 0..self.patch_size {
            for dx in 0..self.patch_size {
                for c in 0..channels {
                    let r = self.reference.get(py + dy, px + dx, c) as f64;
                    let s = self.candidate.get(wy + dy, wx + dx, c) as f64;
                    sum += (r - s) * (r - s);
                }
            }
        }
        sum
    }
}

impl Iterator for PatchMatcher<'_> {
    type Item = PatchMatch;

    fn next(&mut self) -> Option<PatchMatch> {
        if self.next >= self.patch_count() {
            return None;
        }
        let px = (self.next % self.columns) * self.patch_size;
        let py = (self.next / self.columns) * self.patch_size;
        self.next += 1;
        Some(self.best_match(px, py))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.patch_count().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PatchMatcher<'_> {}

impl FusedIterator for PatchMatcher<'_> {}

/// Aggregated pattern-match result.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatternMatchScore {
    /// Sum of per-patch minimal SSD (lower = closer).
    pub total_ssd: f64,
    /// Number of patches matched.
    pub patches: usize,
    /// Displacement segments for visualization.
    #[serde(skip)]
    pub segments: Vec<MatchSegment>,
}

impl FromIterator<PatchMatch> for PatternMatchScore {
    fn from_iter<I: IntoIterator<Item = PatchMatch>>(iter: I) -> Self {
        let mut score = PatternMatchScore::default();
        for m in iter {
            score.total_ssd += m.ssd;
            score.patches += 1;
            if let Some(segment) = m.segment() {
                score.segments.push(segment);
            }
        }
        score
    }
}

impl std::fmt::Display for PatternMatchScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6} ({} patches)", self.total_ssd, self.patches)
    }
}

/// Match every reference patch against the candidate and total the minima.
pub fn pattern_match(
    reference: &LinearImage,
    candidate: &LinearImage,
    patch_size: usize,
    search_radius: Option<usize>,
) -> Result<PatternMatchScore> {
    Ok(PatchMatcher::new(reference, candidate, patch_size, search_radius)?.collect())
}
