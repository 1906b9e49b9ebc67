//! Pixel-space L2 distance.
//!
//! The absolute difference of two images is reduced to one Euclidean norm
//! per channel, taken over both spatial axes. Values are not normalized by
//! image size, so distances between differently sized pairs are not
//! comparable.

use ndarray::Axis;
use serde::Serialize;

use crate::error::Result;
use crate::LinearImage;

use super::{format_vector, validate_shapes};

/// Result of an L2 comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct L2Distance {
    /// Norm of the difference for each channel (lower = closer).
    pub per_channel: Vec<f64>,
}

impl L2Distance {
    /// Norm across all channels combined.
    pub fn total(&self) -> f64 {
        self.per_channel.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// Check if the images are identical.
    pub fn is_zero(&self) -> bool {
        self.per_channel.iter().all(|&v| v == 0.0)
    }
}

impl std::fmt::Display for L2Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_vector(&self.per_channel))
    }
}

/// Calculate the per-channel L2 distance between two images.
///
/// # Errors
///
/// Returns [`crate::EvalError::ShapeMismatch`] if the images differ in shape.
pub fn l2_distance(reference: &LinearImage, candidate: &LinearImage) -> Result<L2Distance> {
    validate_shapes(reference, candidate)?;

    let per_channel = reference
        .data()
        .axis_iter(Axis(2))
        .zip(candidate.data().axis_iter(Axis(2)))
        .map(|(a, b)| {
            a.iter()
                .zip(b.iter())
                .map(|(&x, &y)| {
                    let diff = (x as f64 - y as f64).abs();
                    diff * diff
                })
                .sum::<f64>()
                .sqrt()
        })
        .collect();

    Ok(L2Distance { per_channel })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_identical_images() {
        let image = LinearImage::filled(4, 4, 1, 0.5);
        let result = l2_distance(&image, &image).unwrap();
        assert_eq!(result.per_channel, vec![0.0]);
        assert!(result.is_zero());
    }

    #[test]
    fn test_l2_constant_offset() {
        // 16 samples differing by 0.25 -> sqrt(16 * 0.0625) = 1.0
        let a = LinearImage::filled(4, 4, 1, 0.25);
        let b = LinearImage::filled(4, 4, 1, 0.5);
        let result = l2_distance(&a, &b).unwrap();
        assert!((result.per_channel[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_l2_per_channel() {
        let a = LinearImage::filled(2, 2, 3, 0.0);
        let b = LinearImage::from_fn(2, 2, 3, |_, _, c| if c == 1 { 0.5 } else { 0.0 });
        let result = l2_distance(&a, &b).unwrap();
        assert_eq!(result.per_channel.len(), 3);
        assert_eq!(result.per_channel[0], 0.0);
        assert!((result.per_channel[1] - 1.0).abs() < 1e-9);
        assert_eq!(result.per_channel[2], 0.0);
        assert!((result.total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_l2_symmetric() {
        let a = LinearImage::from_fn(5, 7, 1, |y, x, _| ((y * 7 + x) % 5) as f32 / 5.0);
        let b = LinearImage::from_fn(5, 7, 1, |y, x, _| ((x * 3 + y) % 4) as f32 / 4.0);
        let ab = l2_distance(&a, &b).unwrap();
        let ba = l2_distance(&b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_l2_display() {
        let result = L2Distance {
            per_channel: vec![0.5],
        };
        assert_eq!(result.to_string(), "[0.500000]");
    }
}
