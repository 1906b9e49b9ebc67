//! PSNR (Peak Signal-to-Noise Ratio) calculation.
//!
//! PSNR measures reconstruction fidelity relative to the maximum signal
//! power. Linear images span [0, 1], so the peak value is 1.0.
//! Higher values indicate a closer match.
//!
//! - Identical images: PSNR = infinity (MSE = 0)
//! - Very close: PSNR > 40 dB
//! - Close: PSNR 30-40 dB
//! - Noticeably different: PSNR 20-30 dB

use ndarray::Axis;
use serde::Serialize;

use crate::error::Result;
use crate::LinearImage;

use super::validate_shapes;

/// Peak sample value of a linear image.
const DATA_RANGE: f64 = 1.0;

/// Result of PSNR calculation.
#[derive(Debug, Clone, Serialize)]
pub struct PsnrResult {
    /// PSNR value in decibels (higher = closer).
    /// `f64::INFINITY` for identical images; serialized as `null`.
    pub psnr_db: f64,

    /// Mean Squared Error between images.
    /// 0.0 indicates identical images.
    pub mse: f64,

    /// Per-channel PSNR for multi-channel images.
    /// None for single-channel (grayscale) images.
    pub per_channel: Option<Vec<f64>>,
}

impl PsnrResult {
    /// Check if the images are identical.
    pub fn is_identical(&self) -> bool {
        self.mse == 0.0
    }

    /// Get a rating based on PSNR value.
    pub fn rating(&self) -> &'static str {
        if self.psnr_db.is_infinite() {
            "identical"
        } else if self.psnr_db > 50.0 {
            "excellent"
        } else if self.psnr_db > 40.0 {
            "very good"
        } else if self.psnr_db > 30.0 {
            "good"
        } else if self.psnr_db > 20.0 {
            "fair"
        } else {
            "poor"
        }
    }
}

impl std::fmt::Display for PsnrResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.psnr_db.is_infinite() {
            write!(f, "inf dB ({})", self.rating())
        } else {
            write!(f, "{:.4} dB ({})", self.psnr_db, self.rating())
        }
    }
}

/// Calculate PSNR between a reference and a candidate image.
///
/// # Errors
///
/// Returns [`crate::EvalError::ShapeMismatch`] if the images differ in shape.
///
/// # Example
///
/// ```rust,ignore
/// use imgeval::metrics::calculate_psnr;
///
/// let result = calculate_psnr(&ground_truth, &candidate)?;
/// println!("PSNR: {:.2} dB", result.psnr_db);
/// ```
pub fn calculate_psnr(reference: &LinearImage, candidate: &LinearImage) -> Result<PsnrResult> {
    validate_shapes(reference, candidate)?;

    let per_channel = if reference.channels() > 1 {
        let values = reference
            .data()
            .axis_iter(Axis(2))
            .zip(candidate.data().axis_iter(Axis(2)))
            .map(|(a, b)| psnr_from_mse(calculate_mse(a.iter(), b.iter())))
            .collect();
        Some(values)
    } else {
        None
    };

    let mse = calculate_mse(reference.data().iter(), candidate.data().iter());

    Ok(PsnrResult {
        psnr_db: psnr_from_mse(mse),
        mse,
        per_channel,
    })
}

fn psnr_from_mse(mse: f64) -> f64 {
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (DATA_RANGE * DATA_RANGE / mse).log10()
    }
}

/// Calculate Mean Squared Error between two sample sequences.
fn calculate_mse<'a, A, B>(reference: A, candidate: B) -> f64
where
    A: Iterator<Item = &'a f32>,
    B: Iterator<Item = &'a f32>,
{
    let (sum, count) = reference
        .zip(candidate)
        .fold((0.0f64, 0usize), |(sum, count), (&r, &c)| {
            let diff = r as f64 - c as f64;
            (sum + diff * diff, count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_psnr_identical_images() {
        let image = LinearImage::filled(4, 4, 1, 0.5);
        let result = calculate_psnr(&image, &image).unwrap();
        assert!(result.psnr_db.is_infinite());
        assert_eq!(result.mse, 0.0);
        assert!(result.is_identical());
        assert_eq!(result.to_string(), "inf dB (identical)");
    }

    #[test]
    fn test_psnr_different_images() {
        let a = LinearImage::filled(16, 16, 1, 0.5);
        let b = LinearImage::filled(16, 16, 1, 0.6);

        let result = calculate_psnr(&a, &b).unwrap();
        // MSE = 0.1^2 = 0.01 -> PSNR = 20 dB
        assert!((result.mse - 0.01).abs() < 1e-6);
        assert!((result.psnr_db - 20.0).abs() < 1e-3);
        assert!(result.per_channel.is_none());
    }

    #[test]
    fn test_psnr_per_channel() {
        let a = LinearImage::filled(4, 4, 3, 0.5);
        let b = LinearImage::from_fn(4, 4, 3, |_, _, c| if c == 0 { 0.5 } else { 0.6 });

        let result = calculate_psnr(&a, &b).unwrap();
        let channels = result.per_channel.unwrap();
        assert_eq!(channels.len(), 3);
        assert!(channels[0].is_infinite());
        assert!((channels[1] - 20.0).abs() < 1e-3);
        assert!(result.psnr_db.is_finite());
    }

    #[test]
    fn test_psnr_symmetric() {
        let a = LinearImage::from_fn(6, 6, 1, |y, x, _| (y * 6 + x) as f32 / 36.0);
        let b = LinearImage::filled(6, 6, 1, 0.3);
        let ab = calculate_psnr(&a, &b).unwrap();
        let ba = calculate_psnr(&b, &a).unwrap();
        assert_eq!(ab.psnr_db, ba.psnr_db);
    }

    #[test]
    fn test_psnr_ratings() {
        let close = PsnrResult {
            psnr_db: 55.0,
            mse: 1e-6,
            per_channel: None,
        };
        assert_eq!(close.rating(), "excellent");

        let far = PsnrResult {
            psnr_db: 15.0,
            mse: 0.03,
            per_channel: None,
        };
        assert_eq!(far.rating(), "poor");
    }

    #[test]
    fn test_infinite_psnr_serializes_as_null() {
        let image = LinearImage::filled(2, 2, 1, 0.1);
        let result = calculate_psnr(&image, &image).unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert!(json["psnr_db"].is_null());
    }
}
