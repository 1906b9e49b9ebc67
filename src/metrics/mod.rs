//! Image similarity metrics.
//!
//! Every metric is a pure function of two linear images of identical shape:
//! - **L2**: per-channel norm of the pixel difference
//! - **Spectrum**: centered log-magnitude FFT, compared with L2
//! - **SSIM** (Structural Similarity Index): perceptual structure comparison
//! - **PSNR** (Peak Signal-to-Noise Ratio): pixel-level fidelity in dB
//! - **Feature distance**: L2 between deep feature vectors
//! - **Pattern match**: summed best-match SSD of reference patches
//!
//! # Example
//!
//! ```rust,ignore
//! use imgeval::metrics::{calculate_psnr, calculate_ssim, l2_distance, SsimConfig};
//!
//! let l2 = l2_distance(&ground_truth, &candidate)?;
//! let psnr = calculate_psnr(&ground_truth, &candidate)?;
//! let ssim = calculate_ssim(&ground_truth, &candidate, &SsimConfig::default())?;
//! println!("{} / {} / {}", l2, psnr, ssim);
//! ```

mod deep;
mod l2;
mod pattern;
mod psnr;
mod spectrum;
mod ssim;

pub use deep::{feature_distance, vector_distance, FeatureDistance};
pub use l2::{l2_distance, L2Distance};
pub use pattern::{pattern_match, MatchSegment, PatchMatch, PatchMatcher, PatternMatchScore};
pub use psnr::{calculate_psnr, PsnrResult};
pub use spectrum::{frequency_spectrum, FrequencySpectrum, SPECTRUM_FLOOR};
pub use ssim::{calculate_ssim, SsimConfig, SsimResult};

use crate::error::{EvalError, Result};
use crate::LinearImage;

/// Validate that two images can be compared.
pub(crate) fn validate_shapes(reference: &LinearImage, candidate: &LinearImage) -> Result<()> {
    let (a, b) = (reference.shape(), candidate.shape());
    if a != b {
        return Err(EvalError::ShapeMismatch(format!(
            "reference is {} but candidate is {}",
            a, b
        )));
    }
    Ok(())
}

/// Format a per-channel vector the way it is printed in reports.
pub(crate) fn format_vector(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
    format!("[{}]", parts.join(" "))
}
