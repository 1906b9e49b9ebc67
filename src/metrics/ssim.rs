//! SSIM (Structural Similarity Index) calculation.
//!
//! SSIM compares luminance, contrast and structure inside a sliding window,
//! which tracks perceived similarity better than PSNR.
//!
//! - SSIM = 1.0: Identical images
//! - SSIM > 0.95: Nearly indistinguishable
//! - SSIM > 0.90: Close
//! - SSIM > 0.80: Similar
//!
//! Variances and covariance use the sample (n - 1) normalization, so scores
//! line up with the usual scientific-Python implementation.

use ndarray::Array2;
use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::LinearImage;

use super::validate_shapes;

/// Peak sample value of a linear image.
const DATA_RANGE: f64 = 1.0;

/// Configuration for SSIM calculation.
#[derive(Debug, Clone)]
pub struct SsimConfig {
    /// Window size for local statistics (default: 7).
    /// Larger windows are more stable but less sensitive to local differences.
    pub window_size: usize,

    /// K1 constant for luminance comparison (default: 0.01).
    pub k1: f64,

    /// K2 constant for contrast comparison (default: 0.03).
    pub k2: f64,

    /// Whether to generate a spatial SSIM map.
    pub generate_map: bool,
}

impl Default for SsimConfig {
    fn default() -> Self {
        Self {
            window_size: 7,
            k1: 0.01,
            k2: 0.03,
            generate_map: false,
        }
    }
}

impl SsimConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set window size.
    pub fn window_size(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Enable SSIM map generation.
    pub fn with_map(mut self) -> Self {
        self.generate_map = true;
        self
    }
}

/// Result of SSIM calculation.
#[derive(Debug, Clone, Serialize)]
pub struct SsimResult {
    /// Mean SSIM over channels (1.0 = identical).
    pub ssim: f64,

    /// SSIM of each channel.
    pub per_channel: Vec<f64>,

    /// Local similarity for every window position, averaged over channels.
    /// Only populated if `config.generate_map` is true.
    #[serde(skip)]
    pub ssim_map: Option<Array2<f64>>,
}

impl SsimResult {
    /// Check if images are structurally identical.
    pub fn is_identical(&self) -> bool {
        (self.ssim - 1.0).abs() < 1e-9
    }

    /// Get a rating based on SSIM value.
    pub fn rating(&self) -> &'static str {
        if self.ssim >= 0.999 {
            "visually identical"
        } else if self.ssim >= 0.95 {
            "very close"
        } else if self.ssim >= 0.90 {
            "close"
        } else if self.ssim >= 0.80 {
            "similar"
        } else if self.ssim >= 0.60 {
            "loosely similar"
        } else {
            "dissimilar"
        }
    }
}

impl std::fmt::Display for SsimResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6} ({})", self.ssim, self.rating())
    }
}

/// Calculate SSIM between a reference and a candidate image.
///
/// Images smaller than the window are compared with global statistics.
///
/// # Errors
///
/// Returns [`EvalError::ShapeMismatch`] if the images differ in shape and
/// [`EvalError::InvalidParameter`] for a window smaller than 2.
///
/// # Example
///
/// ```rust,ignore
/// use imgeval::metrics::{calculate_ssim, SsimConfig};
///
/// let config = SsimConfig::default().with_map();
/// let result = calculate_ssim(&ground_truth, &candidate, &config)?;
/// println!("SSIM: {:.4}", result.ssim);
/// ```
pub fn calculate_ssim(
    reference: &LinearImage,
    candidate: &LinearImage,
    config: &SsimConfig,
) -> Result<SsimResult> {
    validate_shapes(reference, candidate)?;
    if config.window_size < 2 {
        return Err(EvalError::InvalidParameter(format!(
            "SSIM window must be at least 2, got {}",
            config.window_size
        )));
    }

    let width = reference.width();
    let height = reference.height();
    let window = config.window_size;

    let c1 = (config.k1 * DATA_RANGE).powi(2);
    let c2 = (config.k2 * DATA_RANGE).powi(2);

    let use_windows = width >= window && height >= window;
    let map_dims = if use_windows {
        (height - window + 1, width - window + 1)
    } else {
        (0, 0)
    };
    let mut map_sum = if config.generate_map && use_windows {
        Some(Array2::<f64>::zeros(map_dims))
    } else {
        None
    };

    let mut per_channel = Vec::with_capacity(reference.channels());
    for c in 0..reference.channels() {
        let a: Vec<f64> = reference.channel(c).iter().map(|&v| v as f64).collect();
        let b: Vec<f64> = candidate.channel(c).iter().map(|&v| v as f64).collect();

        let ssim = if use_windows {
            let mut total = 0.0;
            for y in 0..map_dims.0 {
                for x in 0..map_dims.1 {
                    let local = compute_window_ssim(&a, &b, width, x, y, window, c1, c2);
                    total += local;
                    if let Some(map) = map_sum.as_mut() {
                        map[[y, x]] += local;
                    }
                }
            }
            total / (map_dims.0 * map_dims.1) as f64
        } else {
            compute_global_ssim(&a, &b, c1, c2)
        };
        per_channel.push(ssim);
    }

    let channels = per_channel.len().max(1) as f64;
    let ssim = per_channel.iter().sum::<f64>() / channels;
    let ssim_map = map_sum.map(|map| map / channels);

    Ok(SsimResult {
        ssim,
        per_channel,
        ssim_map,
    })
}

/// Compute SSIM for a single window.
#[allow(clippy::too_many_arguments)]
fn compute_window_ssim(
    reference: &[f64],
    candidate: &[f64],
    width: usize,
    x: usize,
    y: usize,
    window_size: usize,
    c1: f64,
    c2: f64,
) -> f64 {
    let mut ref_sum = 0.0;
    let mut cand_sum = 0.0;
    let mut ref_sq_sum = 0.0;
    let mut cand_sq_sum = 0.0;
    let mut cross_sum = 0.0;
    let n = (window_size * window_size) as f64;

    for wy in 0..window_size {
        let row = (y + wy) * width + x;
        for idx in row..row + window_size {
            let r = reference[idx];
            let c = candidate[idx];

            ref_sum += r;
            cand_sum += c;
            ref_sq_sum += r * r;
            cand_sq_sum += c * c;
            cross_sum += r * c;
        }
    }

    let mu_x = ref_sum / n;
    let mu_y = cand_sum / n;
    let bessel = n / (n - 1.0);

    // Clamp variances against rounding below zero
    let sigma_x_sq = ((ref_sq_sum / n) - (mu_x * mu_x)).max(0.0) * bessel;
    let sigma_y_sq = ((cand_sq_sum / n) - (mu_y * mu_y)).max(0.0) * bessel;
    let sigma_xy = ((cross_sum / n) - (mu_x * mu_y)) * bessel;

    combine(mu_x, mu_y, sigma_x_sq, sigma_y_sq, sigma_xy, c1, c2)
}

/// Compute global SSIM (for images smaller than the window).
fn compute_global_ssim(reference: &[f64], candidate: &[f64], c1: f64, c2: f64) -> f64 {
    if reference.is_empty() {
        return 1.0;
    }

    let n = reference.len() as f64;
    // A single sample has no spread either way
    let dof = (n - 1.0).max(1.0);

    let mu_x: f64 = reference.iter().sum::<f64>() / n;
    let mu_y: f64 = candidate.iter().sum::<f64>() / n;

    let sigma_x_sq: f64 = reference.iter().map(|&v| (v - mu_x).powi(2)).sum::<f64>() / dof;
    let sigma_y_sq: f64 = candidate.iter().map(|&v| (v - mu_y).powi(2)).sum::<f64>() / dof;
    let sigma_xy: f64 = reference
        .iter()
        .zip(candidate.iter())
        .map(|(&r, &c)| (r - mu_x) * (c - mu_y))
        .sum::<f64>()
        / dof;

    combine(mu_x, mu_y, sigma_x_sq, sigma_y_sq, sigma_xy, c1, c2)
}

/// Standard SSIM formula from local means, variances and covariance.
fn combine(mu_x: f64, mu_y: f64, var_x: f64, var_y: f64, cov: f64, c1: f64, c2: f64) -> f64 {
    ((2.0 * mu_x * mu_y + c1) * (2.0 * cov + c2))
        / ((mu_x * mu_x + mu_y * mu_y + c1) * (var_x + var_y + c2))
}
