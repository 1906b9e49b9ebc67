//! Configuration for an evaluation run: input locations, metric selection
//! and metric parameters.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Default folder holding the three captures.
pub const DEFAULT_CAPTURE_DIR: &str = "captures/cropped";

/// Default patch edge length for pattern matching.
pub const DEFAULT_PATCH_SIZE: usize = 16;

/// Default SSIM window edge length.
pub const DEFAULT_SSIM_WINDOW: usize = 7;

/// Metrics the harness knows how to compute, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricKind {
    /// Pixel-space L2 distance.
    L2,
    /// L2 distance between FFT magnitude spectra.
    FftL2,
    /// Structural similarity.
    Ssim,
    /// Peak signal-to-noise ratio.
    Psnr,
    /// VGG19 deep-feature distance
    Vgg19,
    /// Patch pattern-match score.
    PatternMatch,
}

impl MetricKind {
    /// All metrics in the order they are evaluated and printed.
    pub const ALL: [MetricKind; 6] = [
        MetricKind::L2,
        MetricKind::FftL2,
        MetricKind::Ssim,
        MetricKind::Psnr,
        MetricKind::Vgg19,
        MetricKind::PatternMatch,
    ];

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::L2 => "L2 distance",
            MetricKind::FftL2 => "FFT magnitude L2 distance",
            MetricKind::Ssim => "SSIM",
            MetricKind::Psnr => "PSNR",
            MetricKind::Vgg19 => "VGG19 feature distance",
            MetricKind::PatternMatch => "Pattern match SSD",
        }
    }

    /// Whether a larger value means the images are closer.
    pub fn higher_is_better(&self) -> bool {
        matches!(self, MetricKind::Ssim | MetricKind::Psnr)
    }

    /// Short hint printed next to the label.
    pub fn hint(&self) -> &'static str {
        if self.higher_is_better() {
            "higher is better"
        } else {
            "lower is better"
        }
    }
}

/// Configuration for one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Folder holding the captures.
    pub capture_dir: PathBuf,
    /// Ground-truth file name, relative to `capture_dir`.
    pub ground_truth: PathBuf,
    /// File name of the candidate expected to score worse.
    pub bad: PathBuf,
    /// File name of the candidate expected to score better.
    pub good: PathBuf,
    /// Convert inputs to single-channel luminance before comparing.
    pub grayscale: bool,
    /// Patch edge length for pattern matching.
    pub patch_size: usize,
    /// Limit the pattern-match search to this many pixels around each patch.
    pub search_radius: Option<usize>,
    /// SSIM window edge length.
    pub ssim_window: usize,
    /// Where to write the ground-truth FFT visualization.
    pub fft_output: Option<PathBuf>,
    /// Where to write the pattern-match overlay for the good candidate.
    pub match_output: Option<PathBuf>,
    /// ONNX export of VGG19 truncated after its first dense layer.
    pub vgg_model: Option<PathBuf>,
    /// Metrics to compute.
    pub metrics: Vec<MetricKind>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            capture_dir: PathBuf::from(DEFAULT_CAPTURE_DIR),
            ground_truth: PathBuf::from("gt.png"),
            bad: PathBuf::from("bad.png"),
            good: PathBuf::from("good.png"),
            grayscale: true,
            patch_size: DEFAULT_PATCH_SIZE,
            search_radius: None,
            ssim_window: DEFAULT_SSIM_WINDOW,
            fft_output: None,
            match_output: None,
            vgg_model: None,
            metrics: MetricKind::ALL.to_vec(),
        }
    }
}

impl EvalConfig {
    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EvalConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Path of the ground-truth capture.
    pub fn ground_truth_path(&self) -> PathBuf {
        self.capture_dir.join(&self.ground_truth)
    }

    /// Path of the bad candidate.
    pub fn bad_path(&self) -> PathBuf {
        self.capture_dir.join(&self.bad)
    }

    /// Path of the good candidate.
    pub fn good_path(&self) -> PathBuf {
        self.capture_dir.join(&self.good)
    }

    /// Check whether a metric is enabled.
    pub fn is_enabled(&self, metric: MetricKind) -> bool {
        self.metrics.contains(&metric)
    }

    /// Reject parameter values the metrics cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.patch_size == 0 {
            return Err(EvalError::Config("patch_size must be at least 1".into()));
        }
        if self.ssim_window < 2 {
            return Err(EvalError::Config(format!(
                "ssim_window must be at least 2, got {}",
                self.ssim_window
            )));
        }
        if self.metrics.is_empty() {
            return Err(EvalError::Config("no metrics enabled".into()));
        }
        Ok(())
    }
}
