//! Image Similarity Evaluation Library
//!
//! Compares two candidate images ("bad" and "good") against a ground-truth
//! capture with a set of classic and learned similarity metrics, so that two
//! rendering pipelines can be ranked by how closely they reproduce a
//! reference.
//!
//! # Metrics
//!
//! - **L2**: per-channel Euclidean norm of the pixel difference
//! - **FFT L2**: the same norm over centered log-magnitude spectra
//! - **SSIM**: sliding-window structural similarity
//! - **PSNR**: peak signal-to-noise ratio in decibels
//! - **VGG19**: distance between deep feature vectors (pluggable extractor)
//! - **Pattern match**: summed best-match SSD of reference patches
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use imgeval::{EvalConfig, Evaluation};
//!
//! let config = EvalConfig::from_toml_file("eval.toml")?;
//! let report = Evaluation::new(config).run()?;
//! println!("{}", report);
//! ```
//!
//! All buffers are linear light: samples are decoded from display encoding
//! with a fixed 2.2 gamma on load and re-encoded on save.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod metrics;
pub mod pipeline;

// Re-export commonly used types
pub use config::{EvalConfig, MetricKind};
pub use error::{EvalError, Result};
pub use features::FeatureExtractor;
pub use io::{load_linear, save_srgb};
pub use pipeline::{Evaluation, EvaluationReport, PairReport};

use ndarray::{Array3, ArrayView2, Axis};
use serde::Serialize;

/// Dimensions of a linear image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shape {
    /// Rows.
    pub height: usize,
    /// Columns.
    pub width: usize,
    /// Samples per pixel.
    pub channels: usize,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Linear-light image buffer.
///
/// Samples are `f32` in [0, 1], laid out as (height, width, channels).
/// Grayscale images carry a single channel.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearImage {
    data: Array3<f32>,
}

impl LinearImage {
    /// Wrap an existing (height, width, channels) array.
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Build an image by evaluating `f(y, x, c)` for every sample.
    pub fn from_fn<F>(height: usize, width: usize, channels: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f32,
    {
        Self {
            data: Array3::from_shape_fn((height, width, channels), |(y, x, c)| f(y, x, c)),
        }
    }

    /// Build an image with every sample set to `value`.
    pub fn filled(height: usize, width: usize, channels: usize, value: f32) -> Self {
        Self {
            data: Array3::from_elem((height, width, channels), value),
        }
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.data.shape()[0]
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    /// Samples per pixel.
    pub fn channels(&self) -> usize {
        self.data.shape()[2]
    }

    /// Dimensions of the buffer.
    pub fn shape(&self) -> Shape {
        Shape {
            height: self.height(),
            width: self.width(),
            channels: self.channels(),
        }
    }

    /// Borrow the underlying array.
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Consume the image, returning the underlying array.
    pub fn into_data(self) -> Array3<f32> {
        self.data
    }

    /// View of a single channel as a (height, width) plane.
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(2), channel)
    }

    /// Sample at (y, x, c).
    #[inline]
    pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
        self.data[[y, x, c]]
    }
}

/// Library version information.
pub mod version {
    /// Library version string.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Library name.
    pub const NAME: &str = env!("CARGO_PKG_NAME");

    /// Get full version string.
    pub fn full_version() -> String {
        format!("{} {}", NAME, VERSION)
    }
}
