//! Frequency-domain representation of an image.
//!
//! Each channel is transformed with a 2-D DFT, shifted so that the
//! zero-frequency bin sits at the center, and compressed to
//! `20 * ln(|F|)`. The result has the same shape as the source and can be
//! compared with [`super::l2_distance`] or saved for inspection.

use ndarray::Array3;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::{LinearImage, Shape};

/// Smallest magnitude fed to the logarithm.
///
/// Bins that cancel out exactly would otherwise produce `-inf`; flooring
/// keeps every spectrum value finite (about -552.6 dB at the floor).
pub const SPECTRUM_FLOOR: f32 = 1e-12;

/// Centered log-magnitude spectrum of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencySpectrum {
    image: LinearImage,
}

impl FrequencySpectrum {
    /// Spectrum values as an image buffer (not limited to [0, 1]).
    pub fn as_image(&self) -> &LinearImage {
        &self.image
    }

    /// Consume the spectrum, returning its buffer.
    pub fn into_image(self) -> LinearImage {
        self.image
    }

    /// Dimensions of the spectrum.
    pub fn shape(&self) -> Shape {
        self.image.shape()
    }

    /// Rescale to [0, 1] so the spectrum can be saved without saturating.
    ///
    /// A flat spectrum maps to all zeros.
    pub fn normalized(&self) -> LinearImage {
        let data = self.image.data();
        let (min, max) = data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        if !range.is_finite() || range <= 0.0 {
            return LinearImage::new(Array3::zeros(data.raw_dim()));
        }
        LinearImage::new(data.mapv(|v| (v - min) / range))
    }
}

/// Compute the centered log-magnitude spectrum of every channel.
pub fn frequency_spectrum(image: &LinearImage) -> FrequencySpectrum {
    let Shape {
        height,
        width,
        channels,
    } = image.shape();
    let mut out = Array3::<f32>::zeros((height, width, channels));

    if height == 0 || width == 0 {
        return FrequencySpectrum {
            image: LinearImage::new(out),
        };
    }

    let mut planner = FftPlanner::<f32>::new();
    let row_fft = planner.plan_fft_forward(width);
    let column_fft = planner.plan_fft_forward(height);

    let mut plane = vec![Complex::new(0.0f32, 0.0); height * width];
    let mut column = vec![Complex::new(0.0f32, 0.0); height];

    for channel in 0..channels {
        for (slot, &value) in plane.iter_mut().zip(image.channel(channel).iter()) {
            *slot = Complex::new(value, 0.0);
        }

        // Rows are contiguous, so one call transforms all of them.
        row_fft.process(&mut plane);

        for x in 0..width {
            for y in 0..height {
                column[y] = plane[y * width + x];
            }
            column_fft.process(&mut column);
            for y in 0..height {
                plane[y * width + x] = column[y];
            }
        }

        for y in 0..height {
            let shifted_y = (y + height / 2) % height;
            for x in 0..width {
                let shifted_x = (x + width / 2) % width;
                let magnitude = plane[y * width + x].norm().max(SPECTRUM_FLOOR);
                out[[shifted_y, shifted_x, channel]] = 20.0 * magnitude.ln();
            }
        }
    }

    log::trace!("Computed spectrum for {}", image.shape());
    FrequencySpectrum {
        image: LinearImage::new(out),
    }
}
