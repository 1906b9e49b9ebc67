//! Deep feature extraction.
//!
//! The VGG19 comparison needs a pretrained network and a tensor runtime, so
//! it is kept behind the narrow [`FeatureExtractor`] trait. Any backend that
//! turns an image into a fixed-length vector can be plugged in; with the
//! `vgg19` cargo feature an ONNX backend is available as [`OnnxVgg19`].

#[cfg(feature = "vgg19")]
mod onnx;

#[cfg(feature = "vgg19")]
pub use onnx::OnnxVgg19;

use std::path::Path;

use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::error::{EvalError, Result};
use crate::io::to_display_rgb;
use crate::LinearImage;

/// Edge length of the square network input.
pub const INPUT_SIZE: u32 = 224;

/// ImageNet channel means used to normalize network input.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations used to normalize network input.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Width of VGG19's first dense layer.
pub const VGG19_FC1_WIDTH: usize = 4096;

/// Turns an image into a fixed-length feature vector.
pub trait FeatureExtractor {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Extract the feature vector of `image`.
    fn extract_features(&self, image: &LinearImage) -> Result<Vec<f32>>;
}

/// Build the 1x3x224x224 NCHW input tensor for an ImageNet-trained network.
///
/// The image is re-encoded to display space, replicated to RGB when it has
/// fewer than three channels, resized with a triangle filter and
/// normalized with [`IMAGENET_MEAN`] / [`IMAGENET_STD`].
pub fn network_input(image: &LinearImage) -> Array4<f32> {
    let rgb = to_display_rgb(image);
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);
    let size = INPUT_SIZE as usize;

    Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
        let value = resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0;
        (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c]
    })
}

/// Accept `features` only when the backend produced `expected` values.
///
/// # Errors
///
/// Returns [`EvalError::FeatureExtraction`] naming `source` otherwise, which
/// usually means the model was exported at the wrong layer.
pub fn check_feature_width(
    features: Vec<f32>,
    expected: usize,
    source: &str,
) -> Result<Vec<f32>> {
    if features.len() != expected {
        return Err(EvalError::FeatureExtraction(format!(
            "{} produced {} features, expected {}",
            source,
            features.len(),
            expected
        )));
    }
    Ok(features)
}

/// Open the configured VGG19 backend.
///
/// # Errors
///
/// Returns [`EvalError::Config`] when the crate was built without the
/// `vgg19` feature, or the backend's load error otherwise.
pub fn open_vgg19(model_path: &Path) -> Result<Box<dyn FeatureExtractor>> {
    #[cfg(feature = "vgg19")]
    {
        Ok(Box::new(OnnxVgg19::load(model_path)?))
    }

    #[cfg(not(feature = "vgg19"))]
    {
        Err(EvalError::Config(format!(
            "cannot load {}: built without the `vgg19` feature",
            model_path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_input_shape() {
        let image = LinearImage::filled(10, 30, 1, 0.5);
        let tensor = network_input(&image);
        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_network_input_normalization() {
        // White input: (1 - mean) / std in every channel
        let image = LinearImage::filled(8, 8, 3, 1.0);
        let tensor = network_input(&image);
        for c in 0..3 {
            let expected = (1.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            assert!((tensor[[0, c, 100, 37]] - expected).abs() < 0.02);
        }
    }

    #[test]
    fn test_feature_width_checked() {
        let full = check_feature_width(vec![0.0; VGG19_FC1_WIDTH], VGG19_FC1_WIDTH, "fc1.onnx");
        assert_eq!(full.unwrap().len(), VGG19_FC1_WIDTH);

        // Export cut at the last conv block instead of fc1
        let conv = check_feature_width(vec![0.0; 25088], VGG19_FC1_WIDTH, "pool5.onnx");
        assert!(matches!(conv, Err(EvalError::FeatureExtraction(_))));
    }

    #[cfg(not(feature = "vgg19"))]
    #[test]
    fn test_open_without_feature_fails() {
        let result = open_vgg19(Path::new("vgg19_fc1.onnx"));
        assert!(matches!(result, Err(EvalError::Config(_))));
    }
}
