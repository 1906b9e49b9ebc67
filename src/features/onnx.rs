//! VGG19 features through an ONNX model, executed on CPU by `tract`.
//!
//! The model is expected to be VGG19 truncated after its first
//! fully-connected layer, taking a 1x3x224x224 float input and producing
//! the 4096-wide activation.

use std::path::{Path, PathBuf};

use tract_onnx::prelude::*;

use super::{
    check_feature_width, network_input, FeatureExtractor, INPUT_SIZE, VGG19_FC1_WIDTH,
};
use crate::error::{EvalError, Result};
use crate::LinearImage;

/// ONNX-backed VGG19 feature extractor.
pub struct OnnxVgg19 {
    model: TypedRunnableModel<TypedModel>,
    path: PathBuf,
}

impl OnnxVgg19 {
    /// Load and optimize the model at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size = INPUT_SIZE as usize;
        log::info!("Loading VGG19 model from {}", path.display());

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
            .and_then(|m| m.into_optimized())
            .and_then(|m| m.into_runnable())
            .map_err(|e| {
                EvalError::FeatureExtraction(format!("loading {}: {}", path.display(), e))
            })?;

        Ok(Self {
            model,
            path: path.to_path_buf(),
        })
    }
}

impl FeatureExtractor for OnnxVgg19 {
    fn name(&self) -> &str {
        "vgg19-onnx"
    }

    fn extract_features(&self, image: &LinearImage) -> Result<Vec<f32>> {
        let input = network_input(image);
        let shape = input.raw_dim();
        let (data, _) = input.into_raw_vec_and_offset();
        let tensor: Tensor = tract_ndarray::Array4::from_shape_vec(
            (shape[0], shape[1], shape[2], shape[3]),
            data,
        )
        .map_err(|e| EvalError::FeatureExtraction(e.to_string()))?
        .into();

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| EvalError::FeatureExtraction(e.to_string()))?;
        let features: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| EvalError::FeatureExtraction(e.to_string()))?
            .iter()
            .copied()
            .collect();

        check_feature_width(features, VGG19_FC1_WIDTH, &self.path.display().to_string())
    }
}
