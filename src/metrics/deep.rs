//! Deep-feature distance.

use serde::Serialize;

use crate::error::{EvalError, Result};
use crate::features::FeatureExtractor;
use crate::LinearImage;

/// Euclidean distance between two feature vectors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDistance {
    /// Distance between the vectors (lower = closer).
    pub distance: f64,
    /// Length of each feature vector.
    pub dimensions: usize,
}

impl std::fmt::Display for FeatureDistance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6} ({}-d features)", self.distance, self.dimensions)
    }
}

/// Distance between the feature vectors of two images.
///
/// The images need not share a shape; the extractor is expected to bring
/// them to its own input size.
///
/// # Errors
///
/// Propagates extractor failures and returns
/// [`EvalError::FeatureExtraction`] when the two vectors differ in length.
pub fn feature_distance(
    extractor: &dyn FeatureExtractor,
    reference: &LinearImage,
    candidate: &LinearImage,
) -> Result<FeatureDistance> {
    let a = extractor.extract_features(reference)?;
    let b = extractor.extract_features(candidate)?;
    vector_distance(&a, &b)
}

/// Euclidean distance between two precomputed feature vectors.
pub fn vector_distance(a: &[f32], b: &[f32]) -> Result<FeatureDistance> {
    if a.len() != b.len() {
        return Err(EvalError::FeatureExtraction(format!(
            "feature length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let distance = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt();

    Ok(FeatureDistance {
        distance,
        dimensions: a.len(),
    })
}
