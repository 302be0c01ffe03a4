mod classifier;
mod metadata;
#[cfg(feature = "onnx")]
mod onnx;
mod preprocess;
mod recognizer;

pub use classifier::{rank_top_k, Classifier, ModelInfo, Prediction, PredictionResult};
pub use metadata::ModelMetadata;
#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
pub use preprocess::{normalize, resample, PreprocessError, SequencePreprocessor, RECOMMENDED_MIN_FRAMES};
pub use recognizer::Recognizer;

use anyhow::Result;
use std::sync::Arc;

use crate::settings::ModelSettings;

/// Loads the configured classifier backend.
#[cfg(feature = "onnx")]
pub fn load_classifier(settings: &ModelSettings) -> Result<Arc<dyn Classifier>> {
    Ok(Arc::new(OnnxClassifier::load(settings)?))
}

#[cfg(not(feature = "onnx"))]
pub fn load_classifier(_settings: &ModelSettings) -> Result<Arc<dyn Classifier>> {
    anyhow::bail!("built without a classifier backend; enable the `onnx` feature")
}
