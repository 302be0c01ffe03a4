use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::sync::Mutex;

use crate::keypoints::{COORDINATES, KEYPOINTS};
use crate::settings::ModelSettings;

use super::classifier::{rank_top_k, Classifier, ModelInfo, PredictionResult};
use super::metadata::ModelMetadata;

pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    metadata: ModelMetadata,
    target_frames: usize,
    model_path: String,
}

impl OnnxClassifier {
    /// Loads the graph plus its label and info files. Any missing artifact is an error.
    pub fn load(settings: &ModelSettings) -> Result<Self> {
        let model_path = settings.model_path();
        if !model_path.exists() {
            bail!("model file not found at {}", model_path.display());
        }

        let metadata = ModelMetadata::load(settings)?;

        log::info!("Loading ONNX model from {}", model_path.display());
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(&model_path)
            .context("Failed to load ONNX model")?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .context("model declares no inputs")?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .context("model declares no outputs")?;

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            metadata,
            target_frames: settings.target_frames,
            model_path: model_path.display().to_string(),
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, input: &Array4<f32>, top_k: usize) -> Result<PredictionResult> {
        let input_tensor = Tensor::from_array(input.clone())?;

        let probabilities: Vec<f32> = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| anyhow!("ONNX session lock poisoned"))?;
            let outputs = session
                .run(ort::inputs![self.input_name.as_str() => input_tensor])
                .context("Inference failed")?;
            let output: ndarray::ArrayViewD<f32> = outputs[self.output_name.as_str()]
                .try_extract_array()
                .context("Failed to extract output")?;
            let values = output.iter().copied().collect();
            values
        };

        let probabilities = to_probabilities(probabilities);
        let result = rank_top_k(probabilities, &self.metadata.class_names, top_k)?;
        log::info!(
            "Prediction: {} ({:.3})",
            result.main_prediction,
            result.confidence
        );
        Ok(result)
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            ready: true,
            num_classes: self.metadata.num_classes,
            class_names: self.metadata.class_names.clone(),
            input_shape: [1, self.target_frames, KEYPOINTS, COORDINATES],
            model_path: Some(self.model_path.clone()),
        }
    }
}

/// Graphs exported without their final softmax emit logits.
fn to_probabilities(values: Vec<f32>) -> Vec<f32> {
    let sum: f32 = values.iter().sum();
    let in_range = values.iter().all(|v| (0.0..=1.0).contains(v));
    if in_range && (sum - 1.0).abs() < 1e-3 {
        return values;
    }

    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = values.iter().map(|v| (v - max).exp()).collect();
    let total: f32 = exp.iter().sum();
    exp.into_iter().map(|v| v / total).collect()
}
