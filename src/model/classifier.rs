use anyhow::{bail, Result};
use ndarray::Array4;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub rank: usize,
    pub label: String,
    pub confidence: f32,
    pub class_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub predictions: Vec<Prediction>,
    pub main_prediction: String,
    pub confidence: f32,
    pub raw_probabilities: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub ready: bool,
    pub num_classes: usize,
    pub class_names: Vec<String>,
    pub input_shape: [usize; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
}

/// Sequence classifier over a `(1, T, 42, 2)` tensor.
pub trait Classifier: Send + Sync {
    fn predict(&self, input: &Array4<f32>, top_k: usize) -> Result<PredictionResult>;

    fn info(&self) -> ModelInfo;

    fn is_ready(&self) -> bool {
        self.info().ready
    }
}

/// Ranks a probability vector, highest first. Ties keep the lower class index first.
pub fn rank_top_k(probabilities: Vec<f32>, labels: &[String], top_k: usize) -> Result<PredictionResult> {
    if probabilities.is_empty() {
        bail!("classifier returned no probabilities");
    }

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    order.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));

    let predictions: Vec<Prediction> = order
        .into_iter()
        .take(top_k.max(1))
        .enumerate()
        .map(|(i, class_index)| Prediction {
            rank: i + 1,
            label: labels
                .get(class_index)
                .cloned()
                .unwrap_or_else(|| format!("class_{class_index}")),
            confidence: probabilities[class_index],
            class_index,
        })
        .collect();

    let (main_prediction, confidence) = predictions
        .first()
        .map(|p| (p.label.clone(), p.confidence))
        .unwrap_or_default();

    Ok(PredictionResult {
        predictions,
        main_prediction,
        confidence,
        raw_probabilities: probabilities,
    })
}
