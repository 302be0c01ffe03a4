use std::sync::Arc;

use crate::error::RecognizeError;
use crate::keypoints::KeypointFrame;
use crate::log_error;

use super::{Classifier, ModelInfo, PredictionResult, SequencePreprocessor};

const ENABLE_LOGS: bool = true;

/// Preprocessor and classifier glued together; shared by every session.
pub struct Recognizer {
    preprocessor: SequencePreprocessor,
    classifier: Arc<dyn Classifier>,
}

impl Recognizer {
    pub fn new(preprocessor: SequencePreprocessor, classifier: Arc<dyn Classifier>) -> Self {
        Self {
            preprocessor,
            classifier,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.classifier.is_ready()
    }

    pub fn info(&self) -> ModelInfo {
        self.classifier.info()
    }

    /// Classifies a captured sequence. The ranked list keeps only entries at or
    /// above `threshold`; the top-1 prediction is reported regardless.
    pub fn recognize(
        &self,
        frames: &[KeypointFrame],
        top_k: usize,
        threshold: f32,
    ) -> Result<PredictionResult, RecognizeError> {
        let input = self.preprocessor.preprocess(frames)?;

        let mut result = self
            .classifier
            .predict(&input, top_k)
            .map_err(|err| {
                log_error!("classifier failed on {} frames: {err:#}", frames.len());
                RecognizeError::Classifier(format!("{err:#}"))
            })?;

        result.predictions.retain(|p| p.confidence >= threshold);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::KEYPOINTS;
    use crate::model::rank_top_k;
    use anyhow::Result;
    use ndarray::Array4;

    struct Fixed;

    impl Classifier for Fixed {
        fn predict(&self, input: &Array4<f32>, top_k: usize) -> Result<PredictionResult> {
            assert_eq!(input.dim(), (1, 50, 42, 2));
            let labels = vec!["hola".to_string(), "adios".to_string(), "gracias".to_string()];
            rank_top_k(vec![0.55, 0.3, 0.15], &labels, top_k)
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                ready: true,
                num_classes: 3,
                class_names: Vec::new(),
                input_shape: [1, 50, 42, 2],
                model_path: None,
            }
        }
    }

    struct Broken;

    impl Classifier for Broken {
        fn predict(&self, _input: &Array4<f32>, _top_k: usize) -> Result<PredictionResult> {
            anyhow::bail!("session run failed")
        }

        fn info(&self) -> ModelInfo {
            Fixed.info()
        }
    }

    fn recognizer() -> Recognizer {
        Recognizer::new(SequencePreprocessor::new(50), Arc::new(Fixed))
    }

    fn frames(n: usize) -> Vec<KeypointFrame> {
        (0..n)
            .map(|i| KeypointFrame([[i as f32 * 0.01, 0.5]; KEYPOINTS]))
            .collect()
    }

    #[test]
    fn threshold_filters_list_but_not_main() {
        let result = recognizer().recognize(&frames(30), 3, 0.6).unwrap();
        assert!(result.predictions.is_empty());
        assert_eq!(result.main_prediction, "hola");
        assert!((result.confidence - 0.55).abs() < 1e-6);

        let result = recognizer().recognize(&frames(30), 3, 0.2).unwrap();
        assert_eq!(result.predictions.len(), 2);
    }

    #[test]
    fn empty_capture_is_a_preprocess_error() {
        let err = recognizer().recognize(&[], 3, 0.6).unwrap_err();
        assert!(matches!(err, RecognizeError::Preprocess(_)));
    }

    #[test]
    fn classifier_failure_is_reported() {
        let recognizer = Recognizer::new(SequencePreprocessor::new(50), Arc::new(Broken));
        let err = recognizer.recognize(&frames(30), 3, 0.6).unwrap_err();
        match err {
            RecognizeError::Classifier(message) => assert!(message.contains("session run failed")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
