use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, RgbImage};
use std::sync::Arc;

use crate::error::ExtractError;
use crate::settings::ExtractorSettings;

use super::{letterbox, HandDetector, KeypointFrame, HAND_LANDMARKS};

/// Outcome of running one frame through the extractor.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// Exactly two hands, ordered left to right.
    Keypoints(KeypointFrame),
    /// Decoded and detected fine, but not exactly two hands.
    Absent { hands: usize },
    Failed(ExtractError),
}

impl Extraction {
    pub fn keypoints(&self) -> Option<&KeypointFrame> {
        match self {
            Extraction::Keypoints(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn hands_detected(&self) -> bool {
        matches!(self, Extraction::Keypoints(_))
    }
}

/// Shared, process-wide front end to the hand detector.
pub struct LandmarkExtractor {
    detector: Arc<dyn HandDetector>,
    width: u32,
    height: u32,
}

impl LandmarkExtractor {
    pub fn new(detector: Arc<dyn HandDetector>, settings: &ExtractorSettings) -> Self {
        Self {
            detector,
            width: settings.width,
            height: settings.height,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.detector.is_ready()
    }

    /// Accepts raw base64 or a `data:image/...;base64,` URL.
    pub fn extract_base64(&self, payload: &str) -> Extraction {
        let encoded = match payload.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
            None => payload,
        };

        let bytes = match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(err) => return Extraction::Failed(ExtractError::Decode(err.to_string())),
        };

        match image::load_from_memory(&bytes) {
            Ok(image) => self.extract(&image),
            Err(err) => Extraction::Failed(ExtractError::Decode(err.to_string())),
        }
    }

    pub fn extract(&self, image: &DynamicImage) -> Extraction {
        self.extract_rgb(image.to_rgb8())
    }

    fn extract_rgb(&self, image: RgbImage) -> Extraction {
        let canvas = letterbox(image, self.width, self.height);

        let hands = match self.detector.detect(&canvas) {
            Ok(hands) => hands,
            Err(err) => return Extraction::Failed(ExtractError::Detector(format!("{err:#}"))),
        };

        if hands.len() != 2 {
            return Extraction::Absent { hands: hands.len() };
        }

        match KeypointFrame::from_hands(&hands[0].landmarks, &hands[1].landmarks) {
            Some(frame) => Extraction::Keypoints(frame),
            None => Extraction::Failed(ExtractError::Detector(format!(
                "expected {} landmarks per hand, got {} and {}",
                HAND_LANDMARKS,
                hands[0].landmarks.len(),
                hands[1].landmarks.len()
            ))),
        }
    }
}
