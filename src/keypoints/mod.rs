//! Two-hand keypoint extraction.
//!
//! Raw frames are decoded, letterboxed to the canonical resolution, run
//! through a [`HandDetector`], and turned into a fixed 42-point
//! [`KeypointFrame`] when exactly two hands are visible.

mod detector;
mod extractor;
mod letterbox;

pub use detector::{DetectedHand, HandDetector, Landmark, MediapipeBridge};
pub use extractor::{Extraction, LandmarkExtractor};
pub use letterbox::letterbox;

pub const HAND_LANDMARKS: usize = 21;
pub const KEYPOINTS: usize = HAND_LANDMARKS * 2;
pub const COORDINATES: usize = 2;

/// One video frame reduced to 42 `(x, y)` points. Slots `[0, 21)` hold the
/// hand with the lower mean x, `[21, 42)` the other one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeypointFrame(pub [[f32; COORDINATES]; KEYPOINTS]);

impl KeypointFrame {
    pub fn points(&self) -> &[[f32; COORDINATES]; KEYPOINTS] {
        &self.0
    }

    /// Builds a frame from two hands, ordering them left to right by mean x.
    pub fn from_hands(first: &[Landmark], second: &[Landmark]) -> Option<Self> {
        if first.len() != HAND_LANDMARKS || second.len() != HAND_LANDMARKS {
            return None;
        }

        let (left, right) = if mean_x(second) < mean_x(first) {
            (second, first)
        } else {
            (first, second)
        };

        let mut points = [[0.0; COORDINATES]; KEYPOINTS];
        for (slot, landmark) in points.iter_mut().zip(left.iter().chain(right.iter())) {
            *slot = [landmark.x, landmark.y];
        }
        Some(Self(points))
    }
}

fn mean_x(hand: &[Landmark]) -> f32 {
    hand.iter().map(|l| l.x).sum::<f32>() / hand.len() as f32
}
