//! Turns a variable-length keypoint capture into the classifier's fixed input.

use ndarray::{Array3, Array4, ArrayD, ArrayView3, Axis, Ix3};

use crate::keypoints::{KeypointFrame, COORDINATES, KEYPOINTS};
use crate::log_warn;

const ENABLE_LOGS: bool = true;

const NORMALIZATION_EPSILON: f64 = 1e-8;

/// Below this many frames the resampled sequence is mostly interpolation.
pub const RECOMMENDED_MIN_FRAMES: usize = 21;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreprocessError {
    #[error("expected a 3-D sequence (frames, keypoints, coordinates), got {0} dimensions")]
    WrongDimensions(usize),

    #[error("expected {expected} keypoints per frame, got {actual}")]
    WrongKeypointCount { expected: usize, actual: usize },

    #[error("expected {expected} coordinates per keypoint, got {actual}")]
    WrongCoordinateCount { expected: usize, actual: usize },

    #[error("sequence has no frames")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct SequencePreprocessor {
    target_frames: usize,
}

impl SequencePreprocessor {
    pub fn new(target_frames: usize) -> Self {
        Self {
            target_frames: target_frames.max(1),
        }
    }

    pub fn target_frames(&self) -> usize {
        self.target_frames
    }

    pub fn preprocess(&self, frames: &[KeypointFrame]) -> Result<Array4<f32>, PreprocessError> {
        let sequence = Array3::from_shape_fn((frames.len(), KEYPOINTS, COORDINATES), |(f, k, c)| {
            frames[f].0[k][c]
        });
        self.preprocess_array(&sequence.into_dyn())
    }

    /// Validates, resamples to `target_frames`, normalizes, and adds the
    /// batch axis. Output shape is `(1, target_frames, 42, 2)`.
    pub fn preprocess_array(&self, sequence: &ArrayD<f32>) -> Result<Array4<f32>, PreprocessError> {
        let shape = sequence.shape();
        if shape.len() != 3 {
            return Err(PreprocessError::WrongDimensions(shape.len()));
        }
        if shape[1] != KEYPOINTS {
            return Err(PreprocessError::WrongKeypointCount {
                expected: KEYPOINTS,
                actual: shape[1],
            });
        }
        if shape[2] != COORDINATES {
            return Err(PreprocessError::WrongCoordinateCount {
                expected: COORDINATES,
                actual: shape[2],
            });
        }
        if shape[0] == 0 {
            return Err(PreprocessError::Empty);
        }
        if shape[0] < RECOMMENDED_MIN_FRAMES {
            log_warn!(
                "sequence has only {} frames, {} recommended",
                shape[0],
                RECOMMENDED_MIN_FRAMES
            );
        }

        let view = sequence
            .view()
            .into_dimensionality::<Ix3>()
            .map_err(|_| PreprocessError::WrongDimensions(shape.len()))?;

        let mut resampled = resample(view, self.target_frames);
        normalize(&mut resampled);
        Ok(resampled.insert_axis(Axis(0)))
    }
}

/// Linear interpolation onto `target` evenly spaced positions over `[0, N-1]`.
pub fn resample(sequence: ArrayView3<f32>, target: usize) -> Array3<f32> {
    let (frames, keypoints, coordinates) = sequence.dim();
    if frames == target {
        return sequence.to_owned();
    }

    let mut out = Array3::<f32>::zeros((target, keypoints, coordinates));
    let last = frames.saturating_sub(1);

    for t in 0..target {
        let position = if target > 1 {
            t as f64 * last as f64 / (target - 1) as f64
        } else {
            0.0
        };
        let lower = (position.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let frac = position - lower as f64;

        let mut slot = out.index_axis_mut(Axis(0), t);
        let a = sequence.index_axis(Axis(0), lower);
        if frac == 0.0 || lower == upper {
            slot.assign(&a);
            continue;
        }
        let b = sequence.index_axis(Axis(0), upper);
        ndarray::Zip::from(&mut slot).and(&a).and(&b).for_each(|o, &a, &b| {
            *o = (a as f64 + (b as f64 - a as f64) * frac) as f32;
        });
    }
    out
}

/// Per-coordinate z-score over every keypoint of every frame, using the
/// population standard deviation.
pub fn normalize(sequence: &mut Array3<f32>) {
    let (_, _, coordinates) = sequence.dim();
    for c in 0..coordinates {
        let mut channel = sequence.index_axis_mut(Axis(2), c);
        let count = channel.len() as f64;
        if count == 0.0 {
            continue;
        }
        let mean = channel.iter().map(|&v| v as f64).sum::<f64>() / count;
        let variance = channel
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count;
        let denom = variance.sqrt() + NORMALIZATION_EPSILON;
        channel.mapv_inplace(|v| ((v as f64 - mean) / denom) as f32);
    }
}
