use serde::Serialize;

use crate::keypoints::KeypointFrame;
use crate::settings::UploadSettings;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy)]
pub struct UploadLimits {
    /// Usable frames that trigger classification without waiting for finalize.
    pub target_frames: usize,
    /// Fewest usable frames a finalize will classify.
    pub min_frames: usize,
    /// Below this a finalize still classifies but logs a warning.
    pub soft_min_frames: usize,
}

impl From<&UploadSettings> for UploadLimits {
    fn from(settings: &UploadSettings) -> Self {
        Self {
            target_frames: settings.target_frames.max(1),
            min_frames: settings.min_frames,
            soft_min_frames: settings.soft_min_frames,
        }
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from(&UploadSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Accumulating,
    /// The sequence has been handed to the classifier.
    Completed,
    /// A finalize arrived with too few usable frames.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UploadProgress {
    pub total_frames: usize,
    pub frames_with_hands: usize,
    pub target_frames: usize,
    pub progress_percent: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadStep {
    pub progress: UploadProgress,
    pub keypoints_extracted: bool,
    /// The target was reached on this frame; call [`UploadAccumulator::take_sequence`].
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeDecision {
    Classify(Vec<KeypointFrame>),
    Insufficient { frames: usize, required: usize },
    AlreadyProcessed,
}

/// Buffers keypoints from an uploaded video. Never resets itself; the owner
/// decides when a new upload begins.
#[derive(Debug)]
pub struct UploadAccumulator {
    buffer: Vec<KeypointFrame>,
    total_frames: usize,
    limits: UploadLimits,
    phase: UploadPhase,
}

impl UploadAccumulator {
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            buffer: Vec::new(),
            total_frames: 0,
            limits,
            phase: UploadPhase::Accumulating,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.total_frames = 0;
        self.phase = UploadPhase::Accumulating;
    }

    pub fn add_frame(&mut self, keypoints: Option<KeypointFrame>) -> UploadStep {
        let keypoints_extracted = keypoints.is_some();

        if self.phase == UploadPhase::Accumulating {
            self.total_frames += 1;
            if let Some(frame) = keypoints {
                self.buffer.push(frame);
            }
            log_debug!(
                "upload frame {}: {} usable of {}",
                self.total_frames,
                self.buffer.len(),
                self.limits.target_frames
            );
        }

        UploadStep {
            progress: self.progress(),
            keypoints_extracted,
            ready: self.is_ready(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == UploadPhase::Accumulating && self.buffer.len() >= self.limits.target_frames
    }

    pub fn progress(&self) -> UploadProgress {
        UploadProgress {
            total_frames: self.total_frames,
            frames_with_hands: self.buffer.len(),
            target_frames: self.limits.target_frames,
            progress_percent: self.buffer.len() as f32 / self.limits.target_frames as f32 * 100.0,
        }
    }

    /// Hands over the first `target_frames` usable frames and marks the upload completed.
    pub fn take_sequence(&mut self) -> Vec<KeypointFrame> {
        self.phase = UploadPhase::Completed;
        let count = self.buffer.len().min(self.limits.target_frames);
        log_info!("upload sequence ready: {} frames", count);
        self.buffer[..count].to_vec()
    }

    /// Explicit end of stream. `total_hint` is the client's frame count.
    pub fn finalize(&mut self, total_hint: usize) -> FinalizeDecision {
        if self.phase == UploadPhase::Completed {
            return FinalizeDecision::AlreadyProcessed;
        }

        if total_hint != self.total_frames {
            log_debug!(
                "upload finished: client sent {} frames, {} received",
                total_hint,
                self.total_frames
            );
        }

        let frames = self.buffer.len();
        if frames < self.limits.min_frames {
            self.phase = UploadPhase::Rejected;
            log_warn!(
                "upload rejected: {} usable frames, {} required",
                frames,
                self.limits.min_frames
            );
            return FinalizeDecision::Insufficient {
                frames,
                required: self.limits.min_frames,
            };
        }

        if frames < self.limits.soft_min_frames {
            log_warn!(
                "classifying upload with only {} frames ({} recommended)",
                frames,
                self.limits.soft_min_frames
            );
        }
        FinalizeDecision::Classify(self.take_sequence())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::KEYPOINTS;

    fn frame(i: usize) -> KeypointFrame {
        KeypointFrame([[i as f32, 0.0]; KEYPOINTS])
    }

    #[test]
    fn counts_total_and_usable_frames_separately() {
        let mut acc = UploadAccumulator::new(UploadLimits::default());
        acc.add_frame(Some(frame(0)));
        let step = acc.add_frame(None);
        assert!(!step.keypoints_extracted);
        assert_eq!(step.progress.total_frames, 2);
        assert_eq!(step.progress.frames_with_hands, 1);
        assert_eq!(step.progress.target_frames, 50);
        assert!((step.progress.progress_percent - 2.0).abs() < 1e-6);
    }

    #[test]
    fn reaching_target_is_ready_exactly_once() {
        let mut acc = UploadAccumulator::new(UploadLimits::default());
        for i in 0..49 {
            assert!(!acc.add_frame(Some(frame(i))).ready);
        }
        assert!(acc.add_frame(Some(frame(49))).ready);

        let sequence = acc.take_sequence();
        assert_eq!(sequence.len(), 50);
        assert_eq!(sequence[0], frame(0));
        assert_eq!(acc.phase(), UploadPhase::Completed);
        assert!(!acc.add_frame(Some(frame(50))).ready);
        assert_eq!(acc.finalize(60), FinalizeDecision::AlreadyProcessed);
    }

    #[test]
    fn finalize_classifies_between_floors() {
        let mut acc = UploadAccumulator::new(UploadLimits::default());
        for i in 0..25 {
            acc.add_frame(Some(frame(i)));
            acc.add_frame(None);
        }
        match acc.finalize(50) {
            FinalizeDecision::Classify(frames) => assert_eq!(frames.len(), 25),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn finalize_rejects_below_hard_floor() {
        let mut acc = UploadAccumulator::new(UploadLimits::default());
        for i in 0..20 {
            acc.add_frame(Some(frame(i)));
        }
        assert_eq!(
            acc.finalize(20),
            FinalizeDecision::Insufficient { frames: 20, required: 21 }
        );
        assert_eq!(acc.phase(), UploadPhase::Rejected);
    }

    #[test]
    fn reset_starts_a_new_upload() {
        let mut acc = UploadAccumulator::new(UploadLimits::default());
        for i in 0..50 {
            acc.add_frame(Some(frame(i)));
        }
        acc.take_sequence();
        acc.reset();
        assert_eq!(acc.phase(), UploadPhase::Accumulating);
        assert_eq!(acc.progress().total_frames, 0);
        assert_eq!(acc.add_frame(Some(frame(0))).progress.frames_with_hands, 1);
    }
}
