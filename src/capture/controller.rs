use std::sync::Arc;

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Duration, Instant},
};
use tokio_util::sync::CancellationToken;

use crate::error::RecognizeError;
use crate::keypoints::{Extraction, KeypointFrame};
use crate::model::{PredictionResult, Recognizer};

use super::{CapturePhase, CaptureState, CaptureStatus, CaptureTimings};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Result of feeding one camera frame to the controller.
#[derive(Debug)]
pub enum CaptureReport {
    Status(CaptureStatus),
    /// Recording ended on this frame; the session is now paused.
    Finished {
        frame_count: usize,
        outcome: Result<PredictionResult, RecognizeError>,
    },
}

struct CountdownTask {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

/// Per-connection camera capture: owns the state machine and the one timed
/// task (countdown to recording).
#[derive(Clone)]
pub struct CaptureController {
    state: Arc<Mutex<CaptureState>>,
    countdown: Arc<Mutex<Option<CountdownTask>>>,
    recognizer: Arc<Recognizer>,
    min_frames: usize,
}

impl CaptureController {
    pub fn new(timings: CaptureTimings, min_frames: usize, recognizer: Arc<Recognizer>) -> Self {
        Self {
            state: Arc::new(Mutex::new(CaptureState::new(timings))),
            countdown: Arc::new(Mutex::new(None)),
            recognizer,
            min_frames,
        }
    }

    pub async fn phase(&self) -> CapturePhase {
        self.state.lock().await.phase()
    }

    pub async fn buffered_frames(&self) -> usize {
        self.state.lock().await.buffered_frames()
    }

    pub async fn process(&self, extraction: &Extraction, top_k: usize, threshold: f32) -> CaptureReport {
        let status = {
            let mut state = self.state.lock().await;
            let status = state.on_frame(extraction.keypoints(), Instant::now());
            if state.should_log() {
                log_debug!("capture phase {:?}: {}", state.phase(), status.message());
            }
            status
        };

        match status {
            CaptureStatus::CountdownTriggered => {
                log_info!("both hands detected, starting countdown");
                self.spawn_countdown().await;
                CaptureReport::Status(CaptureStatus::CountdownTriggered)
            }
            CaptureStatus::RecordingFinished { frames } => {
                let frame_count = frames.len();
                log_info!("recording complete: {} frames", frame_count);
                let outcome = self.recognize(frames, top_k, threshold).await;
                CaptureReport::Finished {
                    frame_count,
                    outcome,
                }
            }
            CaptureStatus::PauseEnded { .. } => {
                log_info!("pause ended, ready for a new capture");
                CaptureReport::Status(status)
            }
            other => CaptureReport::Status(other),
        }
    }

    /// Stops any countdown and drops the buffer. Safe to call in any phase.
    pub async fn cancel(&self) {
        let task = self.countdown.lock().await.take();
        if let Some(task) = task {
            task.token.cancel();
            if let Err(err) = task.handle.await {
                log_warn!("countdown task failed to join: {err}");
            }
        }
        self.state.lock().await.cancel();
    }

    async fn recognize(
        &self,
        frames: Vec<KeypointFrame>,
        top_k: usize,
        threshold: f32,
    ) -> Result<PredictionResult, RecognizeError> {
        if frames.len() < self.min_frames {
            log_warn!(
                "rejecting capture: {} frames, {} required",
                frames.len(),
                self.min_frames
            );
            return Err(RecognizeError::InsufficientFrames {
                frames: frames.len(),
                required: self.min_frames,
            });
        }

        let recognizer = self.recognizer.clone();
        tokio::task::spawn_blocking(move || recognizer.recognize(&frames, top_k, threshold))
            .await
            .unwrap_or_else(|err| Err(RecognizeError::Classifier(format!("inference task failed: {err}"))))
    }

    async fn spawn_countdown(&self) {
        let mut slot = self.countdown.lock().await;
        if let Some(previous) = slot.take() {
            previous.token.cancel();
            previous.handle.abort();
        }

        let (ticks, total) = {
            let state = self.state.lock().await;
            (state.countdown_seconds(), state.timings().countdown)
        };

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_countdown(self.state.clone(), ticks, total, token.clone()));
        *slot = Some(CountdownTask { handle, token });
    }
}

async fn run_countdown(
    state: Arc<Mutex<CaptureState>>,
    ticks: u32,
    total: Duration,
    token: CancellationToken,
) {
    let tick = total / ticks.max(1);

    for remaining in (1..=ticks).rev() {
        state.lock().await.set_countdown_remaining(remaining);
        log_debug!("recording starts in {}s", remaining);

        tokio::select! {
            _ = token.cancelled() => {
                log_debug!("countdown cancelled");
                return;
            }
            _ = time::sleep(tick) => {}
        }
    }

    let mut guard = state.lock().await;
    if token.is_cancelled() {
        return;
    }
    if guard.begin_recording(Instant::now()) {
        log_info!(
            "recording for {:.1}s",
            guard.timings().recording.as_secs_f32()
        );
    }
}
