use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::time::Duration;
use uuid::Uuid;

use crate::capture::{CapturePhase, CaptureController, CaptureReport, CaptureStatus, CaptureTimings};
use crate::error::{ExtractError, RecognizeError};
use crate::keypoints::{Extraction, KeypointFrame, LandmarkExtractor};
use crate::model::{PredictionResult, Recognizer};
use crate::settings::Settings;
use crate::upload::{FinalizeDecision, SafetyTimer, UploadAccumulator, UploadLimits};
use crate::utils::unix_timestamp;

use super::arbiter::SourceArbiter;
use super::protocol::{
    ClientMessage, ClientSettings, ControlMessage, FrameSource, PayloadSource, ServerMessage,
    StatusPayload,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Everything one WebSocket connection owns. Dropped when the socket closes.
pub struct SessionOrchestrator {
    id: Uuid,
    arbiter: SourceArbiter,
    capture: CaptureController,
    upload: Arc<Mutex<UploadAccumulator>>,
    timer: SafetyTimer,
    extractor: Arc<LandmarkExtractor>,
    recognizer: Arc<Recognizer>,
    notifier: mpsc::UnboundedSender<ServerMessage>,
}

impl SessionOrchestrator {
    pub fn new(
        extractor: Arc<LandmarkExtractor>,
        recognizer: Arc<Recognizer>,
        settings: &Settings,
        notifier: mpsc::UnboundedSender<ServerMessage>,
    ) -> Self {
        let capture = CaptureController::new(
            CaptureTimings::from(&settings.capture),
            settings.capture.min_frames,
            recognizer.clone(),
        );

        Self {
            id: Uuid::new_v4(),
            arbiter: SourceArbiter::new(),
            capture,
            upload: Arc::new(Mutex::new(UploadAccumulator::new(UploadLimits::from(&settings.upload)))),
            timer: SafetyTimer::new(Duration::from_secs(settings.upload.timeout_secs)),
            extractor,
            recognizer,
            notifier,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_upload_active(&self) -> bool {
        self.arbiter.is_upload_active()
    }

    pub async fn capture_phase(&self) -> CapturePhase {
        self.capture.phase().await
    }

    /// Parses and dispatches one text message. Malformed input gets an error
    /// reply; it never closes the session.
    pub async fn handle_text(&self, text: &str) -> Vec<ServerMessage> {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle(message).await,
            Err(err) => {
                log_warn!("session {}: invalid message: {}", self.id, err);
                vec![ServerMessage::error(format!("Invalid message: {err}"))]
            }
        }
    }

    pub async fn handle(&self, message: ClientMessage) -> Vec<ServerMessage> {
        match message {
            ClientMessage::Frame {
                data,
                source: FrameSource::Camera,
                settings,
            } => vec![self.camera_frame(data, settings).await.into()],
            ClientMessage::Frame {
                data,
                source: FrameSource::Upload,
                settings,
            } => vec![self.upload_frame(data, settings).await.into()],
            ClientMessage::Ping => vec![ControlMessage::Pong {
                timestamp: unix_timestamp(),
            }
            .into()],
            ClientMessage::ResetVideoUpload => {
                self.arbiter.force_upload();
                self.begin_upload_session().await;
                vec![ControlMessage::VideoUploadReset {
                    status: "Upload processor reset - ready for a new video".into(),
                }
                .into()]
            }
            ClientMessage::VideoUploadFinished {
                total_frames,
                settings,
            } => self.finish_upload(total_frames, settings).await,
            ClientMessage::Clear => {
                self.capture.cancel().await;
                log_info!("session {}: capture cleared", self.id);
                vec![StatusPayload::new(PayloadSource::Camera, false, "Capture cleared").into()]
            }
        }
    }

    /// Connection teardown: nothing from this session may outlive the socket.
    pub async fn close(&self) {
        self.capture.cancel().await;
        self.arbiter.release();
        self.timer.cancel();
        log_info!("session {} closed", self.id);
    }

    async fn camera_frame(&self, data: String, settings: ClientSettings) -> StatusPayload {
        if self.arbiter.is_upload_active() {
            return StatusPayload {
                camera_paused: Some(true),
                ..StatusPayload::new(
                    PayloadSource::CameraBlocked,
                    false,
                    "Processing video upload - camera temporarily paused",
                )
            };
        }

        let extraction = self.extract(data).await;
        let report = self
            .capture
            .process(&extraction, settings.top_k(), settings.confidence_threshold)
            .await;
        camera_payload(&extraction, report)
    }

    async fn upload_frame(&self, data: String, settings: ClientSettings) -> StatusPayload {
        if self.arbiter.try_begin_upload() {
            self.begin_upload_session().await;
        }

        let extraction = self.extract(data).await;
        let (step, sequence) = {
            let mut upload = self.upload.lock().await;
            let step = upload.add_frame(extraction.keypoints().copied());
            let sequence = step.ready.then(|| upload.take_sequence());
            (step, sequence)
        };

        let progress = step.progress;
        let status = if step.keypoints_extracted {
            format!(
                "Frame {} processed - {}/{} usable frames",
                progress.total_frames, progress.frames_with_hands, progress.target_frames
            )
        } else {
            format!("Frame {} - both hands not detected", progress.total_frames)
        };

        let payload = StatusPayload {
            upload_progress: Some(progress),
            keypoints_extracted: Some(step.keypoints_extracted),
            ..StatusPayload::new(PayloadSource::Upload, extraction.hands_detected(), status)
        };

        let Some(frames) = sequence else {
            return payload;
        };

        log_info!(
            "session {}: {} upload frames collected, classifying",
            self.id,
            frames.len()
        );
        let frame_count = frames.len();
        let outcome = self.classify(frames, settings).await;

        self.arbiter.release();
        self.timer.cancel();
        log_info!("session {}: upload auto-completed, camera restored", self.id);

        outcome_payload(payload, frame_count, outcome)
    }

    async fn finish_upload(&self, total_frames: usize, settings: ClientSettings) -> Vec<ServerMessage> {
        let decision = self.upload.lock().await.finalize(total_frames);

        let reply = match decision {
            FinalizeDecision::Classify(frames) => {
                let frame_count = frames.len();
                let outcome = self.classify(frames, settings).await;
                outcome_payload(
                    StatusPayload::new(PayloadSource::Upload, true, ""),
                    frame_count,
                    outcome,
                )
            }
            FinalizeDecision::Insufficient { frames, required } => StatusPayload {
                frame_count: Some(frames),
                ..StatusPayload::new(PayloadSource::Upload, false, "").with_error(
                    format!("Too few frames with both hands: {frames}/{required}"),
                    RecognizeError::InsufficientFrames { frames, required }.to_string(),
                )
            },
            FinalizeDecision::AlreadyProcessed => {
                StatusPayload::new(PayloadSource::Upload, true, "Video already processed")
            }
        };

        self.arbiter.release();
        self.timer.cancel();
        log_info!("session {}: video upload finished, camera restored", self.id);

        vec![
            reply.into(),
            ControlMessage::CameraRestored {
                status: "Camera restored - video upload complete".into(),
            }
            .into(),
        ]
    }

    /// Starts a fresh upload: clears the accumulator, re-arms the safety
    /// timeout and abandons any camera capture in flight.
    async fn begin_upload_session(&self) {
        self.upload.lock().await.reset();
        self.capture.cancel().await;

        let arbiter = self.arbiter.clone();
        let upload = self.upload.clone();
        let notifier = self.notifier.clone();
        let id = self.id;
        self.timer.arm(async move {
            if !arbiter.is_upload_active() {
                return;
            }
            upload.lock().await.reset();
            arbiter.release();
            log_warn!("session {}: upload timed out, camera restored", id);
            let _ = notifier.send(
                ControlMessage::CameraRestored {
                    status: "Camera restored - video upload timed out".into(),
                }
                .into(),
            );
        });

        log_info!(
            "session {}: video upload started, camera paused for up to {}s",
            self.id,
            self.timer.timeout().as_secs()
        );
    }

    async fn extract(&self, data: String) -> Extraction {
        let extractor = self.extractor.clone();
        tokio::task::spawn_blocking(move || extractor.extract_base64(&data))
            .await
            .unwrap_or_else(|err| {
                Extraction::Failed(ExtractError::Detector(format!("extraction task failed: {err}")))
            })
    }

    async fn classify(
        &self,
        frames: Vec<KeypointFrame>,
        settings: ClientSettings,
    ) -> Result<PredictionResult, RecognizeError> {
        let recognizer = self.recognizer.clone();
        tokio::task::spawn_blocking(move || {
            recognizer.recognize(&frames, settings.top_k(), settings.confidence_threshold)
        })
        .await
        .unwrap_or_else(|err| Err(RecognizeError::Classifier(format!("inference task failed: {err}"))))
    }
}

fn camera_payload(extraction: &Extraction, report: CaptureReport) -> StatusPayload {
    let hands = extraction.hands_detected();

    let status = match report {
        CaptureReport::Status(status) => status,
        CaptureReport::Finished {
            frame_count,
            outcome,
        } => {
            let base = StatusPayload::new(PayloadSource::Camera, hands, "");
            return outcome_payload(base, frame_count, outcome);
        }
    };

    let mut payload = StatusPayload::new(PayloadSource::Camera, hands, status.message());
    match status {
        CaptureStatus::Idle { .. } => {
            if let Extraction::Failed(err) = extraction {
                payload.status = format!("Frame could not be processed: {err}");
            }
        }
        CaptureStatus::Countdown { remaining, .. } if remaining > 0 => {
            payload.countdown_active = Some(true);
            payload.countdown_remaining = Some(remaining);
        }
        CaptureStatus::Recording { progress, .. } => {
            payload.recording_progress = Some(progress);
        }
        CaptureStatus::Paused { .. } => payload.paused = Some(true),
        CaptureStatus::PauseEnded { .. } => payload.paused = Some(false),
        _ => {}
    }
    payload
}

fn outcome_payload(
    base: StatusPayload,
    frame_count: usize,
    outcome: Result<PredictionResult, RecognizeError>,
) -> StatusPayload {
    let payload = match outcome {
        Ok(result) => base.with_prediction(result),
        Err(RecognizeError::InsufficientFrames { frames, required }) => base.with_error(
            format!("Only {frames} frames captured ({required} required)"),
            RecognizeError::InsufficientFrames { frames, required }.to_string(),
        ),
        Err(err) => base.with_error("Prediction failed", err.to_string()),
    };
    StatusPayload {
        frame_count: Some(frame_count),
        ..payload
    }
}
