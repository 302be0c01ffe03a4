//! JSON messages exchanged over the WebSocket.

use serde::{Deserialize, Serialize};

use crate::model::{Prediction, PredictionResult};
use crate::upload::UploadProgress;
use crate::utils::unix_timestamp;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_PREDICTION_COUNT: i64 = 3;
pub const MAX_PREDICTION_COUNT: i64 = 7;
const DEFAULT_TOTAL_FRAMES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSource {
    #[default]
    Camera,
    Upload,
}

/// Per-request client preferences. Unknown keys are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    pub confidence_threshold: f32,
    pub prediction_count: i64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            prediction_count: DEFAULT_PREDICTION_COUNT,
        }
    }
}

impl ClientSettings {
    pub fn top_k(&self) -> usize {
        self.prediction_count.clamp(1, MAX_PREDICTION_COUNT) as usize
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Frame {
        #[serde(default)]
        data: String,
        #[serde(default)]
        source: FrameSource,
        #[serde(default)]
        settings: ClientSettings,
    },
    Ping,
    ResetVideoUpload,
    VideoUploadFinished {
        #[serde(default = "default_total_frames")]
        total_frames: usize,
        #[serde(default)]
        settings: ClientSettings,
    },
    Clear,
}

fn default_total_frames() -> usize {
    DEFAULT_TOTAL_FRAMES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    #[default]
    Camera,
    Upload,
    CameraBlocked,
}

/// Per-frame status sent back to the client. Optional fields are omitted
/// from the JSON when unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusPayload {
    pub hands_detected: bool,
    pub status: String,
    pub source: PayloadSource,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown_remaining: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_progress: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_paused: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_progress: Option<UploadProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keypoints_extracted: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<Prediction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_prediction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusPayload {
    pub fn new(source: PayloadSource, hands_detected: bool, status: impl Into<String>) -> Self {
        Self {
            hands_detected,
            status: status.into(),
            source,
            timestamp: unix_timestamp(),
            ..Self::default()
        }
    }

    pub fn with_prediction(mut self, result: PredictionResult) -> Self {
        self.hands_detected = true;
        self.status = format!("Prediction complete: {}", result.main_prediction);
        self.predictions = Some(result.predictions);
        self.main_prediction = Some(result.main_prediction);
        self.confidence = Some(result.confidence);
        self
    }

    pub fn with_error(mut self, status: impl Into<String>, error: impl Into<String>) -> Self {
        self.hands_detected = false;
        self.status = status.into();
        self.error = Some(error.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Pong { timestamp: f64 },
    VideoUploadReset { status: String },
    CameraRestored { status: String },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Status(StatusPayload),
    Control(ControlMessage),
}

impl ServerMessage {
    pub fn error(error: impl Into<String>) -> Self {
        ServerMessage::Control(ControlMessage::Error {
            error: error.into(),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<StatusPayload> for ServerMessage {
    fn from(payload: StatusPayload) -> Self {
        ServerMessage::Status(payload)
    }
}

impl From<ControlMessage> for ServerMessage {
    fn from(message: ControlMessage) -> Self {
        ServerMessage::Control(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn frame_defaults_to_camera_with_default_settings() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"frame","data":"abc"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Frame {
                data: "abc".into(),
                source: FrameSource::Camera,
                settings: ClientSettings::default(),
            }
        );
    }

    #[test]
    fn settings_use_camel_case_and_ignore_unknown_keys() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"frame","data":"","source":"upload",
                "settings":{"confidenceThreshold":0.3,"predictionCount":12,"theme":"dark"}}"#,
        )
        .unwrap();
        let ClientMessage::Frame { source, settings, .. } = msg else {
            panic!("expected frame");
        };
        assert_eq!(source, FrameSource::Upload);
        assert!((settings.confidence_threshold - 0.3).abs() < 1e-6);
        assert_eq!(settings.top_k(), 7);
        assert_eq!(ClientSettings { prediction_count: 0, ..settings }.top_k(), 1);
    }

    #[test]
    fn control_messages_parse() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        let finished: ClientMessage = serde_json::from_str(r#"{"type":"video_upload_finished"}"#).unwrap();
        assert_eq!(
            finished,
            ClientMessage::VideoUploadFinished {
                total_frames: 50,
                settings: ClientSettings::default(),
            }
        );

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"launch"}"#).is_err());
    }

    #[test]
    fn status_payload_omits_unset_fields() {
        let payload = StatusPayload::new(PayloadSource::CameraBlocked, false, "blocked");
        let value: Value = serde_json::to_value(ServerMessage::from(payload)).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object["source"], json!("camera_blocked"));
        assert_eq!(object.len(), 4);
    }

    #[test]
    fn control_messages_carry_their_type() {
        let value = serde_json::to_value(ServerMessage::from(ControlMessage::CameraRestored {
            status: "ok".into(),
        }))
        .unwrap();
        assert_eq!(value, json!({"type": "camera_restored", "status": "ok"}));
    }
}
