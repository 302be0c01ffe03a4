use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Directory served at `/` for a browser client; skipped when absent.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            static_dir: Some(PathBuf::from("static")),
        }
    }
}

/// Timing and threshold knobs for the live camera capture cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub countdown_secs: f64,
    /// Longer than target_frames / fps so frame-rate jitter still fills the buffer.
    pub recording_secs: f64,
    pub pause_secs: f64,
    pub stable_frames: u32,
    pub min_frames: usize,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            countdown_secs: 3.0,
            recording_secs: 2.8,
            pause_secs: 2.0,
            stable_frames: 1,
            min_frames: 21,
        }
    }
}

impl CaptureSettings {
    /// Rejects durations that cannot be represented (negative, NaN, overflow).
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in [
            ("countdown_secs", self.countdown_secs),
            ("recording_secs", self.recording_secs),
            ("pause_secs", self.pause_secs),
        ] {
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("capture.{name} is not a valid duration: {secs}"))?;
        }
        Ok(())
    }

    pub fn countdown(&self) -> Duration {
        Duration::from_secs_f64(self.countdown_secs)
    }

    pub fn recording(&self) -> Duration {
        Duration::from_secs_f64(self.recording_secs)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs_f64(self.pause_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub target_frames: usize,
    pub min_frames: usize,
    pub soft_min_frames: usize,
    pub timeout_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            target_frames: 50,
            min_frames: 21,
            soft_min_frames: 30,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSettings {
    pub python: PathBuf,
    pub script: PathBuf,
    pub min_detection_confidence: f32,
    pub min_tracking_confidence: f32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("scripts/hand_landmarks.py"),
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub model_dir: PathBuf,
    pub model_file: String,
    pub labels_file: String,
    pub info_file: String,
    pub target_frames: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            model_file: "sign_classifier.onnx".into(),
            labels_file: "labels.json".into(),
            info_file: "model_info.json".into(),
            target_frames: 50,
        }
    }
}

impl ModelSettings {
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.model_dir.join(&self.labels_file)
    }

    pub fn info_path(&self) -> PathBuf {
        self.model_dir.join(&self.info_file)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub capture: CaptureSettings,
    pub upload: UploadSettings,
    pub extractor: ExtractorSettings,
    pub detector: DetectorSettings,
    pub model: ModelSettings,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Loads settings from `path`, falling back to defaults when the file does not exist.
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            read_settings(&path)?
        } else {
            Settings::default()
        };
        data.capture
            .validate()
            .with_context(|| format!("Invalid settings file {}", path.display()))?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> Settings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update<F>(&self, apply: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        apply(&mut guard);
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Invalid settings file {}", path.display()))
}
