//! Hand landmark detection through a MediaPipe helper process.
//!
//! The helper (`scripts/hand_landmarks.py`) reads frames from stdin as a
//! 12-byte header (width, height, channels as little-endian u32) followed by
//! raw RGB bytes, and answers each frame with one JSON line.

use anyhow::{bail, Context, Result};
use image::RgbImage;
use serde::Deserialize;
use std::{
    io::{BufRead, BufReader, Write},
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
    sync::{Mutex, TryLockError},
};

use crate::settings::DetectorSettings;

/// Normalized image coordinates of one landmark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone)]
pub struct DetectedHand {
    pub landmarks: Vec<Landmark>,
    pub score: f32,
}

/// Finds hands in an RGB image. Implementations must be callable from any
/// thread; the extractor invokes them from blocking worker tasks.
pub trait HandDetector: Send + Sync {
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedHand>>;

    fn is_ready(&self) -> bool {
        true
    }
}

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    score: f32,
    landmarks: Vec<Landmark>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

struct HelperProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

pub struct MediapipeBridge {
    process: Mutex<HelperProcess>,
}

impl MediapipeBridge {
    /// Starts the helper and waits for its `READY` line.
    pub fn spawn(settings: &DetectorSettings) -> Result<Self> {
        if !settings.script.exists() {
            bail!(
                "hand landmark helper not found at {}",
                settings.script.display()
            );
        }

        log::info!("Starting MediaPipe hand detector subprocess...");

        let mut child = Command::new(&settings.python)
            .arg(&settings.script)
            .arg("--min-detection-confidence")
            .arg(settings.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(settings.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| {
                format!(
                    "failed to start {} {}",
                    settings.python.display(),
                    settings.script.display()
                )
            })?;

        let stdin = child.stdin.take().context("helper stdin unavailable")?;
        let stdout = child.stdout.take().context("helper stdout unavailable")?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout
            .read_line(&mut ready)
            .context("failed to read helper ready line")?;
        if ready.trim() != "READY" {
            let _ = child.kill();
            bail!("hand landmark helper did not signal ready, got: {:?}", ready.trim());
        }

        log::info!("MediaPipe hand detector ready");

        Ok(Self::from_child(child, stdin, stdout))
    }

    fn from_child(child: Child, stdin: ChildStdin, stdout: BufReader<ChildStdout>) -> Self {
        Self {
            process: Mutex::new(HelperProcess {
                child,
                stdin,
                stdout,
            }),
        }
    }
}

impl HandDetector for MediapipeBridge {
    fn detect(&self, image: &RgbImage) -> Result<Vec<DetectedHand>> {
        let mut process = match self.process.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let (width, height) = image.dimensions();
        process.stdin.write_all(&width.to_le_bytes())?;
        process.stdin.write_all(&height.to_le_bytes())?;
        process.stdin.write_all(&3u32.to_le_bytes())?;
        process.stdin.write_all(image.as_raw())?;
        process.stdin.flush().context("failed to send frame to helper")?;

        let mut line = String::new();
        let read = process
            .stdout
            .read_line(&mut line)
            .context("failed to read helper response")?;
        if read == 0 {
            bail!("hand landmark helper closed its output");
        }

        let response: DetectionJson = serde_json::from_str(&line)
            .with_context(|| format!("malformed helper response: {}", line.trim()))?;
        if let Some(error) = response.error {
            bail!("hand landmark helper error: {error}");
        }

        Ok(response
            .hands
            .into_iter()
            .map(|hand| DetectedHand {
                landmarks: hand.landmarks,
                score: hand.score,
            })
            .collect())
    }

    /// False once the helper has exited. A helper busy with a frame counts as alive.
    fn is_ready(&self) -> bool {
        let mut process = match self.process.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return true,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        match process.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                log::warn!("hand landmark helper exited: {status}");
                false
            }
            Err(err) => {
                log::warn!("failed to poll hand landmark helper: {err}");
                false
            }
        }
    }
}

impl Drop for MediapipeBridge {
    fn drop(&mut self) {
        let process = match self.process.get_mut() {
            Ok(process) => process,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = process.child.kill();
        let _ = process.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_helper_response_ignoring_depth() {
        let line = r#"{"hands":[{"handedness":"Left","score":0.93,"landmarks":[{"x":0.1,"y":0.2,"z":-0.01}]}]}"#;
        let parsed: DetectionJson = serde_json::from_str(line).unwrap();
        assert!(parsed.error.is_none());
        assert_eq!(parsed.hands.len(), 1);
        assert_eq!(parsed.hands[0].landmarks[0], Landmark { x: 0.1, y: 0.2 });
    }

    #[test]
    fn missing_script_fails_startup() {
        let settings = DetectorSettings {
            script: "does/not/exist.py".into(),
            ..DetectorSettings::default()
        };
        assert!(MediapipeBridge::spawn(&settings).is_err());
    }

    #[cfg(unix)]
    fn bridge_running(script: &str) -> MediapipeBridge {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let stdin = child.stdin.take().unwrap();
        let stdout = BufReader::new(child.stdout.take().unwrap());
        MediapipeBridge::from_child(child, stdin, stdout)
    }

    #[cfg(unix)]
    #[test]
    fn live_helper_is_ready() {
        let bridge = bridge_running("cat");
        assert!(bridge.is_ready());
    }

    #[cfg(unix)]
    #[test]
    fn exited_helper_is_not_ready() {
        let bridge = bridge_running("exit 0");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while bridge.is_ready() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(!bridge.is_ready());
    }
}
