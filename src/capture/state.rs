use tokio::time::{Duration, Instant};

use crate::keypoints::KeypointFrame;
use crate::settings::CaptureSettings;
use crate::utils::LogState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    Countdown,
    Recording,
    Paused,
}

#[derive(Debug, Clone, Copy)]
pub struct CaptureTimings {
    pub countdown: Duration,
    pub recording: Duration,
    pub pause: Duration,
    pub stable_frames: u32,
}

impl From<&CaptureSettings> for CaptureTimings {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            countdown: settings.countdown(),
            recording: settings.recording(),
            pause: settings.pause(),
            stable_frames: settings.stable_frames.max(1),
        }
    }
}

impl Default for CaptureTimings {
    fn default() -> Self {
        Self::from(&CaptureSettings::default())
    }
}

/// What one frame did to the capture session.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureStatus {
    Idle { hands: bool },
    CountdownTriggered,
    Countdown { remaining: u32, hands: bool },
    Recording { progress: f32, hands: bool },
    /// Recording time elapsed; the buffer is handed over and the session is now paused.
    RecordingFinished { frames: Vec<KeypointFrame> },
    Paused { remaining: Duration },
    PauseEnded { hands: bool },
}

impl CaptureStatus {
    pub fn message(&self) -> String {
        match self {
            CaptureStatus::Idle { hands: true } => "Both hands detected - ready to record".into(),
            CaptureStatus::Idle { hands: false } | CaptureStatus::PauseEnded { hands: false } => {
                "Show both hands to the camera".into()
            }
            CaptureStatus::PauseEnded { hands: true } => "Both hands detected - ready to record".into(),
            CaptureStatus::CountdownTriggered => "Starting recording sequence...".into(),
            CaptureStatus::Countdown { remaining, .. } => {
                format!("Recording starts in {remaining} seconds...")
            }
            CaptureStatus::Recording { progress, .. } => {
                format!("Recording... {}% complete", (progress * 100.0) as u32)
            }
            CaptureStatus::RecordingFinished { frames } => {
                format!("Recording complete: {} frames", frames.len())
            }
            CaptureStatus::Paused { remaining } => {
                format!("Paused after prediction... {:.1}s", remaining.as_secs_f32())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogMark {
    Phase(CapturePhase),
    Second(u32),
}

#[derive(Debug)]
pub struct CaptureState {
    phase: CapturePhase,
    phase_started_at: Instant,
    buffer: Vec<KeypointFrame>,
    consecutive_good: u32,
    countdown_remaining: u32,
    timings: CaptureTimings,
    log_state: LogState<LogMark>,
}

impl CaptureState {
    pub fn new(timings: CaptureTimings) -> Self {
        Self {
            phase: CapturePhase::Idle,
            phase_started_at: Instant::now(),
            buffer: Vec::new(),
            consecutive_good: 0,
            countdown_remaining: 0,
            timings,
            log_state: LogState::new(),
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn timings(&self) -> CaptureTimings {
        self.timings
    }

    pub fn buffered_frames(&self) -> usize {
        self.buffer.len()
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    /// Advances the machine by one frame. Phase expiry is checked here, so a
    /// session with no incoming frames stays where it is.
    pub fn on_frame(&mut self, keypoints: Option<&KeypointFrame>, now: Instant) -> CaptureStatus {
        let hands = keypoints.is_some();
        let elapsed = now.saturating_duration_since(self.phase_started_at);

        match self.phase {
            CapturePhase::Paused => {
                if elapsed >= self.timings.pause {
                    self.enter(CapturePhase::Idle, now);
                    self.consecutive_good = 0;
                    CaptureStatus::PauseEnded { hands }
                } else {
                    CaptureStatus::Paused {
                        remaining: self.timings.pause - elapsed,
                    }
                }
            }
            CapturePhase::Idle => {
                if !hands {
                    self.consecutive_good = 0;
                    return CaptureStatus::Idle { hands };
                }
                self.consecutive_good += 1;
                if self.consecutive_good >= self.timings.stable_frames {
                    self.begin_countdown(now);
                    CaptureStatus::CountdownTriggered
                } else {
                    CaptureStatus::Idle { hands }
                }
            }
            CapturePhase::Countdown => CaptureStatus::Countdown {
                remaining: self.countdown_remaining,
                hands,
            },
            CapturePhase::Recording => {
                if elapsed >= self.timings.recording {
                    let frames = std::mem::take(&mut self.buffer);
                    self.enter(CapturePhase::Paused, now);
                    return CaptureStatus::RecordingFinished { frames };
                }
                if let Some(frame) = keypoints {
                    self.buffer.push(*frame);
                }
                CaptureStatus::Recording {
                    progress: (elapsed.as_secs_f32() / self.timings.recording.as_secs_f32()).min(1.0),
                    hands,
                }
            }
        }
    }

    /// Whole seconds shown while counting down.
    pub fn countdown_seconds(&self) -> u32 {
        self.timings.countdown.as_secs_f64().ceil().max(1.0) as u32
    }

    pub fn begin_countdown(&mut self, now: Instant) {
        self.enter(CapturePhase::Countdown, now);
        self.consecutive_good = 0;
        self.countdown_remaining = self.countdown_seconds();
    }

    pub fn set_countdown_remaining(&mut self, remaining: u32) {
        if self.phase == CapturePhase::Countdown {
            self.countdown_remaining = remaining;
        }
    }

    /// Only a running countdown can start a recording.
    pub fn begin_recording(&mut self, now: Instant) -> bool {
        if self.phase != CapturePhase::Countdown {
            return false;
        }
        self.enter(CapturePhase::Recording, now);
        self.countdown_remaining = 0;
        self.buffer.clear();
        true
    }

    pub fn cancel(&mut self) {
        self.phase = CapturePhase::Idle;
        self.buffer.clear();
        self.consecutive_good = 0;
        self.countdown_remaining = 0;
        self.log_state.reset();
    }

    /// True the first time a given phase (or countdown second) is reported.
    pub fn should_log(&mut self) -> bool {
        let mark = match self.phase {
            CapturePhase::Countdown => LogMark::Second(self.countdown_remaining),
            phase => LogMark::Phase(phase),
        };
        self.log_state.changed(mark)
    }

    fn enter(&mut self, phase: CapturePhase, now: Instant) {
        self.phase = phase;
        self.phase_started_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::KEYPOINTS;

    fn frame() -> KeypointFrame {
        KeypointFrame([[0.5, 0.5]; KEYPOINTS])
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn detection_in_idle_starts_countdown_not_recording() {
        let t0 = Instant::now();
        let mut state = CaptureState::new(CaptureTimings::default());

        assert_eq!(state.on_frame(None, t0), CaptureStatus::Idle { hands: false });
        assert_eq!(state.on_frame(Some(&frame()), t0), CaptureStatus::CountdownTriggered);
        assert_eq!(state.phase(), CapturePhase::Countdown);
        assert_eq!(state.countdown_remaining(), 3);

        // Frames during the countdown are not buffered.
        let status = state.on_frame(Some(&frame()), t0 + ms(500));
        assert_eq!(status, CaptureStatus::Countdown { remaining: 3, hands: true });
        assert_eq!(state.buffered_frames(), 0);
    }

    #[test]
    fn stability_threshold_counts_consecutive_frames() {
        let t0 = Instant::now();
        let timings = CaptureTimings {
            stable_frames: 3,
            ..CaptureTimings::default()
        };
        let mut state = CaptureState::new(timings);

        state.on_frame(Some(&frame()), t0);
        state.on_frame(Some(&frame()), t0);
        state.on_frame(None, t0);
        state.on_frame(Some(&frame()), t0);
        state.on_frame(Some(&frame()), t0);
        assert_eq!(state.phase(), CapturePhase::Idle);
        assert_eq!(state.on_frame(Some(&frame()), t0), CaptureStatus::CountdownTriggered);
    }

    #[test]
    fn recording_requires_countdown() {
        let mut state = CaptureState::new(CaptureTimings::default());
        assert!(!state.begin_recording(Instant::now()));
        assert_eq!(state.phase(), CapturePhase::Idle);
    }

    #[test]
    fn recording_always_ends_in_pause() {
        let t0 = Instant::now();
        let mut state = CaptureState::new(CaptureTimings::default());
        state.begin_countdown(t0);
        assert!(state.begin_recording(t0));

        for i in 0..10 {
            let keypoints = if i % 2 == 0 { Some(frame()) } else { None };
            let status = state.on_frame(keypoints.as_ref(), t0 + ms(i * 100));
            assert!(matches!(status, CaptureStatus::Recording { .. }));
        }
        assert_eq!(state.buffered_frames(), 5);

        match state.on_frame(Some(&frame()), t0 + ms(2800)) {
            CaptureStatus::RecordingFinished { frames } => assert_eq!(frames.len(), 5),
            other => panic!("expected RecordingFinished, got {other:?}"),
        }
        assert_eq!(state.phase(), CapturePhase::Paused);
        assert_eq!(state.buffered_frames(), 0);
    }

    #[test]
    fn empty_recording_still_pauses() {
        let t0 = Instant::now();
        let mut state = CaptureState::new(CaptureTimings::default());
        state.begin_countdown(t0);
        state.begin_recording(t0);

        let status = state.on_frame(None, t0 + ms(3000));
        assert_eq!(status, CaptureStatus::RecordingFinished { frames: Vec::new() });
        assert_eq!(state.phase(), CapturePhase::Paused);
    }

    #[test]
    fn pause_blocks_triggers_until_expiry() {
        let t0 = Instant::now();
        let mut state = CaptureState::new(CaptureTimings::default());
        state.begin_countdown(t0);
        state.begin_recording(t0);
        state.on_frame(None, t0 + ms(2800));

        let paused_at = t0 + ms(2800);
        for step in [0, 500, 1999] {
            let status = state.on_frame(Some(&frame()), paused_at + ms(step));
            assert!(matches!(status, CaptureStatus::Paused { .. }), "step {step}: {status:?}");
        }

        assert_eq!(
            state.on_frame(Some(&frame()), paused_at + ms(2000)),
            CaptureStatus::PauseEnded { hands: true }
        );
        assert_eq!(state.phase(), CapturePhase::Idle);

        // The next good frame starts a fresh cycle.
        assert_eq!(
            state.on_frame(Some(&frame()), paused_at + ms(2050)),
            CaptureStatus::CountdownTriggered
        );
    }

    #[test]
    fn cancel_returns_to_idle_from_any_phase() {
        let t0 = Instant::now();
        let mut state = CaptureState::new(CaptureTimings::default());
        state.begin_countdown(t0);
        state.begin_recording(t0);
        state.on_frame(Some(&frame()), t0 + ms(10));
        assert_eq!(state.buffered_frames(), 1);

        state.cancel();
        assert_eq!(state.phase(), CapturePhase::Idle);
        assert_eq!(state.buffered_frames(), 0);
        assert!(!state.begin_recording(t0));
    }

    #[test]
    fn log_marks_change_once_per_second() {
        let mut state = CaptureState::new(CaptureTimings::default());
        state.begin_countdown(Instant::now());
        assert!(state.should_log());
        assert!(!state.should_log());
        state.set_countdown_remaining(2);
        assert!(state.should_log());
    }
}
