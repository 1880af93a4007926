//! Camera capture for story creation
//!
//! [`CameraSession`] wraps an acquired [`MediaStream`] and stops every track
//! exactly once, whether released explicitly or dropped. [`StoryRecorder`]
//! layers the recording state machine on top:
//!
//! ```text
//! Idle -> Previewing -> Recording -> Recorded
//!   ^         |             |
//!   +---------+-------------+  (cancel / failure)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use tribe_common::reporting::ErrorReporter;
use uuid::Uuid;

use crate::config::ViewerConfig;
use crate::error::{Error, Result};

const REPORT_SOURCE: &str = "camera";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// One capture track of an acquired stream
pub trait MediaTrack: Send + Sync {
    fn kind(&self) -> TrackKind;

    /// Stop capturing; the track cannot be restarted
    fn stop(&self);

    fn is_live(&self) -> bool;
}

/// Tracks handed out by [`MediaDevices::get_user_media`]
#[derive(Clone, Default)]
pub struct MediaStream {
    tracks: Vec<Arc<dyn MediaTrack>>,
}

impl MediaStream {
    pub fn new(tracks: Vec<Arc<dyn MediaTrack>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<dyn MediaTrack>] {
        &self.tracks
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_live()).count()
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("tracks", &self.tracks.len())
            .field("live", &self.live_tracks())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    User,
    Environment,
}

/// What to ask the device layer for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConstraints {
    pub video: bool,
    pub audio: bool,
    pub facing_mode: FacingMode,
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            facing_mode: FacingMode::User,
        }
    }
}

/// Platform camera/microphone access
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn get_user_media(&self, constraints: &CaptureConstraints) -> Result<MediaStream>;
}

/// Scoped ownership of an acquired stream
#[derive(Debug)]
pub struct CameraSession {
    stream: MediaStream,
    released: bool,
}

impl CameraSession {
    pub fn new(stream: MediaStream) -> Self {
        Self {
            stream,
            released: false,
        }
    }

    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop every track; later calls do nothing. Returns tracks stopped.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;
        for track in self.stream.tracks() {
            track.stop();
        }
        debug!(tracks = self.stream.tracks().len(), "Camera released");
        self.stream.tracks().len()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.release();
    }
}

/// A finished recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedClip {
    pub id: Uuid,
    pub duration_ms: u64,
    /// Recording hit the length cap before it was stopped
    pub truncated: bool,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Previewing,
    Recording { started_at: Instant },
    Recorded(RecordedClip),
}

impl RecorderState {
    pub fn name(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::Previewing => "previewing",
            RecorderState::Recording { .. } => "recording",
            RecorderState::Recorded(_) => "recorded",
        }
    }
}

/// Story camera: preview, record, and release
pub struct StoryRecorder {
    devices: Arc<dyn MediaDevices>,
    reporter: Arc<dyn ErrorReporter>,
    constraints: CaptureConstraints,
    max_recording: Duration,
    camera: Option<CameraSession>,
    state: RecorderState,
}

impl StoryRecorder {
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        reporter: Arc<dyn ErrorReporter>,
        max_recording: Duration,
    ) -> Self {
        Self {
            devices,
            reporter,
            constraints: CaptureConstraints::default(),
            max_recording,
            camera: None,
            state: RecorderState::Idle,
        }
    }

    /// Recorder capped at the configured `max_recording_ms`
    pub fn from_config(
        devices: Arc<dyn MediaDevices>,
        reporter: Arc<dyn ErrorReporter>,
        config: &ViewerConfig,
    ) -> Self {
        Self::new(devices, reporter, config.max_recording())
    }

    pub fn with_constraints(mut self, constraints: CaptureConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn state(&self) -> &RecorderState {
        &self.state
    }

    /// Live tracks currently held
    pub fn active_tracks(&self) -> usize {
        self.camera
            .as_ref()
            .filter(|c| !c.is_released())
            .map(|c| c.stream().live_tracks())
            .unwrap_or(0)
    }

    /// Acquire the camera and enter preview
    pub async fn start_camera(&mut self) -> Result<()> {
        match self.state {
            RecorderState::Previewing => return Ok(()),
            RecorderState::Recording { .. } => {
                return Err(Error::InvalidState(
                    "cannot restart camera while recording".to_string(),
                ))
            }
            RecorderState::Idle | RecorderState::Recorded(_) => {}
        }

        match self.devices.get_user_media(&self.constraints).await {
            Ok(stream) => {
                info!(tracks = stream.tracks().len(), "Camera started");
                self.camera = Some(CameraSession::new(stream));
                self.state = RecorderState::Previewing;
                Ok(())
            }
            Err(e) => {
                let message = format!("Could not access camera: {}", e);
                self.reporter.error(REPORT_SOURCE, &message);
                self.release();
                self.state = RecorderState::Idle;
                Err(Error::Camera(message))
            }
        }
    }

    pub fn start_recording(&mut self) -> Result<()> {
        if self.state != RecorderState::Previewing {
            return Err(Error::InvalidState(format!(
                "cannot record from {} state",
                self.state.name()
            )));
        }
        self.state = RecorderState::Recording {
            started_at: Instant::now(),
        };
        debug!("Recording started");
        Ok(())
    }

    /// Finish recording and release the camera
    pub fn stop_recording(&mut self) -> Result<RecordedClip> {
        let RecorderState::Recording { started_at } = self.state else {
            return Err(Error::InvalidState(format!(
                "cannot stop recording from {} state",
                self.state.name()
            )));
        };

        let elapsed = started_at.elapsed();
        let truncated = elapsed >= self.max_recording;
        let clip = RecordedClip {
            id: Uuid::new_v4(),
            duration_ms: elapsed.min(self.max_recording).as_millis() as u64,
            truncated,
            recorded_at: Utc::now(),
        };

        self.release();
        self.state = RecorderState::Recorded(clip.clone());
        info!(clip_id = %clip.id, duration_ms = clip.duration_ms, truncated, "Recording finished");
        Ok(clip)
    }

    /// Stop automatically once the length cap is reached
    pub fn poll_limit(&mut self) -> Option<RecordedClip> {
        match self.state {
            RecorderState::Recording { started_at } if started_at.elapsed() >= self.max_recording => {
                self.stop_recording().ok()
            }
            _ => None,
        }
    }

    /// Time left before the cap, while recording
    pub fn remaining(&self) -> Option<Duration> {
        match self.state {
            RecorderState::Recording { started_at } => {
                Some(self.max_recording.saturating_sub(started_at.elapsed()))
            }
            _ => None,
        }
    }

    /// Abandon whatever is in progress
    pub fn cancel(&mut self) {
        if self.state != RecorderState::Idle {
            debug!(state = self.state.name(), "Camera cancelled");
        }
        self.release();
        self.state = RecorderState::Idle;
    }

    /// Recording failed underneath us
    pub fn fail(&mut self, message: &str) {
        warn!(state = self.state.name(), "Camera failure: {}", message);
        self.reporter.error(REPORT_SOURCE, message);
        self.release();
        self.state = RecorderState::Idle;
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
    }
}
