//! Playback-related type definitions
//!
//! Supporting types for story playback state and viewer lifecycle.

use serde::{Deserialize, Serialize};

/// Story playback state (progress timer running or not)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Why the story viewer closed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Advanced past the last story of the last group
    Finished,
    /// Escape key or explicit close request
    Dismissed,
    /// Owner went away without closing (handle dropped)
    Abandoned,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Finished => write!(f, "finished"),
            CloseReason::Dismissed => write!(f, "dismissed"),
            CloseReason::Abandoned => write!(f, "abandoned"),
        }
    }
}
