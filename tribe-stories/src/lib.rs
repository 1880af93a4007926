//! # Tribe Stories Library (tribe-stories)
//!
//! Headless story viewer: auto-advancing, progress-tracked playback of story
//! groups fetched from the Tribe backend.
//!
//! **Architecture:** A synchronous state machine ([`playback::StoryViewer`])
//! owns the playback cursor, progress timer, media state and like guard. An
//! async session actor ([`playback::session`]) is its only mutator, feeding it
//! input, media events, timer ticks and like responses over channels.

pub mod api;
pub mod camera;
pub mod config;
pub mod error;
pub mod input;
pub mod likes;
pub mod playback;

pub use error::{Error, Result};
pub use playback::{StoryViewer, ViewerHandle};
