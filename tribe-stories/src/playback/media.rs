//! Media playback adapter
//!
//! Decides what the rendering layer should show for the current story and
//! folds load/play failures into a single error flag. Media failures never
//! move the cursor: the progress timer alone decides when a story ends.

use serde::{Deserialize, Serialize};
use tribe_common::models::{MediaType, Story};
use tracing::debug;

/// Inline stand-in for an image that failed to load (no network fetch)
pub const IMAGE_PLACEHOLDER: &str = "data:image/svg+xml;utf8,\
<svg xmlns='http://www.w3.org/2000/svg' width='400' height='700' viewBox='0 0 400 700'>\
<rect width='400' height='700' fill='%231f2937'/>\
<text x='200' y='350' fill='%239ca3af' font-family='sans-serif' font-size='20' \
text-anchor='middle'>Image unavailable</text></svg>";

/// How video stories are played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoOptions {
    pub autoplay: bool,
    pub muted: bool,
    pub looped: bool,
    pub inline: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            muted: true,
            looped: true,
            inline: true,
        }
    }
}

/// What to render for the current story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaView {
    Image { url: String },
    /// Image failed; render the inline placeholder instead
    ImagePlaceholder { data_uri: String },
    Video { url: String, options: VideoOptions },
    /// Video failed; render an error panel instead of the player
    VideoError,
}

/// Signals from the rendering layer about the current media element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MediaEvent {
    /// Image decoded / video metadata ready
    Loaded,
    /// Video playback actually started
    PlayStarted,
    /// Load or playback error
    Failed { message: String },
}

/// Effect of a media event on the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOutcome {
    /// Nothing observable changed
    Unchanged,
    /// Video is now playing
    Started,
    /// First failure for this story; placeholder now shown
    Failed,
}

/// Media state for one story display
///
/// A fresh adapter is built for every story, which is what resets the error
/// flag on each transition.
#[derive(Debug, Clone)]
pub struct MediaAdapter {
    story_id: u64,
    media_type: MediaType,
    url: String,
    options: VideoOptions,
    failed: bool,
    playing: bool,
}

impl MediaAdapter {
    pub fn for_story(story: &Story) -> Self {
        Self {
            story_id: story.id,
            media_type: story.media_type,
            url: story.media_url.clone(),
            options: VideoOptions::default(),
            failed: false,
            playing: false,
        }
    }

    pub fn story_id(&self) -> u64 {
        self.story_id
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn has_error(&self) -> bool {
        self.failed
    }

    /// True once a video reported play-start (always false for images)
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn view(&self) -> MediaView {
        match (self.media_type, self.failed) {
            (MediaType::Image, false) => MediaView::Image {
                url: self.url.clone(),
            },
            (MediaType::Image, true) => MediaView::ImagePlaceholder {
                data_uri: IMAGE_PLACEHOLDER.to_string(),
            },
            (MediaType::Video, false) => MediaView::Video {
                url: self.url.clone(),
                options: self.options,
            },
            (MediaType::Video, true) => MediaView::VideoError,
        }
    }

    pub fn handle(&mut self, event: &MediaEvent) -> MediaOutcome {
        match event {
            MediaEvent::Loaded => MediaOutcome::Unchanged,
            MediaEvent::PlayStarted => {
                if self.media_type != MediaType::Video || self.failed || self.playing {
                    return MediaOutcome::Unchanged;
                }
                self.playing = true;
                MediaOutcome::Started
            }
            MediaEvent::Failed { message } => {
                if self.failed {
                    return MediaOutcome::Unchanged;
                }
                debug!(story_id = self.story_id, media_type = %self.media_type, "Media failed: {}", message);
                self.failed = true;
                self.playing = false;
                MediaOutcome::Failed
            }
        }
    }
}
