//! Like side-channel
//!
//! "Request, then apply truth from the response": the client never guesses a
//! new count. A single in-flight guard blocks a second submission until the
//! first one resolves. Failures leave state untouched and are not retried.

use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;
use tribe_common::models::{LikeStatus, Story};

/// Backend operations used by the like side-channel
#[async_trait]
pub trait LikeApi: Send + Sync {
    /// `POST /stories/{id}/like`: toggle and return the new server state
    async fn toggle_like(&self, story_id: u64) -> Result<LikeStatus>;

    /// `GET /stories/{id}/like-status`: for stories fetched without embedded
    /// like data
    async fn like_status(&self, story_id: u64) -> Result<LikeStatus>;
}

/// Re-entrancy guard for like submissions
#[derive(Debug, Default, Clone)]
pub struct LikeGuard {
    in_flight: Option<u64>,
}

impl LikeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the guard for `story_id`
    pub fn begin(&mut self, story_id: u64) -> Result<()> {
        if let Some(pending) = self.in_flight {
            return Err(Error::LikeInFlight(pending));
        }
        self.in_flight = Some(story_id);
        Ok(())
    }

    /// Release the guard; returns the story id that was in flight
    pub fn finish(&mut self) -> Option<u64> {
        self.in_flight.take()
    }

    pub fn is_liking(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn pending(&self) -> Option<u64> {
        self.in_flight
    }
}

/// Replace a story's embedded like state with the server's current value
pub async fn refresh_like_status(api: &dyn LikeApi, story: &mut Story) -> Result<LikeStatus> {
    let status = api.like_status(story.id).await?;
    if status != story.like_status() {
        debug!(story_id = story.id, liked = status.liked, "Like status refreshed");
    }
    story.apply_like_status(status);
    Ok(status)
}
