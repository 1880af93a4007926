//! Shared fixtures for tribe-stories integration tests
//!
//! - story / group builders
//! - EventStream: timed access to the viewer's event bus
//! - ScriptedLikeApi: in-process like backend with call counting
//! - open_session: spawn a viewer session wired to all of the above

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::broadcast;
use tokio::time::Instant;

use tribe_common::events::{EventBus, TribeEvent};
use tribe_common::models::{LikeStatus, MediaType, Story, StoryGroup, UserSummary};
use tribe_common::reporting::{ErrorReporter, MemoryReporter};
use tribe_stories::config::ViewerConfig;
use tribe_stories::likes::LikeApi;
use tribe_stories::playback::{Position, StoryViewer, ViewerHandle};
use tribe_stories::{Error, Result};

pub fn story(id: u64, media_type: MediaType) -> Story {
    let created_at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
    Story {
        id,
        media_url: format!("https://cdn.tribe.dev/stories/{}.bin", id),
        media_type,
        caption: Some(format!("story {}", id)),
        expires_at: created_at + chrono::Duration::hours(24),
        time_remaining: Some("24h".to_string()),
        created_at,
        likes_count: 5,
        is_liked: false,
        comments_count: 0,
    }
}

/// One group per entry with that many stories; story ids are `(g + 1) * 100 + s`
pub fn groups_with(sizes: &[usize]) -> Vec<StoryGroup> {
    sizes
        .iter()
        .enumerate()
        .map(|(g, &n)| StoryGroup {
            user: UserSummary {
                id: g as u64 + 1,
                username: format!("coder{}", g),
                full_name: format!("Coder {}", g),
                avatar: None,
            },
            stories: (0..n)
                .map(|s| {
                    let media_type = if s % 2 == 0 { MediaType::Image } else { MediaType::Video };
                    story((g as u64 + 1) * 100 + s as u64, media_type)
                })
                .collect(),
            has_viewed: false,
        })
        .collect()
}

/// 1s stories ticking every 100ms
pub fn fast_config() -> ViewerConfig {
    ViewerConfig {
        story_duration_ms: 1_000,
        tick_interval_ms: 100,
        ..Default::default()
    }
}

/// Receiver wrapper with deadline helpers
pub struct EventStream {
    pub receiver: broadcast::Receiver<TribeEvent>,
    pub start_time: Instant,
}

impl EventStream {
    /// Wait for next event with timeout
    pub async fn next_timeout(&mut self, timeout: Duration) -> Option<TribeEvent> {
        tokio::time::timeout(timeout, self.receiver.recv())
            .await
            .ok()
            .and_then(|r| r.ok())
    }

    /// Wait for specific event type, skipping others
    pub async fn wait_for(&mut self, event_type: &str, timeout: Duration) -> Option<TribeEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            match self.next_timeout(deadline - now).await {
                Some(event) if event.event_type() == event_type => return Some(event),
                Some(_) => continue,
                None => return None,
            }
        }
    }

    /// Wait for a `StoryStarted` and return its story id
    pub async fn next_story(&mut self, timeout: Duration) -> Option<u64> {
        match self.wait_for("StoryStarted", timeout).await? {
            TribeEvent::StoryStarted { story_id, .. } => Some(story_id),
            _ => None,
        }
    }

    /// Every event already buffered, without waiting
    pub fn drain(&mut self) -> Vec<TribeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

/// Like backend answering from memory
pub struct ScriptedLikeApi {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
}

impl ScriptedLikeApi {
    pub fn ok(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: false,
        })
    }

    pub fn failing(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            fail: true,
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LikeApi for ScriptedLikeApi {
    async fn toggle_like(&self, _story_id: u64) -> Result<LikeStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(Error::Api {
                status: 500,
                message: "Server Error".to_string(),
            });
        }
        Ok(LikeStatus {
            liked: true,
            likes_count: 6,
        })
    }

    async fn like_status(&self, _story_id: u64) -> Result<LikeStatus> {
        Ok(LikeStatus {
            liked: false,
            likes_count: 5,
        })
    }
}

/// A running viewer session plus its observation points
pub struct TestSession {
    pub handle: ViewerHandle,
    pub events: EventStream,
    pub reporter: Arc<MemoryReporter>,
}

/// Open a viewer over `groups_with(sizes)` and spawn its session
///
/// Subscribes before opening, so `ViewerOpened` is the first event seen.
pub fn open_session(
    sizes: &[usize],
    at: Position,
    config: &ViewerConfig,
    api: Arc<dyn LikeApi>,
) -> TestSession {
    let bus = Arc::new(EventBus::new(10_000));
    let events = EventStream {
        receiver: bus.subscribe(),
        start_time: Instant::now(),
    };
    let reporter = Arc::new(MemoryReporter::new());
    let viewer = StoryViewer::open(
        groups_with(sizes),
        at,
        config,
        bus,
        Arc::clone(&reporter) as Arc<dyn ErrorReporter>,
    )
    .expect("Failed to open viewer");

    TestSession {
        handle: ViewerHandle::spawn(viewer, api),
        events,
        reporter,
    }
}
