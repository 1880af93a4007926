//! Event types for the Tribe event system
//!
//! Provides shared event definitions and EventBus for all Tribe client modules.

mod playback_types;

pub use playback_types::{CloseReason, PlaybackState};

use crate::models::MediaType;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tribe client event types
///
/// Events are broadcast via EventBus and can be serialized (one JSON object
/// per event, tagged with `type`) for rendering layers or logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TribeEvent {
    /// Story viewer opened
    ViewerOpened {
        /// Viewer session id
        session_id: Uuid,
        group_index: usize,
        story_index: usize,
        /// Number of playable groups in this session
        group_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A story became current (open, advance, retreat)
    ///
    /// Progress is 0 whenever this fires.
    StoryStarted {
        story_id: u64,
        group_index: usize,
        story_index: usize,
        media_type: MediaType,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress bar update (0.0-100.0)
    ///
    /// Emitted on every timer tick; lossy by nature.
    StoryProgress {
        story_id: u64,
        progress: f64,
    },

    /// Progress reached 100% for a story
    ///
    /// Fires once per story display and is always followed by an advance.
    StoryCompleted {
        story_id: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playback state changed (Playing ↔ Paused)
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media for the current story failed to load or play
    ///
    /// The viewer keeps its timer running; this only swaps in a placeholder.
    MediaFailed {
        story_id: u64,
        media_type: MediaType,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Server confirmed a like toggle
    LikeUpdated {
        story_id: u64,
        liked: bool,
        likes_count: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Like toggle failed (state left unchanged)
    LikeFailed {
        story_id: u64,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A group was shown for the first time in this session
    GroupViewed {
        user_id: u64,
        group_index: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Story viewer closed; no further events follow for this session
    ViewerClosed {
        session_id: Uuid,
        reason: CloseReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TribeEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            TribeEvent::ViewerOpened { .. } => "ViewerOpened",
            TribeEvent::StoryStarted { .. } => "StoryStarted",
            TribeEvent::StoryProgress { .. } => "StoryProgress",
            TribeEvent::StoryCompleted { .. } => "StoryCompleted",
            TribeEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            TribeEvent::MediaFailed { .. } => "MediaFailed",
            TribeEvent::LikeUpdated { .. } => "LikeUpdated",
            TribeEvent::LikeFailed { .. } => "LikeFailed",
            TribeEvent::GroupViewed { .. } => "GroupViewed",
            TribeEvent::ViewerClosed { .. } => "ViewerClosed",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over `tokio::sync::broadcast`; slow receivers lose the oldest
/// events rather than blocking the emitter.
pub struct EventBus {
    tx: broadcast::Sender<TribeEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use tribe_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TribeEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TribeEvent,
    ) -> Result<usize, broadcast::error::SendError<TribeEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: TribeEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = TribeEvent::PlaybackStateChanged {
            old_state: PlaybackState::Playing,
            new_state: PlaybackState::Paused,
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "PlaybackStateChanged");
        assert_eq!(json["old_state"], "playing");
        assert_eq!(json["new_state"], "paused");
        assert_eq!(event.event_type(), "PlaybackStateChanged");
    }

    #[test]
    fn test_close_reason_wire_name() {
        let event = TribeEvent::ViewerClosed {
            session_id: Uuid::new_v4(),
            reason: CloseReason::Finished,
            timestamp: chrono::Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["reason"], "finished");
    }

    #[tokio::test]
    async fn test_event_bus_delivers_to_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        let sent = bus
            .emit(TribeEvent::StoryProgress { story_id: 9, progress: 50.0 })
            .unwrap();
        assert_eq!(sent, 2);

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                TribeEvent::StoryProgress { story_id, progress } => {
                    assert_eq!(story_id, 9);
                    assert_eq!(progress, 50.0);
                }
                other => panic!("Unexpected event: {:?}", other),
            }
        }
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus
            .emit(TribeEvent::StoryProgress { story_id: 1, progress: 0.0 })
            .is_err());
        // Lossy variant never fails
        bus.emit_lossy(TribeEvent::StoryProgress { story_id: 1, progress: 0.0 });
    }
}
