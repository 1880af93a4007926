//! Story viewer state machine
//!
//! `StoryViewer` combines the navigation cursor, progress timer, media adapter
//! and like guard into one synchronous state machine. It never spawns tasks or
//! sleeps; the session actor drives it with ticks and user input and performs
//! the network calls it asks for.
//!
//! Every story transition (forward or backward) restarts the progress timer
//! and builds a fresh media adapter, so progress and the media error flag are
//! both reset.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tribe_common::events::{CloseReason, EventBus, PlaybackState, TribeEvent};
use tribe_common::models::{LikeStatus, Story, StoryGroup, UserSummary};
use tribe_common::reporting::ErrorReporter;
use tribe_common::time::now;
use uuid::Uuid;

use super::media::{MediaAdapter, MediaEvent, MediaOutcome, MediaView};
use super::navigation::{self, PlaybackCursor, Position, Step};
use super::progress::{ProgressTimer, TickOutcome};
use crate::config::ViewerConfig;
use crate::error::{Error, Result};
use crate::input::ViewerCommand;
use crate::likes::LikeGuard;

/// What the caller must do after feeding the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerStep {
    /// Nothing further
    Continue,
    /// Send a like toggle for this story, then call `finish_like`
    LikeRequested(u64),
    /// Viewer is closed; stop driving it
    Closed(CloseReason),
}

/// Point-in-time view of the viewer for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerSnapshot {
    pub session_id: Uuid,
    pub cursor: PlaybackCursor,
    pub user: UserSummary,
    pub story: Story,
    pub media: MediaView,
    pub paused: bool,
    pub is_liking: bool,
    pub closed: Option<CloseReason>,
}

pub struct StoryViewer {
    session_id: Uuid,
    groups: Vec<StoryGroup>,
    position: Position,
    timer: ProgressTimer,
    media: MediaAdapter,
    likes: LikeGuard,
    /// Set only by an explicit pause; transitions clear it
    user_paused: bool,
    closed: Option<CloseReason>,
    events: Arc<EventBus>,
    reporter: Arc<dyn ErrorReporter>,
}

impl StoryViewer {
    /// Open the viewer at `initial` and start the first story
    ///
    /// Fails with `InvalidCursor` when `initial` does not point at a story.
    pub fn open(
        groups: Vec<StoryGroup>,
        initial: Position,
        config: &ViewerConfig,
        events: Arc<EventBus>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Result<Self> {
        navigation::validate(&groups, initial)?;
        let media = MediaAdapter::for_story(&groups[initial.group_index].stories[initial.story_index]);

        let mut viewer = Self {
            session_id: Uuid::new_v4(),
            groups,
            position: initial,
            timer: ProgressTimer::new(config.story_duration_ms, config.tick_interval_ms),
            media,
            likes: LikeGuard::new(),
            user_paused: false,
            closed: None,
            events,
            reporter,
        };

        info!(
            session_id = %viewer.session_id,
            groups = viewer.groups.len(),
            "Story viewer opened at {}",
            initial
        );
        viewer.events.emit_lossy(TribeEvent::ViewerOpened {
            session_id: viewer.session_id,
            group_index: initial.group_index,
            story_index: initial.story_index,
            group_count: viewer.groups.len(),
            timestamp: now(),
        });
        viewer.enter(initial);
        Ok(viewer)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn cursor(&self) -> PlaybackCursor {
        PlaybackCursor {
            group_index: self.position.group_index,
            story_index: self.position.story_index,
            progress: self.timer.progress(),
            playing: self.timer.is_running(),
        }
    }

    pub fn groups(&self) -> &[StoryGroup] {
        &self.groups
    }

    pub fn current_group(&self) -> &StoryGroup {
        &self.groups[self.position.group_index]
    }

    pub fn current_story(&self) -> &Story {
        &self.current_group().stories[self.position.story_index]
    }

    pub fn media(&self) -> &MediaAdapter {
        &self.media
    }

    pub fn media_view(&self) -> MediaView {
        self.media.view()
    }

    pub fn is_paused(&self) -> bool {
        self.user_paused
    }

    pub fn is_liking(&self) -> bool {
        self.likes.is_liking()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_some()
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.closed
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    /// Changes every time the progress timer (re)starts
    pub fn timer_epoch(&self) -> u64 {
        self.timer.epoch()
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        self.timer.interval()
    }

    pub fn snapshot(&self) -> ViewerSnapshot {
        ViewerSnapshot {
            session_id: self.session_id,
            cursor: self.cursor(),
            user: self.current_group().user.clone(),
            story: self.current_story().clone(),
            media: self.media_view(),
            paused: self.user_paused,
            is_liking: self.likes.is_liking(),
            closed: self.closed,
        }
    }

    /// Next story, next group, or close when past the very last story
    pub fn advance(&mut self) -> ViewerStep {
        if let Some(reason) = self.closed {
            return ViewerStep::Closed(reason);
        }
        match navigation::advance(&self.groups, self.position) {
            Step::Moved(next) => {
                self.enter(next);
                ViewerStep::Continue
            }
            Step::Finished => self.close(CloseReason::Finished),
            Step::Stayed => ViewerStep::Continue,
        }
    }

    /// Previous story, last story of the previous group, or nothing at the
    /// first story overall
    pub fn retreat(&mut self) -> ViewerStep {
        if let Some(reason) = self.closed {
            return ViewerStep::Closed(reason);
        }
        match navigation::retreat(&self.groups, self.position) {
            Step::Moved(prev) => {
                self.enter(prev);
                ViewerStep::Continue
            }
            Step::Stayed => {
                debug!("Already at first story; retreat ignored");
                ViewerStep::Continue
            }
            Step::Finished => ViewerStep::Continue,
        }
    }

    /// Close the viewer; only the first call emits `ViewerClosed`
    pub fn close(&mut self, reason: CloseReason) -> ViewerStep {
        if let Some(existing) = self.closed {
            return ViewerStep::Closed(existing);
        }
        self.timer.stop();
        self.closed = Some(reason);
        info!(session_id = %self.session_id, %reason, "Story viewer closed");
        self.events.emit_lossy(TribeEvent::ViewerClosed {
            session_id: self.session_id,
            reason,
            timestamp: now(),
        });
        ViewerStep::Closed(reason)
    }

    pub fn pause(&mut self) {
        if self.closed.is_some() || self.user_paused {
            return;
        }
        self.timer.pause();
        self.user_paused = true;
        self.emit_state_change(PlaybackState::Playing, PlaybackState::Paused);
    }

    /// Resume after a pause; progress restarts at 0
    pub fn resume(&mut self) {
        if self.closed.is_some() || !self.user_paused {
            return;
        }
        self.timer.resume();
        self.user_paused = false;
        self.emit_state_change(PlaybackState::Paused, PlaybackState::Playing);
    }

    pub fn toggle_pause(&mut self) {
        if self.user_paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Feed one timer interval; completes and advances at 100%
    pub fn tick(&mut self) -> ViewerStep {
        if let Some(reason) = self.closed {
            return ViewerStep::Closed(reason);
        }
        let story_id = self.current_story().id;
        match self.timer.tick() {
            TickOutcome::Idle => ViewerStep::Continue,
            TickOutcome::Progressed(progress) => {
                self.events.emit_lossy(TribeEvent::StoryProgress { story_id, progress });
                ViewerStep::Continue
            }
            TickOutcome::Completed => {
                debug!(story_id, "Story complete");
                self.events.emit_lossy(TribeEvent::StoryProgress {
                    story_id,
                    progress: 100.0,
                });
                self.events.emit_lossy(TribeEvent::StoryCompleted {
                    story_id,
                    timestamp: now(),
                });
                self.advance()
            }
        }
    }

    /// Apply a media signal for `story_id`; signals for other stories are stale
    pub fn handle_media_event(&mut self, story_id: u64, event: &MediaEvent) -> MediaOutcome {
        if self.closed.is_some() || story_id != self.media.story_id() {
            debug!(story_id, "Ignoring stale media event");
            return MediaOutcome::Unchanged;
        }
        let outcome = self.media.handle(event);
        if outcome == MediaOutcome::Failed {
            let media_type = self.media.media_type();
            self.reporter.info(
                "media",
                &format!("Story {} {} failed to load; showing placeholder", story_id, media_type),
            );
            self.events.emit_lossy(TribeEvent::MediaFailed {
                story_id,
                media_type,
                timestamp: now(),
            });
        }
        outcome
    }

    /// Claim the like guard for the current story
    pub fn begin_like(&mut self) -> Result<u64> {
        if self.closed.is_some() {
            return Err(Error::ViewerClosed);
        }
        let story_id = self.current_story().id;
        self.likes.begin(story_id)?;
        debug!(story_id, "Like request started");
        Ok(story_id)
    }

    /// Apply the outcome of a like request
    ///
    /// Success overwrites the story's like state with the server values, even
    /// if the user has moved on to another story. Failure changes nothing.
    pub fn finish_like(&mut self, story_id: u64, result: Result<LikeStatus>) {
        self.likes.finish();
        match result {
            Ok(status) => {
                let story = self.groups.iter_mut().find_map(|g| g.story_mut(story_id));
                match story {
                    Some(story) => {
                        story.apply_like_status(status);
                        self.events.emit_lossy(TribeEvent::LikeUpdated {
                            story_id,
                            liked: status.liked,
                            likes_count: status.likes_count,
                            timestamp: now(),
                        });
                    }
                    None => warn!(story_id, "Like response for unknown story"),
                }
            }
            Err(e) => {
                let message = e.to_string();
                self.reporter
                    .warning("likes", &format!("Failed to toggle like on story {}: {}", story_id, message));
                self.events.emit_lossy(TribeEvent::LikeFailed {
                    story_id,
                    message,
                    timestamp: now(),
                });
            }
        }
    }

    /// Apply a user command
    pub fn apply_command(&mut self, command: ViewerCommand) -> ViewerStep {
        match command {
            ViewerCommand::Advance => self.advance(),
            ViewerCommand::Retreat => self.retreat(),
            ViewerCommand::Close => self.close(CloseReason::Dismissed),
            ViewerCommand::TogglePause => {
                self.toggle_pause();
                self.step()
            }
            ViewerCommand::Like => match self.begin_like() {
                Ok(story_id) => ViewerStep::LikeRequested(story_id),
                Err(e) => {
                    debug!("Like ignored: {}", e);
                    self.step()
                }
            },
        }
    }

    fn step(&self) -> ViewerStep {
        match self.closed {
            Some(reason) => ViewerStep::Closed(reason),
            None => ViewerStep::Continue,
        }
    }

    fn enter(&mut self, at: Position) {
        self.position = at;
        let story = &self.groups[at.group_index].stories[at.story_index];
        let story_id = story.id;
        let media_type = story.media_type;
        self.media = MediaAdapter::for_story(story);

        let was_paused = std::mem::replace(&mut self.user_paused, false);
        self.timer.start();
        if was_paused {
            self.emit_state_change(PlaybackState::Paused, PlaybackState::Playing);
        }

        debug!(story_id, "Entering story at {}", at);
        self.events.emit_lossy(TribeEvent::StoryStarted {
            story_id,
            group_index: at.group_index,
            story_index: at.story_index,
            media_type,
            timestamp: now(),
        });

        let group = &mut self.groups[at.group_index];
        if !group.has_viewed {
            group.has_viewed = true;
            self.events.emit_lossy(TribeEvent::GroupViewed {
                user_id: group.user.id,
                group_index: at.group_index,
                timestamp: now(),
            });
        }
    }

    fn emit_state_change(&self, old_state: PlaybackState, new_state: PlaybackState) {
        debug!(%old_state, %new_state, "Playback state changed");
        self.events.emit_lossy(TribeEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::test_support::{groups_with, story};
    use tokio::sync::broadcast::Receiver;
    use tribe_common::models::MediaType;
    use tribe_common::reporting::{MemoryReporter, Severity};

    struct Fixture {
        viewer: StoryViewer,
        rx: Receiver<TribeEvent>,
        reporter: Arc<MemoryReporter>,
    }

    fn open_at(sizes: &[usize], at: Position) -> Fixture {
        let config = ViewerConfig {
            story_duration_ms: 1_000,
            tick_interval_ms: 100,
            ..Default::default()
        };
        let bus = Arc::new(EventBus::new(1_000));
        let rx = bus.subscribe();
        let reporter = Arc::new(MemoryReporter::new());
        let viewer =
            StoryViewer::open(groups_with(sizes), at, &config, bus, reporter.clone()).unwrap();
        Fixture { viewer, rx, reporter }
    }

    fn drain(rx: &mut Receiver<TribeEvent>) -> Vec<TribeEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn types(events: &[TribeEvent]) -> Vec<&str> {
        events.iter().map(|e| e.event_type()).collect()
    }

    #[test]
    fn test_open_rejects_invalid_position() {
        let result = StoryViewer::open(
            groups_with(&[1]),
            Position::new(0, 1),
            &ViewerConfig::default(),
            Arc::new(EventBus::new(10)),
            Arc::new(MemoryReporter::new()),
        );
        assert!(matches!(result, Err(Error::InvalidCursor(_))));
    }

    #[test]
    fn test_open_starts_first_story() {
        let mut f = open_at(&[3, 2], Position::new(0, 1));
        let cursor = f.viewer.cursor();
        assert_eq!(cursor.position(), Position::new(0, 1));
        assert_eq!(cursor.progress, 0.0);
        assert!(cursor.playing);
        assert_eq!(
            types(&drain(&mut f.rx)),
            vec!["ViewerOpened", "StoryStarted", "GroupViewed"]
        );
    }

    #[test]
    fn test_scenario_advance_through_all_groups_then_close() {
        let mut f = open_at(&[3, 2, 1], Position::new(0, 2));

        assert_eq!(f.viewer.advance(), ViewerStep::Continue);
        assert_eq!(f.viewer.position(), Position::new(1, 0));
        assert_eq!(f.viewer.advance(), ViewerStep::Continue);
        assert_eq!(f.viewer.position(), Position::new(1, 1));
        assert_eq!(f.viewer.advance(), ViewerStep::Continue);
        assert_eq!(f.viewer.position(), Position::new(2, 0));

        assert_eq!(f.viewer.advance(), ViewerStep::Closed(CloseReason::Finished));
        assert!(f.viewer.is_closed());
        assert!(!f.viewer.cursor().playing);

        let closes = drain(&mut f.rx)
            .into_iter()
            .filter(|e| matches!(e, TribeEvent::ViewerClosed { .. }))
            .count();
        assert_eq!(closes, 1);

        // Further input is inert
        assert_eq!(f.viewer.advance(), ViewerStep::Closed(CloseReason::Finished));
        assert_eq!(f.viewer.retreat(), ViewerStep::Closed(CloseReason::Finished));
        assert!(drain(&mut f.rx).is_empty());
    }

    #[test]
    fn test_retreat_at_first_story_keeps_progress() {
        let mut f = open_at(&[2], Position::new(0, 0));
        f.viewer.tick();
        f.viewer.tick();
        let progress = f.viewer.cursor().progress;

        assert_eq!(f.viewer.retreat(), ViewerStep::Continue);
        assert_eq!(f.viewer.position(), Position::new(0, 0));
        assert_eq!(f.viewer.cursor().progress, progress);
    }

    #[test]
    fn test_transition_resets_progress() {
        let mut f = open_at(&[3], Position::new(0, 1));
        for _ in 0..4 {
            f.viewer.tick();
        }
        assert_eq!(f.viewer.cursor().progress, 40.0);

        f.viewer.retreat();
        assert_eq!(f.viewer.cursor().progress, 0.0);
        f.viewer.tick();
        f.viewer.advance();
        assert_eq!(f.viewer.cursor().progress, 0.0);
    }

    #[test]
    fn test_completion_triggers_exactly_one_advance() {
        let mut f = open_at(&[3], Position::new(0, 0));
        drain(&mut f.rx);

        for _ in 0..9 {
            assert_eq!(f.viewer.tick(), ViewerStep::Continue);
            assert_eq!(f.viewer.position(), Position::new(0, 0));
        }
        assert_eq!(f.viewer.tick(), ViewerStep::Continue);
        assert_eq!(f.viewer.position(), Position::new(0, 1));
        assert_eq!(f.viewer.cursor().progress, 0.0);

        let events = drain(&mut f.rx);
        let completed = events
            .iter()
            .filter(|e| matches!(e, TribeEvent::StoryCompleted { .. }))
            .count();
        let started = events
            .iter()
            .filter(|e| matches!(e, TribeEvent::StoryStarted { .. }))
            .count();
        assert_eq!(completed, 1);
        assert_eq!(started, 1);
    }

    #[test]
    fn test_last_story_completion_closes() {
        let mut f = open_at(&[1], Position::new(0, 0));
        let mut step = ViewerStep::Continue;
        for _ in 0..10 {
            step = f.viewer.tick();
        }
        assert_eq!(step, ViewerStep::Closed(CloseReason::Finished));
    }

    #[test]
    fn test_pause_stops_progress_and_resume_restarts() {
        let mut f = open_at(&[2], Position::new(0, 0));
        f.viewer.tick();
        f.viewer.tick();
        f.viewer.tick();
        assert_eq!(f.viewer.cursor().progress, 30.0);

        f.viewer.apply_command(ViewerCommand::TogglePause);
        assert!(f.viewer.is_paused());
        assert!(!f.viewer.cursor().playing);
        f.viewer.tick();
        assert_eq!(f.viewer.cursor().progress, 30.0);

        f.viewer.apply_command(ViewerCommand::TogglePause);
        assert!(!f.viewer.is_paused());
        assert!(f.viewer.cursor().playing);
        assert_eq!(f.viewer.cursor().progress, 0.0);
    }

    #[test]
    fn test_navigation_while_paused_resumes_playback() {
        let mut f = open_at(&[2], Position::new(0, 0));
        f.viewer.pause();
        drain(&mut f.rx);

        f.viewer.advance();
        assert!(!f.viewer.is_paused());
        assert!(f.viewer.cursor().playing);
        let events = drain(&mut f.rx);
        assert!(events.iter().any(|e| matches!(
            e,
            TribeEvent::PlaybackStateChanged { new_state: PlaybackState::Playing, .. }
        )));
    }

    #[test]
    fn test_media_error_does_not_advance_and_resets_on_transition() {
        let mut f = open_at(&[2], Position::new(0, 0));
        let id = f.viewer.current_story().id;

        let outcome = f
            .viewer
            .handle_media_event(id, &MediaEvent::Failed { message: "boom".into() });
        assert_eq!(outcome, MediaOutcome::Failed);
        assert!(f.viewer.media().has_error());
        assert_eq!(f.viewer.position(), Position::new(0, 0));
        assert!(f.viewer.cursor().playing, "timer keeps running after media failure");

        f.viewer.advance();
        assert!(!f.viewer.media().has_error());

        let reports = f.reporter.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Info);
    }

    #[test]
    fn test_stale_media_event_ignored() {
        let mut f = open_at(&[2], Position::new(0, 0));
        let old_id = f.viewer.current_story().id;
        f.viewer.advance();
        let outcome = f
            .viewer
            .handle_media_event(old_id, &MediaEvent::Failed { message: "late".into() });
        assert_eq!(outcome, MediaOutcome::Unchanged);
        assert!(!f.viewer.media().has_error());
    }

    #[test]
    fn test_like_applies_server_values_verbatim() {
        let mut f = open_at(&[1], Position::new(0, 0));
        // Fixture stories start at {liked: false, likes_count: 5}
        assert_eq!(f.viewer.current_story().like_status(), LikeStatus { liked: false, likes_count: 5 });

        let step = f.viewer.apply_command(ViewerCommand::Like);
        let story_id = match step {
            ViewerStep::LikeRequested(id) => id,
            other => panic!("Expected like request, got {:?}", other),
        };
        assert!(f.viewer.is_liking());
        // No local guess while in flight
        assert_eq!(f.viewer.current_story().likes_count, 5);

        f.viewer
            .finish_like(story_id, Ok(LikeStatus { liked: true, likes_count: 6 }));
        assert!(!f.viewer.is_liking());
        assert_eq!(f.viewer.current_story().like_status(), LikeStatus { liked: true, likes_count: 6 });
    }

    #[test]
    fn test_second_like_blocked_while_in_flight() {
        let mut f = open_at(&[1], Position::new(0, 0));
        assert!(matches!(f.viewer.apply_command(ViewerCommand::Like), ViewerStep::LikeRequested(_)));
        assert_eq!(f.viewer.apply_command(ViewerCommand::Like), ViewerStep::Continue);
    }

    #[test]
    fn test_like_failure_leaves_state_unchanged() {
        let mut f = open_at(&[1], Position::new(0, 0));
        let story_id = f.viewer.begin_like().unwrap();
        f.viewer
            .finish_like(story_id, Err(Error::Api { status: 500, message: "oops".into() }));

        assert_eq!(f.viewer.current_story().like_status(), LikeStatus { liked: false, likes_count: 5 });
        assert!(!f.viewer.is_liking());
        let reports = f.reporter.reports();
        assert_eq!(reports[0].severity, Severity::Warning);
        assert!(drain(&mut f.rx)
            .iter()
            .any(|e| matches!(e, TribeEvent::LikeFailed { .. })));
    }

    #[test]
    fn test_late_like_response_applies_to_original_story() {
        let mut f = open_at(&[2], Position::new(0, 0));
        let story_id = f.viewer.begin_like().unwrap();
        f.viewer.advance();

        f.viewer
            .finish_like(story_id, Ok(LikeStatus { liked: true, likes_count: 99 }));
        let liked = &f.viewer.groups()[0].stories[0];
        assert_eq!(liked.id, story_id);
        assert_eq!(liked.likes_count, 99);
        assert_eq!(f.viewer.current_story().likes_count, 5);
    }

    #[test]
    fn test_group_viewed_emitted_once_per_group() {
        let mut f = open_at(&[2, 1], Position::new(0, 0));
        f.viewer.advance();
        f.viewer.advance();
        f.viewer.retreat();
        f.viewer.retreat();

        let viewed: Vec<usize> = drain(&mut f.rx)
            .into_iter()
            .filter_map(|e| match e {
                TribeEvent::GroupViewed { group_index, .. } => Some(group_index),
                _ => None,
            })
            .collect();
        assert_eq!(viewed, vec![0, 1]);
        assert!(f.viewer.groups().iter().all(|g| g.has_viewed));
    }

    #[test]
    fn test_escape_closes_as_dismissed() {
        let mut f = open_at(&[2], Position::new(0, 0));
        assert_eq!(
            f.viewer.apply_command(ViewerCommand::Close),
            ViewerStep::Closed(CloseReason::Dismissed)
        );
        assert!(matches!(f.viewer.begin_like(), Err(Error::ViewerClosed)));
    }

    #[test]
    fn test_snapshot_reflects_current_story() {
        let f = open_at(&[2], Position::new(0, 1));
        let snapshot = f.viewer.snapshot();
        assert_eq!(snapshot.story.id, f.viewer.current_story().id);
        assert_eq!(snapshot.cursor.story_index, 1);
        assert!(!snapshot.paused);
        assert!(snapshot.closed.is_none());
        assert_eq!(story(1, MediaType::Image).likes_count, 5);
    }
}
