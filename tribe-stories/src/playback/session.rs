//! Viewer session actor
//!
//! One tokio task owns the [`StoryViewer`] for the lifetime of a viewer. It is
//! the only code that mutates it; everything else talks to it through a
//! [`ViewerHandle`]:
//!
//! - user input and media signals arrive on the request channel
//! - timer ticks arrive from the [`TickScheduler`] on a separate channel
//! - like responses arrive from spawned request tasks on an internal channel
//!
//! Input is accepted only while the session runs. Once the viewer closes the
//! request channel is dropped and every handle call fails with
//! `Error::ViewerClosed`. Dropping the last handle closes the viewer with
//! `CloseReason::Abandoned`.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};
use tribe_common::events::CloseReason;
use tribe_common::models::LikeStatus;
use uuid::Uuid;

use super::media::MediaEvent;
use super::progress::TickScheduler;
use super::viewer::{StoryViewer, ViewerSnapshot, ViewerStep};
use crate::error::{Error, Result};
use crate::input::{map_key, map_pointer, Key, PointerPress, ViewerCommand};
use crate::likes::LikeApi;

enum Request {
    Command(ViewerCommand),
    Media { story_id: u64, event: MediaEvent },
    Snapshot(oneshot::Sender<ViewerSnapshot>),
}

enum Internal {
    LikeResolved {
        story_id: u64,
        result: Result<LikeStatus>,
    },
}

/// Handle to a running viewer session
pub struct ViewerHandle {
    session_id: Uuid,
    requests: mpsc::UnboundedSender<Request>,
    closed: watch::Receiver<Option<CloseReason>>,
}

impl ViewerHandle {
    /// Spawn the session task for an opened viewer
    pub fn spawn(viewer: StoryViewer, api: Arc<dyn LikeApi>) -> Self {
        let session_id = viewer.session_id();
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(None);

        tokio::spawn(run_session(viewer, api, requests_rx, closed_tx));

        Self {
            session_id,
            requests: requests_tx,
            closed: closed_rx,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn send(&self, command: ViewerCommand) -> Result<()> {
        self.request(Request::Command(command))
    }

    /// Deliver a key press; returns false for keys the viewer ignores
    pub fn key(&self, key: Key) -> Result<bool> {
        match map_key(key) {
            Some(command) => self.send(command).map(|_| true),
            None => Ok(false),
        }
    }

    /// Deliver a pointer press; returns false when it hit no zone
    pub fn pointer(&self, press: PointerPress) -> Result<bool> {
        match map_pointer(press) {
            Some(command) => self.send(command).map(|_| true),
            None => Ok(false),
        }
    }

    pub fn media_event(&self, story_id: u64, event: MediaEvent) -> Result<()> {
        self.request(Request::Media { story_id, event })
    }

    pub async fn snapshot(&self) -> Result<ViewerSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(Request::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| Error::ViewerClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.borrow().is_some()
    }

    /// Wait until the viewer closes
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.closed.clone();
        // The watch::Ref borrows rx; it must be dropped before rx is
        let reason = match rx.wait_for(|reason| reason.is_some()).await {
            Ok(reason) => (*reason).unwrap_or(CloseReason::Abandoned),
            Err(_) => CloseReason::Abandoned,
        };
        reason
    }

    fn request(&self, request: Request) -> Result<()> {
        self.requests.send(request).map_err(|_| Error::ViewerClosed)
    }
}

async fn run_session(
    mut viewer: StoryViewer,
    api: Arc<dyn LikeApi>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    closed_tx: watch::Sender<Option<CloseReason>>,
) {
    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel::<u64>();
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<Internal>();
    let mut scheduler = TickScheduler::new(viewer.tick_interval());
    let mut scheduled_epoch = None;

    sync_ticker(&viewer, &mut scheduler, &mut scheduled_epoch, &tick_tx);

    let reason = loop {
        let step = tokio::select! {
            request = requests.recv() => match request {
                Some(Request::Command(command)) => viewer.apply_command(command),
                Some(Request::Media { story_id, event }) => {
                    viewer.handle_media_event(story_id, &event);
                    ViewerStep::Continue
                }
                Some(Request::Snapshot(reply)) => {
                    let _ = reply.send(viewer.snapshot());
                    ViewerStep::Continue
                }
                None => viewer.close(CloseReason::Abandoned),
            },
            Some(generation) = tick_rx.recv() => {
                if scheduler.is_current(generation) {
                    viewer.tick()
                } else {
                    ViewerStep::Continue
                }
            }
            Some(internal) = internal_rx.recv() => match internal {
                Internal::LikeResolved { story_id, result } => {
                    viewer.finish_like(story_id, result);
                    ViewerStep::Continue
                }
            },
        };

        match step {
            ViewerStep::Closed(reason) => break reason,
            ViewerStep::LikeRequested(story_id) => {
                let api = Arc::clone(&api);
                let tx = internal_tx.clone();
                tokio::spawn(async move {
                    let result = api.toggle_like(story_id).await;
                    // Session may have closed meanwhile; the response is dropped
                    let _ = tx.send(Internal::LikeResolved { story_id, result });
                });
            }
            ViewerStep::Continue => {}
        }

        sync_ticker(&viewer, &mut scheduler, &mut scheduled_epoch, &tick_tx);
    };

    scheduler.cancel();
    // Refuse input before anyone can observe the close
    drop(requests);
    info!(session_id = %viewer.session_id(), %reason, "Viewer session ended");
    let _ = closed_tx.send(Some(reason));
}

/// Keep exactly one ticker running while the progress timer runs
fn sync_ticker(
    viewer: &StoryViewer,
    scheduler: &mut TickScheduler,
    scheduled_epoch: &mut Option<u64>,
    tick_tx: &mpsc::UnboundedSender<u64>,
) {
    if viewer.is_timer_running() {
        let epoch = viewer.timer_epoch();
        if *scheduled_epoch != Some(epoch) {
            let tx = tick_tx.clone();
            let generation = scheduler.start(move |generation| tx.send(generation).is_ok());
            debug!(epoch, generation, "Ticker (re)started");
            *scheduled_epoch = Some(epoch);
        }
    } else if scheduled_epoch.take().is_some() {
        scheduler.cancel();
        debug!("Ticker cancelled");
    }
}
