//! Timer/progress engine
//!
//! [`ProgressTimer`] is the pure progress model: it counts ticks and turns
//! them into a 0-100 percentage. [`TickScheduler`] is the async ticker that
//! feeds it; it owns at most one tokio task at a time.
//!
//! Progress is derived from the integer tick count rather than accumulated as
//! a float, so a story always completes after exactly
//! `ceil(duration / interval)` ticks.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::trace;

/// Result of a single timer tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Timer not running (paused, stopped, or already complete)
    Idle,
    /// Progress moved to the given percentage (< 100)
    Progressed(f64),
    /// Progress reached 100; reported once per start
    Completed,
}

/// Per-story progress model
#[derive(Debug, Clone)]
pub struct ProgressTimer {
    duration_ms: u64,
    interval_ms: u64,
    ticks: u64,
    running: bool,
    completed: bool,
    /// Incremented by every `start()`; lets the async layer tell runs apart
    epoch: u64,
}

impl ProgressTimer {
    /// Create a stopped timer
    ///
    /// Both values are clamped to at least 1ms.
    pub fn new(duration_ms: u64, interval_ms: u64) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            interval_ms: interval_ms.max(1),
            ticks: 0,
            running: false,
            completed: false,
            epoch: 0,
        }
    }

    /// Reset progress to 0 and begin a new run
    pub fn start(&mut self) {
        self.ticks = 0;
        self.running = true;
        self.completed = false;
        self.epoch += 1;
        trace!(epoch = self.epoch, "Progress timer started");
    }

    /// Stop ticking; returns true if the timer was running
    pub fn pause(&mut self) -> bool {
        let was_running = self.running;
        self.running = false;
        was_running
    }

    /// Restart after a pause; returns true if a new run began
    ///
    /// Progress restarts at 0 rather than at the paused percentage. This is
    /// the established viewer behavior; callers relying on continuity must
    /// not assume otherwise.
    pub fn resume(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.start();
        true
    }

    /// Stop for good (viewer closing); progress is kept for inspection
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Advance by one interval
    pub fn tick(&mut self) -> TickOutcome {
        if !self.running || self.completed {
            return TickOutcome::Idle;
        }
        self.ticks += 1;
        if self.elapsed_ms() >= self.duration_ms {
            self.completed = true;
            self.running = false;
            TickOutcome::Completed
        } else {
            TickOutcome::Progressed(self.progress())
        }
    }

    /// Current progress in percent (0.0-100.0)
    pub fn progress(&self) -> f64 {
        let elapsed = self.elapsed_ms().min(self.duration_ms);
        (elapsed as f64 * 100.0) / self.duration_ms as f64
    }

    /// Time represented by the ticks counted so far
    pub fn elapsed_ms(&self) -> u64 {
        self.ticks.saturating_mul(self.interval_ms)
    }

    /// Percentage added by one tick: `(interval / duration) * 100`
    pub fn increment(&self) -> f64 {
        self.interval_ms as f64 / self.duration_ms as f64 * 100.0
    }

    /// Ticks needed to complete one story
    pub fn ticks_per_story(&self) -> u64 {
        self.duration_ms.div_ceil(self.interval_ms)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Repeating tick source backed by a tokio task
///
/// Starting a new ticker always aborts the previous one first, and every
/// ticker stamps its ticks with a generation number so that a tick already in
/// a channel when its ticker was replaced can be recognised and dropped.
#[derive(Debug)]
pub struct TickScheduler {
    interval: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            task: None,
        }
    }

    /// Cancel any running ticker and start a new one
    ///
    /// `sink` is called with the ticker's generation on every interval; when it
    /// returns false (receiver gone) the ticker ends itself.
    pub fn start<F>(&mut self, sink: F) -> u64
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let period = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick of a tokio interval completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !sink(generation) {
                    break;
                }
            }
        }));

        generation
    }

    /// Abort the running ticker (if any); idempotent
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }

    /// Whether a tick stamped with `generation` comes from the live ticker
    pub fn is_current(&self, generation: u64) -> bool {
        self.task.is_some() && generation == self.generation
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
