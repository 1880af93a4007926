//! Error reporting with severity levels
//!
//! Every user-facing failure (media load, like toggle, camera) goes through one
//! `ErrorReporter` instead of a mix of alerts, console output and silent drops.
//! The rendering layer decides how each severity is surfaced.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// How loudly a failure should be surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Recovered locally, nothing for the user to do (e.g. placeholder shown)
    Info,
    /// User action failed; user may retry manually
    Warning,
    /// Feature unusable until something outside the client changes
    Error,
}

/// A single reported failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub severity: Severity,
    /// Component that detected the failure (e.g. "likes", "media")
    pub source: String,
    pub message: String,
}

impl ErrorReport {
    pub fn new(severity: Severity, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            source: source.into(),
            message: message.into(),
        }
    }
}

/// Sink for error reports
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: ErrorReport);

    fn info(&self, source: &str, message: &str) {
        self.report(ErrorReport::new(Severity::Info, source, message));
    }

    fn warning(&self, source: &str, message: &str) {
        self.report(ErrorReport::new(Severity::Warning, source, message));
    }

    fn error(&self, source: &str, message: &str) {
        self.report(ErrorReport::new(Severity::Error, source, message));
    }
}

/// Reporter that writes through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, report: ErrorReport) {
        match report.severity {
            Severity::Info => info!(source = %report.source, "{}", report.message),
            Severity::Warning => warn!(source = %report.source, "{}", report.message),
            Severity::Error => error!(source = %report.source, "{}", report.message),
        }
    }
}

/// Reporter that keeps every report in memory
///
/// Used by tests and by rendering layers that drain reports into a toast list.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    reports: Mutex<Vec<ErrorReport>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of collected reports
    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Remove and return collected reports
    pub fn drain(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }
}

impl ErrorReporter for MemoryReporter {
    fn report(&self, report: ErrorReport) {
        TracingReporter.report(report.clone());
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(report);
        }
    }
}
