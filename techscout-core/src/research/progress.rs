//! Progress reporting for research runs.
//!
//! A [`ProgressSink`] is passed to each run explicitly. Sink calls happen on
//! the pipeline's task; a panicking sink is caught and logged so observers
//! can never abort a run.

use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::warn;

use super::session::AnalysisSession;

/// A single progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub message: String,
    /// 0..=100. A failed run ends with a 0% update.
    pub percent_complete: u8,
}

impl ProgressUpdate {
    pub fn new(message: impl Into<String>, percent_complete: u8) -> Self {
        Self {
            message: message.into(),
            percent_complete: percent_complete.min(100),
        }
    }
}

/// Observer for a research run.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);

    /// Called once with the final session after a successful run.
    fn on_complete(&self, _session: &AnalysisSession) {}
}

/// Sink that ignores everything.
pub struct NoOpProgress;

impl ProgressSink for NoOpProgress {
    fn on_progress(&self, _update: &ProgressUpdate) {}
}

/// Event emitted by [`ChannelProgress`].
#[derive(Debug, Clone)]
pub enum ResearchEvent {
    Progress(ProgressUpdate),
    Completed(Box<AnalysisSession>),
}

/// Forwards progress into an unbounded tokio channel.
///
/// A closed receiver is not an error; events are dropped.
pub struct ChannelProgress {
    tx: mpsc::UnboundedSender<ResearchEvent>,
}

impl ChannelProgress {
    pub fn new(tx: mpsc::UnboundedSender<ResearchEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResearchEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        let _ = self.tx.send(ResearchEvent::Progress(update.clone()));
    }

    fn on_complete(&self, session: &AnalysisSession) {
        let _ = self
            .tx
            .send(ResearchEvent::Completed(Box::new(session.clone())));
    }
}

/// Sink that keeps every update, for tests and post-run inspection.
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<ProgressUpdate>>,
    completed: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates
            .lock()
            .map(|u| u.clone())
            .unwrap_or_default()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.updates()
            .into_iter()
            .map(|u| u.percent_complete)
            .collect()
    }

    pub fn last(&self) -> Option<ProgressUpdate> {
        self.updates().pop()
    }

    /// IDs of the sessions reported through `on_complete`.
    pub fn completed_sessions(&self) -> Vec<String> {
        self.completed
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        if let Ok(mut updates) = self.updates.lock() {
            updates.push(update.clone());
        }
    }

    fn on_complete(&self, session: &AnalysisSession) {
        if let Ok(mut completed) = self.completed.lock() {
            completed.push(session.id.clone());
        }
    }
}

/// Deliver an update, swallowing any panic raised by the sink.
pub(crate) fn notify(sink: &dyn ProgressSink, update: ProgressUpdate) {
    let outcome = catch_unwind(AssertUnwindSafe(|| sink.on_progress(&update)));
    if outcome.is_err() {
        warn!(
            percent = update.percent_complete,
            message = update.message.as_str(),
            "Progress sink panicked; update dropped"
        );
    }
}

/// Deliver the completion event, swallowing any panic raised by the sink.
pub(crate) fn notify_complete(sink: &dyn ProgressSink, session: &AnalysisSession) {
    let outcome = catch_unwind(AssertUnwindSafe(|| sink.on_complete(session)));
    if outcome.is_err() {
        warn!(session_id = session.id.as_str(), "Progress sink panicked on completion");
    }
}
