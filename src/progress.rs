//! Typed progress events.
//!
//! Every synchronizer reports through a [`StepProgress`] handle. Events are
//! tagged with their kind and pushed onto an unbounded channel; whoever holds
//! the receiver decides how (or whether) to render them.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::model::EntityKind;

/// Progress of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Items handled so far out of the step total.
    Progress { processed: usize, total: usize },
    /// The step ran to completion.
    StepSucceeded { count: usize },
    /// The step ended in `error`.
    StepFailed { error: String },
}

impl ProgressEvent {
    /// Whether this event ends a step.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress { .. })
    }
}

/// An event tagged with the kind it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindProgress {
    pub kind: EntityKind,
    #[serde(flatten)]
    pub event: ProgressEvent,
}

/// Receiving end of a progress channel.
pub type ProgressReceiver = mpsc::UnboundedReceiver<KindProgress>;

/// Sending side shared by an orchestrator run.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<KindProgress>>,
}

impl ProgressReporter {
    /// A reporter and the receiver its events arrive on.
    #[must_use]
    pub fn channel() -> (Self, ProgressReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A reporter that drops every event.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Handle scoped to one kind.
    #[must_use]
    pub fn step(&self, kind: EntityKind) -> StepProgress {
        StepProgress {
            kind,
            reporter: self.clone(),
        }
    }

    fn send(&self, kind: EntityKind, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            // A dropped receiver just means nobody is watching.
            let _ = tx.send(KindProgress { kind, event });
        }
    }
}

/// Progress handle for a single step.
#[derive(Debug, Clone)]
pub struct StepProgress {
    kind: EntityKind,
    reporter: ProgressReporter,
}

impl StepProgress {
    pub fn progress(&self, processed: usize, total: usize) {
        self.reporter
            .send(self.kind, ProgressEvent::Progress { processed, total });
    }

    pub fn succeeded(&self, count: usize) {
        self.reporter
            .send(self.kind, ProgressEvent::StepSucceeded { count });
    }

    pub fn failed(&self, error: impl Into<String>) {
        self.reporter.send(
            self.kind,
            ProgressEvent::StepFailed {
                error: error.into(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_tagged_and_ordered() {
        let (reporter, mut rx) = ProgressReporter::channel();
        let step = reporter.step(EntityKind::Model);
        step.progress(1, 2);
        step.progress(2, 2);
        step.succeeded(2);
        drop(reporter);
        drop(step);

        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == EntityKind::Model));
        assert_eq!(
            events[0].event,
            ProgressEvent::Progress {
                processed: 1,
                total: 2
            }
        );
        assert!(events[2].event.is_terminal());
    }

    #[test]
    fn test_disabled_reporter_is_silent() {
        let reporter = ProgressReporter::disabled();
        reporter.step(EntityKind::Page).failed("boom");
    }

    #[test]
    fn test_event_json_shape() {
        let event = KindProgress {
            kind: EntityKind::ContentItem,
            event: ProgressEvent::StepFailed {
                error: "list failed".into(),
            },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "content_item");
        assert_eq!(json["event"], "step_failed");
        assert_eq!(json["error"], "list failed");
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.step(EntityKind::Gallery).progress(1, 1);
    }
}
