//! Run requests, per-step reports and run summaries.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::log::RunLogger;
use crate::mapper::MappingStats;
use crate::model::EntityKind;
use crate::progress::ProgressReporter;
use crate::remote::ApiError;
use crate::store::StoreError;

/// Step-level failure. Never crosses the step boundary.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Store(#[from] StoreError),

    /// A reference that could not be translated to the target instance.
    #[error("Unresolved {kind} reference '{key}'")]
    Unresolved { kind: EntityKind, key: String },

    /// Content delta paging did not terminate.
    #[error("Content sync did not finish after {0} pages")]
    TooManyPages(usize),

    #[error("Cancelled")]
    Cancelled,
}

impl SyncError {
    pub(crate) fn unresolved(kind: EntityKind, key: impl ToString) -> Self {
        Self::Unresolved {
            kind,
            key: key.to_string(),
        }
    }
}

/// Result type for synchronizer operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Shared cancellation signal, checked between items.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once the flag is set.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Cancelled`] after [`cancel`](Self::cancel).
    pub fn check(&self) -> SyncResult<()> {
        if self.is_cancelled() {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Collaborators injected into one orchestrator run.
#[derive(Debug)]
pub struct RunContext {
    pub logger: RunLogger,
    pub progress: ProgressReporter,
    pub cancel: CancelFlag,
}

impl RunContext {
    #[must_use]
    pub fn new(logger: RunLogger, progress: ProgressReporter, cancel: CancelFlag) -> Self {
        Self {
            logger,
            progress,
            cancel,
        }
    }

    /// No sinks, no progress, never cancelled.
    #[must_use]
    pub fn silent() -> Self {
        Self::new(
            RunLogger::new(),
            ProgressReporter::disabled(),
            CancelFlag::new(),
        )
    }
}

/// Parameters of a pull run.
#[derive(Debug, Clone)]
pub struct PullRequest {
    pub source: String,
    pub locale: String,
    pub channel: String,
    pub preview: bool,
    pub kinds: Vec<EntityKind>,
    pub force_overwrite: bool,
}

/// Parameters of a push run.
#[derive(Debug, Clone)]
pub struct PushRequest {
    pub source: String,
    pub target: String,
    pub locale: String,
    /// Sitemap channel used to match existing target pages by path.
    pub channel: String,
    pub preview: bool,
    pub kinds: Vec<EntityKind>,
    pub dry_run: bool,
}

/// One failed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemError {
    pub kind: EntityKind,
    /// Id or natural key of the entity.
    pub key: String,
    pub message: String,
}

/// Terminal status of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Error,
}

impl StepStatus {
    /// A step that ran to completion succeeds unless failures outnumber successes.
    #[must_use]
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        if failed > succeeded {
            Self::Error
        } else {
            Self::Success
        }
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Succeeded,
    PartiallyFailed,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::PartiallyFailed => "partially_failed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item tallies of one pull step, as produced by a synchronizer.
#[derive(Debug, Clone, Default)]
pub struct PullOutcome {
    pub processed: usize,
    pub total: usize,
    pub written: usize,
    pub unchanged: usize,
    /// Documents deleted (forced prune, or deleted upstream).
    pub removed: usize,
    pub errors: Vec<ItemError>,
    pub warnings: Vec<String>,
}

impl PullOutcome {
    #[must_use]
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn fail(&mut self, kind: EntityKind, key: impl ToString, message: impl ToString) {
        self.errors.push(ItemError {
            kind,
            key: key.to_string(),
            message: message.to_string(),
        });
    }
}

/// Per-kind result of a pull run.
#[derive(Debug, Clone, Serialize)]
pub struct PullStepReport {
    pub kind: EntityKind,
    pub status: StepStatus,
    pub processed: usize,
    pub total: usize,
    pub written: usize,
    pub unchanged: usize,
    pub removed: usize,
    /// Skipped because the folder was already populated.
    pub skipped: bool,
    pub errors: Vec<ItemError>,
    pub warnings: Vec<String>,
    /// Step-level failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_error: Option<String>,
}

impl PullStepReport {
    #[must_use]
    pub fn from_outcome(kind: EntityKind, outcome: PullOutcome) -> Self {
        let failed = outcome.errors.len();
        Self {
            kind,
            status: StepStatus::from_counts(outcome.processed.saturating_sub(failed), failed),
            processed: outcome.processed,
            total: outcome.total,
            written: outcome.written,
            unchanged: outcome.unchanged,
            removed: outcome.removed,
            skipped: false,
            errors: outcome.errors,
            warnings: outcome.warnings,
            step_error: None,
        }
    }

    /// Folder already populated: `processed = total = 1`.
    #[must_use]
    pub fn skipped(kind: EntityKind) -> Self {
        Self {
            processed: 1,
            total: 1,
            skipped: true,
            ..Self::from_outcome(kind, PullOutcome::default())
        }
    }

    #[must_use]
    pub fn failed(kind: EntityKind, error: impl ToString) -> Self {
        Self {
            status: StepStatus::Error,
            step_error: Some(error.to_string()),
            ..Self::from_outcome(kind, PullOutcome::default())
        }
    }
}

/// Push counters for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushCounters {
    pub successful_items: usize,
    pub failed_items: usize,
    pub model_mismatch: usize,
    /// References to content absent from the local snapshot.
    pub not_on_source: usize,
    /// References to content not present on the target.
    pub not_on_destination: usize,
    /// Already on target, mapped without writing.
    pub skipped: usize,
}

/// Item tallies of one push step.
#[derive(Debug, Clone, Default)]
pub struct PushOutcome {
    pub processed: usize,
    pub total: usize,
    pub counters: PushCounters,
    pub errors: Vec<ItemError>,
}

impl PushOutcome {
    #[must_use]
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    pub(crate) fn fail(&mut self, kind: EntityKind, key: impl ToString, message: impl ToString) {
        self.counters.failed_items += 1;
        self.errors.push(ItemError {
            kind,
            key: key.to_string(),
            message: message.to_string(),
        });
    }
}

/// Per-kind result of a push run.
#[derive(Debug, Clone, Serialize)]
pub struct PushStepReport {
    pub kind: EntityKind,
    pub status: StepStatus,
    pub processed: usize,
    pub total: usize,
    pub counters: PushCounters,
    pub errors: Vec<ItemError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_error: Option<String>,
}

impl PushStepReport {
    #[must_use]
    pub fn from_outcome(kind: EntityKind, outcome: PushOutcome) -> Self {
        let c = outcome.counters;
        Self {
            kind,
            status: StepStatus::from_counts(c.successful_items + c.skipped, c.failed_items),
            processed: outcome.processed,
            total: outcome.total,
            counters: c,
            errors: outcome.errors,
            step_error: None,
        }
    }

    #[must_use]
    pub fn failed(kind: EntityKind, error: impl ToString) -> Self {
        Self {
            status: StepStatus::Error,
            step_error: Some(error.to_string()),
            ..Self::from_outcome(kind, PushOutcome::default())
        }
    }
}

/// Result of a pull run.
#[derive(Debug, Clone, Serialize)]
pub struct PullSummary {
    pub source: String,
    pub locale: String,
    pub channel: String,
    pub preview: bool,
    pub base_path: PathBuf,
    pub status: RunStatus,
    pub steps: Vec<PullStepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl PullSummary {
    #[must_use]
    pub fn step(&self, kind: EntityKind) -> Option<&PullStepReport> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// Any step error or any item error makes a pull partially failed.
    #[must_use]
    pub fn status_of(steps: &[PullStepReport]) -> RunStatus {
        let degraded = steps
            .iter()
            .any(|s| s.status == StepStatus::Error || !s.errors.is_empty());
        if degraded {
            RunStatus::PartiallyFailed
        } else {
            RunStatus::Succeeded
        }
    }
}

/// Result of a push run.
#[derive(Debug, Clone, Serialize)]
pub struct PushSummary {
    pub source: String,
    pub target: String,
    pub locale: String,
    pub preview: bool,
    pub dry_run: bool,
    pub status: RunStatus,
    pub steps: Vec<PushStepReport>,
    pub mappings: Vec<MappingStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl PushSummary {
    #[must_use]
    pub fn step(&self, kind: EntityKind) -> Option<&PushStepReport> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// A push fails as soon as any step ends in `error`.
    #[must_use]
    pub fn status_of(steps: &[PushStepReport]) -> RunStatus {
        if steps.iter().any(|s| s.status == StepStatus::Error) {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        }
    }

    /// Counters summed over every step.
    #[must_use]
    pub fn totals(&self) -> PushCounters {
        self.steps.iter().fold(PushCounters::default(), |acc, s| {
            let c = s.counters;
            PushCounters {
                successful_items: acc.successful_items + c.successful_items,
                failed_items: acc.failed_items + c.failed_items,
                model_mismatch: acc.model_mismatch + c.model_mismatch,
                not_on_source: acc.not_on_source + c.not_on_source,
                not_on_destination: acc.not_on_destination + c.not_on_destination,
                skipped: acc.skipped + c.skipped,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_status_majority_rule() {
        assert_eq!(StepStatus::from_counts(4, 1), StepStatus::Success);
        assert_eq!(StepStatus::from_counts(2, 2), StepStatus::Success);
        assert_eq!(StepStatus::from_counts(1, 2), StepStatus::Error);
        assert_eq!(StepStatus::from_counts(0, 0), StepStatus::Success);
    }

    #[test]
    fn test_skipped_pull_step_marker() {
        let report = PullStepReport::skipped(EntityKind::Model);
        assert_eq!((report.processed, report.total), (1, 1));
        assert!(report.skipped);
        assert_eq!(report.status, StepStatus::Success);
    }

    #[test]
    fn test_pull_status_item_errors_degrade() {
        let mut outcome = PullOutcome::with_total(3);
        outcome.processed = 3;
        outcome.fail(EntityKind::Model, 7, "boom");
        let steps = vec![
            PullStepReport::skipped(EntityKind::Gallery),
            PullStepReport::from_outcome(EntityKind::Model, outcome),
        ];
        assert_eq!(steps[1].status, StepStatus::Success);
        assert_eq!(PullSummary::status_of(&steps), RunStatus::PartiallyFailed);
        assert_eq!(
            PullSummary::status_of(&steps[..1]),
            RunStatus::Succeeded
        );
    }

    #[test]
    fn test_push_status_only_step_errors_fail() {
        let mut outcome = PushOutcome::with_total(5);
        outcome.processed = 5;
        outcome.counters.successful_items = 4;
        outcome.fail(EntityKind::ContentItem, 3, "boom");
        let ok = PushStepReport::from_outcome(EntityKind::ContentItem, outcome);
        assert_eq!(ok.counters.failed_items, 1);
        assert_eq!(PushSummary::status_of(&[ok.clone()]), RunStatus::Succeeded);

        let failed = PushStepReport::failed(EntityKind::Page, "list failed");
        assert_eq!(PushSummary::status_of(&[ok, failed]), RunStatus::Failed);
    }

    #[test]
    fn test_cancel_flag() {
        let flag = CancelFlag::new();
        assert!(flag.check().is_ok());
        flag.clone().cancel();
        assert!(matches!(flag.check(), Err(SyncError::Cancelled)));
    }

    #[test]
    fn test_sync_error_display() {
        let err = SyncError::unresolved(EntityKind::Model, 12);
        assert_eq!(err.to_string(), "Unresolved model reference '12'");
    }
}
