//! Pull orchestrator: remote instance → local store.
//!
//! Runs the selected kinds in dependency order. Listed kinds go through the
//! shared [`fetch_listed`] loop; content items and pages have their own
//! synchronizers because they are driven by the delta cursor and the sitemap
//! artifact instead of a plain listing.

use std::collections::HashSet;
use std::future::Future;

use serde::Serialize;

use super::kinds::{asset, container, content, gallery, model, page, template};
use super::types::{
    CancelFlag, PullOutcome, PullRequest, PullStepReport, PullSummary, RunContext, StepStatus,
    SyncResult,
};
use crate::error::{Error, Result};
use crate::log::{FileSink, LogLevel, RunLogger};
use crate::model::EntityKind;
use crate::progress::StepProgress;
use crate::remote::{ApiResult, InstanceScope, RemoteClient};
use crate::store::{LocalStore, StoreRoot, WriteOutcome};

/// Log file prefix for pull runs.
pub const PULL_LOG_PREFIX: &str = "pull";

/// Everything a pull synchronizer needs for one step.
pub(crate) struct PullCtx<'a, C> {
    pub client: &'a C,
    pub scope: &'a InstanceScope,
    pub store: &'a LocalStore,
    pub logger: &'a RunLogger,
    pub cancel: &'a CancelFlag,
    pub channel: &'a str,
    pub force: bool,
}

/// A kind pulled by listing the remote, then fetching detail per entry.
pub(crate) trait ListedKind {
    const KIND: EntityKind;
    type Listing: Send + Sync;
    type Entity: Serialize + Send;

    fn list<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<Self::Listing>>> + Send;

    /// Full record for a listing entry. Kinds whose listing is already
    /// complete return it unchanged.
    fn detail<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
        listing: Self::Listing,
    ) -> impl Future<Output = ApiResult<Self::Entity>> + Send;

    /// Store key of a listing entry.
    fn key(listing: &Self::Listing) -> String;
}

/// List, fetch detail, write, one item at a time.
///
/// A forced pull also prunes documents whose key was not listed.
pub(crate) async fn fetch_listed<K: ListedKind, C: RemoteClient>(
    ctx: &PullCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PullOutcome> {
    let listings = K::list(ctx.client, ctx.scope).await?;
    let total = listings.len();
    let mut outcome = PullOutcome::with_total(total);
    let mut keep = HashSet::with_capacity(total);
    progress.progress(0, total);

    for listing in listings {
        ctx.cancel.check()?;
        let key = K::key(&listing);
        keep.insert(key.clone());

        let written = match K::detail(ctx.client, ctx.scope, listing).await {
            Ok(entity) => ctx
                .store
                .write_entity(K::KIND, &key, &entity)
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match written {
            Ok(WriteOutcome::Written) => outcome.written += 1,
            Ok(WriteOutcome::Unchanged) => outcome.unchanged += 1,
            Err(message) => {
                ctx.logger
                    .error(K::KIND, format!("{} '{key}' failed: {message}", K::KIND));
                outcome.fail(K::KIND, &key, message);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, total);
    }

    if ctx.force {
        outcome.removed = ctx.store.prune(K::KIND, &keep)?;
        if outcome.removed > 0 {
            ctx.logger.info(
                K::KIND,
                format!("Removed {} stale document(s)", outcome.removed),
            );
        }
    }

    Ok(outcome)
}

async fn run_step<C: RemoteClient>(
    ctx: &PullCtx<'_, C>,
    kind: EntityKind,
    progress: &StepProgress,
) -> SyncResult<PullOutcome> {
    match kind {
        EntityKind::Gallery => fetch_listed::<gallery::Galleries, C>(ctx, progress).await,
        EntityKind::Asset => fetch_listed::<asset::Assets, C>(ctx, progress).await,
        EntityKind::Model => fetch_listed::<model::Models, C>(ctx, progress).await,
        EntityKind::Container => {
            let mut outcome = fetch_listed::<container::Containers, C>(ctx, progress).await?;
            container::check_model_integrity(ctx, &mut outcome)?;
            Ok(outcome)
        }
        EntityKind::ContentItem => content::fetch_and_store(ctx, progress).await,
        EntityKind::Template => fetch_listed::<template::Templates, C>(ctx, progress).await,
        EntityKind::Page => page::fetch_and_store(ctx, progress).await,
    }
}

/// Snapshot the selected kinds of `request.source` into the local store.
///
/// # Errors
///
/// Only run-level failures are returned: invalid arguments and a base path
/// that cannot be created. Step and item failures are reported in the
/// summary.
pub async fn pull_instance<C: RemoteClient>(
    client: &C,
    root: &StoreRoot,
    request: &PullRequest,
    mut run: RunContext,
) -> Result<PullSummary> {
    if request.locale.trim().is_empty() {
        return Err(Error::InvalidArgument("locale must not be empty".into()));
    }
    if request.channel.trim().is_empty() {
        return Err(Error::InvalidArgument("channel must not be empty".into()));
    }

    let store = root.store_for(&request.source, &request.locale, request.preview);
    store.ensure_base_dirs().map_err(|source| Error::StoreInit {
        path: store.base_path().to_path_buf(),
        source,
    })?;
    let sink = FileSink::create(&store.logs_dir()).map_err(|source| Error::StoreInit {
        path: store.logs_dir(),
        source,
    })?;
    run.logger.add_sink(sink);

    let scope = InstanceScope::new(&request.source, &request.locale, request.preview);
    let ctx = PullCtx {
        client,
        scope: &scope,
        store: &store,
        logger: &run.logger,
        cancel: &run.cancel,
        channel: &request.channel,
        force: request.force_overwrite,
    };

    run.logger.run(
        LogLevel::Info,
        format!(
            "Pulling instance {} ({}, {}) into {}",
            request.source,
            request.locale,
            if request.preview { "preview" } else { "live" },
            store.base_path().display()
        ),
    );

    let mut steps = Vec::new();
    for kind in EntityKind::ORDERED {
        if !request.kinds.contains(&kind) {
            continue;
        }
        let progress = run.progress.step(kind);

        if run.cancel.is_cancelled() {
            progress.failed("cancelled");
            steps.push(PullStepReport::failed(kind, "cancelled"));
            continue;
        }

        if kind != EntityKind::ContentItem && !request.force_overwrite && store.is_populated(kind)
        {
            run.logger.info(
                kind,
                format!("{} already pulled, skipping (use --force to refresh)", kind.label()),
            );
            progress.progress(1, 1);
            progress.succeeded(1);
            steps.push(PullStepReport::skipped(kind));
            continue;
        }

        let report = match run_step(&ctx, kind, &progress).await {
            Ok(outcome) => PullStepReport::from_outcome(kind, outcome),
            Err(e) => {
                run.logger.error(kind, format!("{} step failed: {e}", kind.label()));
                PullStepReport::failed(kind, e)
            }
        };
        for warning in &report.warnings {
            run.logger.warning(kind, warning.clone());
        }
        match report.status {
            StepStatus::Success => {
                run.logger.success(
                    kind,
                    format!(
                        "{}: {}/{} processed, {} written, {} unchanged, {} error(s)",
                        kind.label(),
                        report.processed,
                        report.total,
                        report.written,
                        report.unchanged,
                        report.errors.len()
                    ),
                );
                progress.succeeded(report.processed);
            }
            StepStatus::Error => {
                progress.failed(
                    report
                        .step_error
                        .clone()
                        .unwrap_or_else(|| format!("{} item(s) failed", report.errors.len())),
                );
            }
        }
        steps.push(report);
    }

    let status = PullSummary::status_of(&steps);
    run.logger
        .run(LogLevel::Info, format!("Pull finished: {status}"));
    let log_file = run.logger.finish(PULL_LOG_PREFIX);

    Ok(PullSummary {
        source: request.source.clone(),
        locale: request.locale.clone(),
        channel: request.channel.clone(),
        preview: request.preview,
        base_path: store.base_path().to_path_buf(),
        status,
        steps,
        log_file,
    })
}
