//! Push orchestrator: local store → target instance.
//!
//! Kinds run in dependency order against one [`ReferenceMapper`]. Each
//! synchronizer registers source records, rewrites foreign keys through the
//! mapper, writes to the target and registers the written record, so later
//! kinds resolve against everything pushed before them.

use std::collections::HashMap;

use super::kinds::{asset, container, content, gallery, model, page, template};
use super::types::{
    CancelFlag, PushOutcome, PushRequest, PushStepReport, PushSummary, RunContext, StepStatus,
    SyncError, SyncResult,
};
use crate::error::{Error, Result};
use crate::log::{FileSink, LogLevel, RunLogger};
use crate::mapper::{NameKey, ReferenceMapper, Side, SourceId};
use crate::model::{Container, EntityKind, Model, Template};
use crate::progress::StepProgress;
use crate::remote::{InstanceScope, RemoteClient};
use crate::store::{LocalStore, StoreRoot};

/// Log file prefix for push runs.
pub const PUSH_LOG_PREFIX: &str = "push";

/// Id sent to the target to request creation.
pub(crate) const NEW_ENTITY_ID: i64 = -1;

/// Id to send for an outgoing record.
///
/// Existing target records are updated in place. Dry runs keep the source id
/// for would-be creations so mapped ids stay distinct.
pub(crate) fn outgoing_id(existing: Option<i64>, source_id: i64, dry_run: bool) -> i64 {
    match existing {
        Some(id) => id,
        None if dry_run => source_id,
        None => NEW_ENTITY_ID,
    }
}

/// State shared by the push synchronizers of one run.
pub(crate) struct PushCtx<'a, C> {
    pub client: &'a C,
    pub target: InstanceScope,
    pub channel: &'a str,
    pub store: &'a LocalStore,
    pub mapper: ReferenceMapper,
    pub logger: &'a RunLogger,
    pub cancel: &'a CancelFlag,
    pub dry_run: bool,
    /// Target model ids by lowercased reference name.
    target_model_index: Option<HashMap<String, i64>>,
    /// Target template ids by lowercased name.
    target_template_index: Option<HashMap<String, i64>>,
    /// Live target models by id, for schema comparison.
    target_models: HashMap<i64, Model>,
}

impl<'a, C: RemoteClient> PushCtx<'a, C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: &'a C,
        target: InstanceScope,
        channel: &'a str,
        store: &'a LocalStore,
        mapper: ReferenceMapper,
        logger: &'a RunLogger,
        cancel: &'a CancelFlag,
        dry_run: bool,
    ) -> Self {
        Self {
            client,
            target,
            channel,
            store,
            mapper,
            logger,
            cancel,
            dry_run,
            target_model_index: None,
            target_template_index: None,
            target_models: HashMap::new(),
        }
    }

    /// Target model ids by reference name, listed once per run.
    pub async fn target_model_ids(&mut self) -> SyncResult<&HashMap<String, i64>> {
        if self.target_model_index.is_none() {
            let index = self
                .client
                .list_models(&self.target)
                .await?
                .into_iter()
                .map(|m| (m.reference_name.to_lowercase(), m.id))
                .collect();
            self.target_model_index = Some(index);
        }
        Ok(self.target_model_index.get_or_insert_with(HashMap::new))
    }

    /// Target template ids by name, listed once per run.
    pub async fn target_template_ids(&mut self) -> SyncResult<&HashMap<String, i64>> {
        if self.target_template_index.is_none() {
            let index = self
                .client
                .list_templates(&self.target)
                .await?
                .into_iter()
                .map(|t| (t.name.to_lowercase(), t.id))
                .collect();
            self.target_template_index = Some(index);
        }
        Ok(self.target_template_index.get_or_insert_with(HashMap::new))
    }

    /// Record a model now present on the target.
    pub fn register_target_model(&mut self, model: Model) {
        if let Some(index) = self.target_model_index.as_mut() {
            index.insert(model.reference_name.to_lowercase(), model.id);
        }
        self.target_models.insert(model.id, model.clone());
        self.mapper.models.add_record(Side::Target, model);
    }

    /// Create or update a model on the target (planned only on dry runs).
    pub async fn write_model(&mut self, model: &Model) -> SyncResult<Model> {
        let existing = self
            .target_model_ids()
            .await?
            .get(&model.reference_name.to_lowercase())
            .copied();
        let mut outgoing = model.clone();
        outgoing.id = outgoing_id(existing, model.id, self.dry_run);
        let saved = if self.dry_run {
            outgoing
        } else {
            self.client.save_model(&self.target, &outgoing).await?
        };
        self.register_target_model(saved.clone());
        Ok(saved)
    }

    /// Target id for a source model id.
    ///
    /// Mapper first, then the target's model of the same reference name,
    /// then creation from the local snapshot.
    pub async fn ensure_model(&mut self, source_model_id: i64) -> SyncResult<i64> {
        if let Some(id) = self.mapper.models.target_id_for(source_model_id) {
            return Ok(id);
        }
        let local: Model = self
            .store
            .read_entity(EntityKind::Model, &source_model_id.to_string())?
            .ok_or_else(|| SyncError::unresolved(EntityKind::Model, source_model_id))?;
        self.mapper.models.add_record(Side::Source, local.clone());

        let existing = self
            .target_model_ids()
            .await?
            .get(&local.reference_name.to_lowercase())
            .copied();
        if let Some(target_id) = existing {
            let target = self.client.get_model_by_id(&self.target, target_id).await?;
            self.register_target_model(target);
            return Ok(target_id);
        }

        self.logger.info(
            EntityKind::Model,
            format!("Creating model '{}' on target", local.reference_name),
        );
        Ok(self.write_model(&local).await?.id)
    }

    /// Live target model with the given target id.
    pub async fn target_model(&mut self, target_id: i64) -> SyncResult<Model> {
        if let Some(model) = self.target_models.get(&target_id) {
            return Ok(model.clone());
        }
        let model = self.client.get_model_by_id(&self.target, target_id).await?;
        self.target_models.insert(target_id, model.clone());
        Ok(model)
    }

    /// Create or update a container on the target (planned only on dry runs).
    ///
    /// `existing` is the target id of a container with the same reference name.
    pub async fn write_container(
        &mut self,
        local: &Container,
        existing: Option<i64>,
    ) -> SyncResult<Container> {
        let model_id = self.ensure_model(local.model_id).await?;
        let mut outgoing = local.clone();
        outgoing.id = outgoing_id(existing, local.id, self.dry_run);
        outgoing.model_id = model_id;
        let saved = if self.dry_run {
            outgoing
        } else {
            self.client.save_container(&self.target, &outgoing).await?
        };
        self.mapper
            .containers
            .add_record(Side::Target, saved.clone());
        Ok(saved)
    }

    /// Target container for a reference name.
    ///
    /// Mapper first, then the target by reference name, then creation from
    /// the local snapshot.
    pub async fn ensure_container(&mut self, reference_name: &str) -> SyncResult<Container> {
        let key = NameKey::new(reference_name);
        if let Some(target) = self.mapper.containers.get_mapping(&key).target {
            return Ok(target.clone());
        }

        let local: Option<Container> = self
            .store
            .read_entity(EntityKind::Container, &container::store_key(reference_name))?;
        if let Some(local) = &local {
            self.mapper
                .containers
                .add_record(Side::Source, local.clone());
        }

        if let Some(existing) = self
            .client
            .get_container_by_reference_name(&self.target, reference_name)
            .await?
        {
            self.mapper
                .containers
                .add_record(Side::Target, existing.clone());
            return Ok(existing);
        }

        let local =
            local.ok_or_else(|| SyncError::unresolved(EntityKind::Container, reference_name))?;
        self.logger.info(
            EntityKind::Container,
            format!("Creating container '{reference_name}' on target"),
        );
        self.write_container(&local, None).await
    }

    /// Target id for a source template id, matched by template name.
    ///
    /// Templates are never created implicitly.
    pub async fn ensure_template(&mut self, source_template_id: i64) -> SyncResult<i64> {
        if let Some(id) = self.mapper.templates.target_id_for(source_template_id) {
            return Ok(id);
        }
        let local: Template = self
            .store
            .read_entity(EntityKind::Template, &source_template_id.to_string())?
            .ok_or_else(|| SyncError::unresolved(EntityKind::Template, source_template_id))?;
        let target_id = self
            .target_template_ids()
            .await?
            .get(&local.name.to_lowercase())
            .copied()
            .ok_or_else(|| SyncError::unresolved(EntityKind::Template, &local.name))?;

        self.mapper
            .templates
            .add_record(Side::Source, local.clone());
        let mut target = local;
        target.id = target_id;
        self.mapper
            .templates
            .resolve(&SourceId(source_template_id), target);
        Ok(target_id)
    }
}

async fn run_step<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    kind: EntityKind,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    match kind {
        EntityKind::Gallery => gallery::load_and_push(ctx, progress).await,
        EntityKind::Asset => asset::load_and_push(ctx, progress).await,
        EntityKind::Model => model::load_and_push(ctx, progress).await,
        EntityKind::Container => container::load_and_push(ctx, progress).await,
        EntityKind::ContentItem => content::load_and_push(ctx, progress).await,
        EntityKind::Template => template::load_and_push(ctx, progress).await,
        EntityKind::Page => page::load_and_push(ctx, progress).await,
    }
}

/// Replay the local snapshot of `request.source` into `request.target`.
///
/// # Errors
///
/// Returns [`Error::StoreNotFound`] when nothing was pulled for the source,
/// locale and mode. Step and item failures are reported in the summary.
pub async fn push_instance<C: RemoteClient>(
    client: &C,
    root: &StoreRoot,
    request: &PushRequest,
    mut run: RunContext,
) -> Result<PushSummary> {
    if request.locale.trim().is_empty() {
        return Err(Error::InvalidArgument("locale must not be empty".into()));
    }

    let store = root.store_for(&request.source, &request.locale, request.preview);
    if !store.exists() {
        return Err(Error::StoreNotFound {
            path: store.base_path().to_path_buf(),
        });
    }
    let sink = FileSink::create(&store.logs_dir()).map_err(|source| Error::StoreInit {
        path: store.logs_dir(),
        source,
    })?;
    run.logger.add_sink(sink);

    run.logger.run(
        LogLevel::Info,
        format!(
            "Pushing {} → {} ({}, {}){}",
            request.source,
            request.target,
            request.locale,
            if request.preview { "preview" } else { "live" },
            if request.dry_run { " [dry run]" } else { "" }
        ),
    );

    let mut ctx = PushCtx::new(
        client,
        InstanceScope::new(&request.target, &request.locale, request.preview),
        &request.channel,
        &store,
        ReferenceMapper::new(),
        &run.logger,
        &run.cancel,
        request.dry_run,
    );

    let mut steps = Vec::new();
    for kind in EntityKind::ORDERED {
        if !request.kinds.contains(&kind) {
            continue;
        }
        let progress = run.progress.step(kind);

        if run.cancel.is_cancelled() {
            progress.failed("cancelled");
            steps.push(PushStepReport::failed(kind, "cancelled"));
            continue;
        }

        let report = match run_step(&mut ctx, kind, &progress).await {
            Ok(outcome) => PushStepReport::from_outcome(kind, outcome),
            Err(e) => {
                run.logger
                    .error(kind, format!("{} step failed: {e}", kind.label()));
                PushStepReport::failed(kind, e)
            }
        };
        let c = report.counters;
        match report.status {
            StepStatus::Success => {
                run.logger.success(
                    kind,
                    format!(
                        "{}: {} pushed, {} failed, {} skipped, {} model mismatch, {} not on source, {} not on destination",
                        kind.label(),
                        c.successful_items,
                        c.failed_items,
                        c.skipped,
                        c.model_mismatch,
                        c.not_on_source,
                        c.not_on_destination
                    ),
                );
                progress.succeeded(report.processed);
            }
            StepStatus::Error => {
                progress.failed(
                    report
                        .step_error
                        .clone()
                        .unwrap_or_else(|| format!("{} item(s) failed", c.failed_items)),
                );
            }
        }
        steps.push(report);
    }

    let mappings = ctx.mapper.stats();
    drop(ctx);

    let status = PushSummary::status_of(&steps);
    run.logger
        .run(LogLevel::Info, format!("Push finished: {status}"));
    let log_file = run.logger.finish(PUSH_LOG_PREFIX);

    Ok(PushSummary {
        source: request.source.clone(),
        target: request.target.clone(),
        locale: request.locale.clone(),
        preview: request.preview,
        dry_run: request.dry_run,
        status,
        steps,
        mappings,
        log_file,
    })
}
