//! Containers. Matched across instances by reference name; stored under
//! their lowercased reference name.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use crate::mapper::Side;
use crate::model::{Container, ContainerSummary, EntityKind, Model};
use crate::progress::StepProgress;
use crate::remote::{ApiResult, InstanceScope, RemoteClient};
use crate::sync::pull::{ListedKind, PullCtx};
use crate::sync::push::PushCtx;
use crate::sync::types::{PullOutcome, PushOutcome, SyncResult};

/// Store key of a container document.
pub(crate) fn store_key(reference_name: &str) -> String {
    reference_name.to_lowercase()
}

pub(crate) struct Containers;

impl ListedKind for Containers {
    const KIND: EntityKind = EntityKind::Container;
    type Listing = ContainerSummary;
    type Entity = Container;

    fn list<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<ContainerSummary>>> + Send {
        client.list_containers(scope)
    }

    fn detail<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
        listing: ContainerSummary,
    ) -> impl Future<Output = ApiResult<Container>> + Send {
        client.get_container_by_id(scope, listing.id)
    }

    fn key(listing: &ContainerSummary) -> String {
        store_key(&listing.reference_name)
    }
}

/// Every stored container must point at a stored model.
///
/// System containers only warn. Skipped entirely when no models have been
/// pulled into this store.
pub(crate) fn check_model_integrity<C>(
    ctx: &PullCtx<'_, C>,
    outcome: &mut PullOutcome,
) -> SyncResult<()> {
    let models: Vec<Model> = ctx.store.read_all(EntityKind::Model)?;
    if models.is_empty() {
        outcome
            .warnings
            .push("No models in local store; container model check skipped".to_string());
        return Ok(());
    }
    let model_ids: HashSet<i64> = models.iter().map(|m| m.id).collect();

    let containers: Vec<Container> = ctx.store.read_all(EntityKind::Container)?;
    for container in containers {
        if model_ids.contains(&container.model_id) {
            continue;
        }
        let message = format!(
            "Container '{}' references model {} which was not pulled",
            container.reference_name, container.model_id
        );
        if container.is_system() {
            outcome.warnings.push(message);
        } else {
            ctx.logger.error(EntityKind::Container, message.clone());
            outcome.fail(EntityKind::Container, &container.reference_name, message);
        }
    }
    Ok(())
}

/// Create or update every local container against its translated model.
///
/// System containers exist on every instance and are left alone.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    let local: Vec<Container> = ctx.store.read_all(EntityKind::Container)?;
    let existing: HashMap<String, i64> = ctx
        .client
        .list_containers(&ctx.target)
        .await?
        .into_iter()
        .map(|c| (store_key(&c.reference_name), c.id))
        .collect();

    let mut outcome = PushOutcome::with_total(local.len());
    progress.progress(0, outcome.total);

    for container in local {
        ctx.cancel.check()?;
        ctx.mapper
            .containers
            .add_record(Side::Source, container.clone());

        if container.is_system() {
            outcome.counters.skipped += 1;
        } else {
            let target_id = existing.get(&store_key(&container.reference_name)).copied();
            match ctx.write_container(&container, target_id).await {
                Ok(_) => outcome.counters.successful_items += 1,
                Err(e) => {
                    ctx.logger.error(
                        EntityKind::Container,
                        format!("Container '{}' failed: {e}", container.reference_name),
                    );
                    outcome.fail(EntityKind::Container, &container.reference_name, e);
                }
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}
