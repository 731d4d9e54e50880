//! Models. Matched across instances by reference name.

use std::future::Future;

use crate::mapper::Side;
use crate::model::{EntityKind, Model, ModelSummary};
use crate::progress::StepProgress;
use crate::remote::{ApiResult, InstanceScope, RemoteClient};
use crate::sync::order::dependency_order;
use crate::sync::pull::ListedKind;
use crate::sync::push::PushCtx;
use crate::sync::types::{PushOutcome, SyncResult};

pub(crate) struct Models;

impl ListedKind for Models {
    const KIND: EntityKind = EntityKind::Model;
    type Listing = ModelSummary;
    type Entity = Model;

    fn list<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<ModelSummary>>> + Send {
        client.list_models(scope)
    }

    fn detail<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
        listing: ModelSummary,
    ) -> impl Future<Output = ApiResult<Model>> + Send {
        client.get_model_by_id(scope, listing.id)
    }

    fn key(listing: &ModelSummary) -> String {
        listing.id.to_string()
    }
}

/// Create or update every local model, referenced models first.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    let local: Vec<Model> = ctx.store.read_all(EntityKind::Model)?;
    ctx.target_model_ids().await?;

    let names: Vec<String> = local
        .iter()
        .map(|m| m.reference_name.to_lowercase())
        .collect();
    let order = dependency_order(&names, |i| {
        local[i]
            .referenced_models()
            .into_iter()
            .map(str::to_lowercase)
            .collect()
    });

    let mut outcome = PushOutcome::with_total(local.len());
    progress.progress(0, outcome.total);

    for i in order {
        ctx.cancel.check()?;
        let model = &local[i];
        ctx.mapper.models.add_record(Side::Source, model.clone());

        match ctx.write_model(model).await {
            Ok(_) => outcome.counters.successful_items += 1,
            Err(e) => {
                ctx.logger.error(
                    EntityKind::Model,
                    format!("Model '{}' failed: {e}", model.reference_name),
                );
                outcome.fail(EntityKind::Model, &model.reference_name, e);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}
