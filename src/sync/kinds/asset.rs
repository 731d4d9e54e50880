//! Assets. Matched across instances by file name.

use std::future::Future;

use crate::mapper::{Mappable, Side};
use crate::model::{Asset, EntityKind};
use crate::progress::StepProgress;
use crate::remote::{ApiResult, InstanceScope, RemoteClient};
use crate::sync::pull::ListedKind;
use crate::sync::push::{PushCtx, outgoing_id};
use crate::sync::types::{PushOutcome, SyncResult};

pub(crate) struct Assets;

impl ListedKind for Assets {
    const KIND: EntityKind = EntityKind::Asset;
    type Listing = Asset;
    type Entity = Asset;

    fn list<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<Asset>>> + Send {
        client.list_assets(scope)
    }

    fn detail<C: RemoteClient>(
        _client: &C,
        _scope: &InstanceScope,
        listing: Asset,
    ) -> impl Future<Output = ApiResult<Asset>> + Send {
        std::future::ready(Ok(listing))
    }

    fn key(listing: &Asset) -> String {
        listing.id.to_string()
    }
}

/// Upload assets missing on the target into their translated gallery.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    let local: Vec<Asset> = ctx.store.read_all(EntityKind::Asset)?;
    for existing in ctx.client.list_assets(&ctx.target).await? {
        ctx.mapper.assets.add_record(Side::Target, existing);
    }

    let mut outcome = PushOutcome::with_total(local.len());
    progress.progress(0, outcome.total);

    for asset in local {
        ctx.cancel.check()?;
        ctx.mapper.assets.add_record(Side::Source, asset.clone());

        if ctx
            .mapper
            .assets
            .get_mapping(&asset.natural_key())
            .is_resolved()
        {
            outcome.counters.skipped += 1;
            outcome.processed += 1;
            progress.progress(outcome.processed, outcome.total);
            continue;
        }

        let mut outgoing = asset.clone();
        outgoing.id = outgoing_id(None, asset.id, ctx.dry_run);
        outgoing.gallery_id = asset.gallery_id.and_then(|id| {
            let target = ctx.mapper.galleries.target_id_for(id);
            if target.is_none() {
                ctx.logger.warning(
                    EntityKind::Asset,
                    format!(
                        "Gallery {id} of '{}' is not on target; uploading without gallery",
                        asset.file_name
                    ),
                );
            }
            target
        });

        let saved = if ctx.dry_run {
            Ok(outgoing)
        } else {
            ctx.client.save_asset(&ctx.target, &outgoing).await
        };
        match saved {
            Ok(saved) => {
                ctx.mapper.assets.add_record(Side::Target, saved);
                outcome.counters.successful_items += 1;
            }
            Err(e) => {
                ctx.logger.error(
                    EntityKind::Asset,
                    format!("Asset '{}' failed: {e}", asset.file_name),
                );
                outcome.fail(EntityKind::Asset, &asset.file_name, e);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}
