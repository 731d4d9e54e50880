//! Galleries. Matched across instances by name.

use std::future::Future;

use crate::mapper::{Mappable, Side};
use crate::model::{EntityKind, Gallery};
use crate::progress::StepProgress;
use crate::remote::{ApiResult, InstanceScope, RemoteClient};
use crate::sync::pull::ListedKind;
use crate::sync::push::{PushCtx, outgoing_id};
use crate::sync::types::{PushOutcome, SyncResult};

pub(crate) struct Galleries;

impl ListedKind for Galleries {
    const KIND: EntityKind = EntityKind::Gallery;
    type Listing = Gallery;
    type Entity = Gallery;

    fn list<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<Gallery>>> + Send {
        client.list_galleries(scope)
    }

    fn detail<C: RemoteClient>(
        _client: &C,
        _scope: &InstanceScope,
        listing: Gallery,
    ) -> impl Future<Output = ApiResult<Gallery>> + Send {
        std::future::ready(Ok(listing))
    }

    fn key(listing: &Gallery) -> String {
        listing.id.to_string()
    }
}

/// Galleries already on the target (same name) are mapped and skipped.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    let local: Vec<Gallery> = ctx.store.read_all(EntityKind::Gallery)?;
    for existing in ctx.client.list_galleries(&ctx.target).await? {
        ctx.mapper.galleries.add_record(Side::Target, existing);
    }

    let mut outcome = PushOutcome::with_total(local.len());
    progress.progress(0, outcome.total);

    for gallery in local {
        ctx.cancel.check()?;
        ctx.mapper
            .galleries
            .add_record(Side::Source, gallery.clone());

        let key = gallery.natural_key();
        if ctx.mapper.galleries.get_mapping(&key).is_resolved() {
            outcome.counters.skipped += 1;
        } else {
            let mut outgoing = gallery.clone();
            outgoing.id = outgoing_id(None, gallery.id, ctx.dry_run);
            // Membership is rebuilt when assets are pushed.
            outgoing.asset_ids.clear();

            let saved = if ctx.dry_run {
                Ok(outgoing)
            } else {
                ctx.client.save_gallery(&ctx.target, &outgoing).await
            };
            match saved {
                Ok(saved) => {
                    ctx.mapper.galleries.add_record(Side::Target, saved);
                    outcome.counters.successful_items += 1;
                }
                Err(e) => {
                    ctx.logger.error(
                        EntityKind::Gallery,
                        format!("Gallery '{}' failed: {e}", gallery.name),
                    );
                    outcome.fail(EntityKind::Gallery, &gallery.name, e);
                }
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}
