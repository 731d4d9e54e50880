//! Pages.
//!
//! Pull walks the sitemap artifact written by content sync; without it there
//! is nothing to pull. Push places parents before children and matches
//! existing target pages by path.

use std::collections::{HashMap, HashSet};

use crate::mapper::{Side, SourceId};
use crate::model::{EntityKind, ItemState, Page};
use crate::progress::StepProgress;
use crate::remote::RemoteClient;
use crate::store::WriteOutcome;
use crate::sync::order::dependency_order;
use crate::sync::pull::PullCtx;
use crate::sync::push::{PushCtx, outgoing_id};
use crate::sync::types::{PullOutcome, PushOutcome, SyncResult};

const KIND: EntityKind = EntityKind::Page;

/// Fetch every page listed in the channel's sitemap artifact.
pub(crate) async fn fetch_and_store<C: RemoteClient>(
    ctx: &PullCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PullOutcome> {
    if !ctx.store.sitemap_artifact_exists(ctx.channel) {
        ctx.logger.info(
            KIND,
            format!(
                "No sitemap for channel '{}'; pull content items first",
                ctx.channel
            ),
        );
        progress.progress(0, 0);
        return Ok(PullOutcome::default());
    }

    let refs = ctx.store.read_sitemap(ctx.channel)?.unwrap_or_default();
    let total = refs.len();
    let mut outcome = PullOutcome::with_total(total);
    let mut keep = HashSet::with_capacity(total);
    progress.progress(0, total);

    for page_ref in refs {
        ctx.cancel.check()?;
        let key = page_ref.page_id.to_string();
        keep.insert(key.clone());

        let written = match ctx.client.get_page(ctx.scope, page_ref.page_id).await {
            Ok(page) => ctx
                .store
                .write_entity(KIND, &key, &page)
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        match written {
            Ok(WriteOutcome::Written) => outcome.written += 1,
            Ok(WriteOutcome::Unchanged) => outcome.unchanged += 1,
            Err(message) => {
                ctx.logger.error(
                    KIND,
                    format!("Page {} ({}) failed: {message}", key, page_ref.path),
                );
                outcome.fail(KIND, &key, message);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, total);
    }

    if ctx.force {
        outcome.removed = ctx.store.prune(KIND, &keep)?;
    }

    Ok(outcome)
}

/// Push every local page, parents first.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    let local: Vec<Page> = ctx.store.read_all(KIND)?;
    let existing: HashMap<String, i64> = ctx
        .client
        .list_page_references(&ctx.target, ctx.channel)
        .await?
        .into_iter()
        .map(|r| (r.path.to_lowercase(), r.page_id))
        .collect();

    let ids: Vec<i64> = local.iter().map(|p| p.id).collect();
    let order = dependency_order(&ids, |i| local[i].parent_id.into_iter().collect());

    let mut outcome = PushOutcome::with_total(local.len());
    progress.progress(0, outcome.total);

    for i in order {
        ctx.cancel.check()?;
        let page = &local[i];
        ctx.mapper.pages.add_record(Side::Source, page.clone());

        let target_id = existing.get(&page.path.to_lowercase()).copied();
        match push_page(ctx, page, target_id, &mut outcome).await {
            Ok(()) => outcome.counters.successful_items += 1,
            Err(e) => {
                ctx.logger
                    .error(KIND, format!("Page '{}' failed: {e}", page.path));
                outcome.fail(KIND, &page.path, e);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}

async fn push_page<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    page: &Page,
    existing: Option<i64>,
    outcome: &mut PushOutcome,
) -> SyncResult<()> {
    let template_id = match page.template_id {
        Some(id) => Some(ctx.ensure_template(id).await?),
        None => None,
    };

    let parent_id = page.parent_id.and_then(|id| {
        let target = ctx.mapper.pages.target_id_for(id);
        if target.is_none() {
            ctx.logger.warning(
                KIND,
                format!("Parent of '{}' is not on target; placing at root", page.path),
            );
        }
        target
    });

    let dynamic_content_item_id = page.dynamic_content_item_id.and_then(|id| {
        let target = ctx.mapper.content_items.target_id_for(id);
        if target.is_none() {
            outcome.counters.not_on_destination += 1;
        }
        target
    });

    let mut zones = page.zones.clone();
    for modules in zones.values_mut() {
        modules.retain_mut(|module| {
            match ctx.mapper.content_items.target_id_for(module.content_id) {
                Some(id) => {
                    module.content_id = id;
                    true
                }
                None => {
                    outcome.counters.not_on_destination += 1;
                    false
                }
            }
        });
    }

    let mut outgoing = Page {
        id: outgoing_id(existing, page.id, ctx.dry_run),
        template_id,
        parent_id,
        dynamic_content_item_id,
        zones,
        ..page.clone()
    };

    if !ctx.dry_run {
        outgoing.id = ctx.client.save_page(&ctx.target, &outgoing).await?;
        if page.state == ItemState::Published {
            ctx.client.publish_page(&ctx.target, outgoing.id).await?;
        }
    }
    ctx.mapper.pages.resolve(&SourceId(page.id), outgoing);
    Ok(())
}
