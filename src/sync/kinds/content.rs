//! Content items.
//!
//! Pull is driven by the remote delta cursor rather than a listing: all
//! pages of the delta are collected first, then written, then the channel
//! sitemap and the new cursor are persisted.
//!
//! Push translates container, model and embedded references, guards against
//! schema drift between the local and target model, and writes items
//! referenced-first.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::mapper::{Mappable, NameKey, Side, SourceId};
use crate::model::{Asset, ContentItem, EntityKind, ItemState, Model, SyncToken};
use crate::progress::StepProgress;
use crate::remote::RemoteClient;
use crate::store::WriteOutcome;
use crate::sync::order::dependency_order;
use crate::sync::pull::PullCtx;
use crate::sync::push::{NEW_ENTITY_ID, PushCtx};
use crate::sync::resolve::FieldRewriter;
use crate::sync::types::{PullOutcome, PushOutcome, SyncError, SyncResult};

/// Upper bound on delta pages fetched in one pull.
const MAX_DELTA_PAGES: usize = 10_000;

/// Pull the content delta into `item/` and `list/`, then the sitemap.
///
/// A forced pull discards the stored cursor and performs a full sync, then
/// prunes item documents and container lists the remote no longer has.
pub(crate) async fn fetch_and_store<C: RemoteClient>(
    ctx: &PullCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PullOutcome> {
    const KIND: EntityKind = EntityKind::ContentItem;

    if ctx.force {
        ctx.store.clear_sync_token()?;
    }
    let mut cursor: Option<SyncToken> = ctx.store.read_sync_token()?;
    ctx.logger.info(
        KIND,
        match &cursor {
            Some(token) => format!("Incremental sync from cursor {}", token.as_str()),
            None => "Full sync".to_string(),
        },
    );

    let mut delta = Vec::new();
    let mut pages = 0;
    loop {
        ctx.cancel.check()?;
        pages += 1;
        if pages > MAX_DELTA_PAGES {
            return Err(SyncError::TooManyPages(MAX_DELTA_PAGES));
        }
        let page = ctx
            .client
            .list_content_items_delta(ctx.scope, cursor.as_ref())
            .await?;
        delta.extend(page.items);
        cursor = Some(page.next_cursor);
        if !page.has_more {
            break;
        }
    }

    let total = delta.len();
    let mut outcome = PullOutcome::with_total(total);
    progress.progress(0, total);

    // Container lists touched by this delta, keyed by lowercased reference name.
    // A full resync rebuilds them from scratch.
    let mut lists: BTreeMap<String, Vec<ContentItem>> = BTreeMap::new();
    let mut keep: HashSet<String> = HashSet::with_capacity(total);

    for entry in delta {
        ctx.cancel.check()?;
        let key = entry.id.to_string();
        let list_key = entry.container_reference_name.to_lowercase();
        if !lists.contains_key(&list_key) {
            let existing = if ctx.force {
                Vec::new()
            } else {
                ctx.store.read_list(&entry.container_reference_name)?
            };
            lists.insert(list_key.clone(), existing);
        }

        if entry.state == ItemState::Deleted {
            keep.remove(&key);
            match ctx.store.remove_entity(KIND, &key) {
                Ok(removed) => outcome.removed += usize::from(removed),
                Err(e) => outcome.fail(KIND, &key, e),
            }
            if let Some(list) = lists.get_mut(&list_key) {
                list.retain(|i| i.id != entry.id);
            }
        } else {
            keep.insert(key.clone());
            let item = if entry.fields.is_empty() {
                ctx.client.get_content_item(ctx.scope, entry.id).await
            } else {
                Ok(entry)
            };
            let written = item.map_err(|e| e.to_string()).and_then(|item| {
                let result = ctx
                    .store
                    .write_entity(KIND, &key, &item)
                    .map_err(|e| e.to_string());
                if let Some(list) = lists.get_mut(&list_key) {
                    match list.iter_mut().find(|i| i.id == item.id) {
                        Some(slot) => *slot = item,
                        None => list.push(item),
                    }
                }
                result
            });
            match written {
                Ok(WriteOutcome::Written) => outcome.written += 1,
                Ok(WriteOutcome::Unchanged) => outcome.unchanged += 1,
                Err(message) => {
                    ctx.logger
                        .error(KIND, format!("Content item {key} failed: {message}"));
                    outcome.fail(KIND, &key, message);
                }
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, total);
    }

    for (reference_name, items) in &lists {
        ctx.store.write_list(reference_name, items)?;
    }

    if ctx.force {
        let removed = ctx.store.prune(KIND, &keep)?;
        let list_keep: HashSet<String> = lists.keys().cloned().collect();
        let stale_lists = ctx.store.prune_lists(&list_keep)?;
        outcome.removed += removed;
        if removed + stale_lists > 0 {
            ctx.logger.info(
                KIND,
                format!("Removed {removed} stale item(s) and {stale_lists} stale list(s)"),
            );
        }
    }

    let sitemap = ctx
        .client
        .list_page_references(ctx.scope, ctx.channel)
        .await?;
    ctx.store.write_sitemap(ctx.channel, &sitemap)?;
    ctx.logger.info(
        KIND,
        format!(
            "Sitemap '{}' written with {} page(s)",
            ctx.channel,
            sitemap.len()
        ),
    );

    if let Some(token) = &cursor {
        ctx.store.write_sync_token(token)?;
    }

    Ok(outcome)
}

enum ItemResult {
    Pushed,
    ModelMismatch,
}

/// Per-step caches for content push.
struct ContentPush {
    local_ids: HashSet<i64>,
    asset_keys: HashMap<String, NameKey>,
    local_models: HashMap<i64, Option<Model>>,
}

/// Push every local content item, referenced items first.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    const KIND: EntityKind = EntityKind::ContentItem;

    let items: Vec<ContentItem> = ctx.store.read_all(KIND)?;
    let assets: Vec<Asset> = ctx.store.read_all(EntityKind::Asset)?;
    let mut state = ContentPush {
        local_ids: items.iter().map(|i| i.id).collect(),
        asset_keys: assets
            .iter()
            .map(|a| (a.url.clone(), a.natural_key()))
            .collect(),
        local_models: HashMap::new(),
    };
    for item in &items {
        ctx.mapper
            .content_items
            .add_record(Side::Source, item.clone());
    }

    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let order = dependency_order(&ids, |i| items[i].content_references());

    let mut outcome = PushOutcome::with_total(items.len());
    progress.progress(0, outcome.total);

    for i in order {
        ctx.cancel.check()?;
        let item = &items[i];
        match push_item(ctx, &mut state, item, &mut outcome).await {
            Ok(ItemResult::Pushed) => outcome.counters.successful_items += 1,
            Ok(ItemResult::ModelMismatch) => {
                outcome.counters.model_mismatch += 1;
                ctx.logger.warning(
                    KIND,
                    format!(
                        "Content item {} skipped: model of '{}' differs on target",
                        item.id, item.container_reference_name
                    ),
                );
            }
            Err(e) => {
                ctx.logger
                    .error(KIND, format!("Content item {} failed: {e}", item.id));
                outcome.fail(KIND, item.id, e);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}

async fn push_item<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    state: &mut ContentPush,
    item: &ContentItem,
    outcome: &mut PushOutcome,
) -> SyncResult<ItemResult> {
    let container = ctx.ensure_container(&item.container_reference_name).await?;

    if !state.local_models.contains_key(&item.model_id) {
        let model: Option<Model> = ctx
            .store
            .read_entity(EntityKind::Model, &item.model_id.to_string())?;
        state.local_models.insert(item.model_id, model);
    }
    let local_model = state
        .local_models
        .get(&item.model_id)
        .and_then(Option::as_ref)
        .ok_or_else(|| SyncError::unresolved(EntityKind::Model, item.model_id))?;
    let target_model = ctx.target_model(container.model_id).await?;
    if local_model.field_signature() != target_model.field_signature() {
        return Ok(ItemResult::ModelMismatch);
    }

    let (fields, dropped) =
        FieldRewriter::new(&ctx.mapper, &state.local_ids, &state.asset_keys).rewrite(&item.fields);
    outcome.counters.not_on_source += dropped.not_on_source;
    outcome.counters.not_on_destination += dropped.not_on_destination;

    let mut outgoing = ContentItem {
        id: if ctx.dry_run { item.id } else { NEW_ENTITY_ID },
        container_reference_name: container.reference_name.clone(),
        model_id: container.model_id,
        state: item.state,
        fields,
    };

    if !ctx.dry_run {
        outgoing.id = ctx.client.save_content_item(&ctx.target, &outgoing).await?;
        if item.state == ItemState::Published {
            ctx.client.publish_content(&ctx.target, outgoing.id).await?;
        }
    }
    ctx.mapper.content_items.resolve(&SourceId(item.id), outgoing);
    Ok(ItemResult::Pushed)
}
