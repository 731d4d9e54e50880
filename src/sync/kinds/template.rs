//! Page templates. Matched across instances by name.

use std::future::Future;

use crate::mapper::{Side, SourceId};
use crate::model::{EntityKind, Template, TemplateSummary};
use crate::progress::StepProgress;
use crate::remote::{ApiResult, InstanceScope, RemoteClient};
use crate::sync::pull::ListedKind;
use crate::sync::push::{PushCtx, outgoing_id};
use crate::sync::types::{PushOutcome, SyncResult};

pub(crate) struct Templates;

impl ListedKind for Templates {
    const KIND: EntityKind = EntityKind::Template;
    type Listing = TemplateSummary;
    type Entity = Template;

    fn list<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<TemplateSummary>>> + Send {
        client.list_templates(scope)
    }

    fn detail<C: RemoteClient>(
        client: &C,
        scope: &InstanceScope,
        listing: TemplateSummary,
    ) -> impl Future<Output = ApiResult<Template>> + Send {
        client.get_template(scope, listing.id)
    }

    fn key(listing: &TemplateSummary) -> String {
        listing.id.to_string()
    }
}

/// Create or update every local template.
pub(crate) async fn load_and_push<C: RemoteClient>(
    ctx: &mut PushCtx<'_, C>,
    progress: &StepProgress,
) -> SyncResult<PushOutcome> {
    let local: Vec<Template> = ctx.store.read_all(EntityKind::Template)?;
    ctx.target_template_ids().await?;

    let mut outcome = PushOutcome::with_total(local.len());
    progress.progress(0, outcome.total);

    for template in local {
        ctx.cancel.check()?;
        ctx.mapper
            .templates
            .add_record(Side::Source, template.clone());

        let existing = ctx
            .target_template_ids()
            .await?
            .get(&template.name.to_lowercase())
            .copied();
        let mut outgoing = template.clone();
        outgoing.id = outgoing_id(existing, template.id, ctx.dry_run);

        let saved = if ctx.dry_run {
            Ok(outgoing)
        } else {
            ctx.client.save_template(&ctx.target, &outgoing).await
        };
        match saved {
            Ok(saved) => {
                ctx.mapper.templates.resolve(&SourceId(template.id), saved);
                outcome.counters.successful_items += 1;
            }
            Err(e) => {
                ctx.logger.error(
                    EntityKind::Template,
                    format!("Template '{}' failed: {e}", template.name),
                );
                outcome.fail(EntityKind::Template, &template.name, e);
            }
        }

        outcome.processed += 1;
        progress.progress(outcome.processed, outcome.total);
    }

    Ok(outcome)
}
