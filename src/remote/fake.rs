//! In-memory CMS used by orchestration tests.
//!
//! Holds any number of instances, records every call as `op:instance`, and
//! can be told to fail specific calls.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{ApiError, ApiResult, InstanceScope, RemoteClient};
use crate::model::{
    Asset, Container, ContainerSummary, ContentDelta, ContentItem, Gallery, Model, ModelSummary,
    Page, PageRef, SyncToken, Template, TemplateSummary,
};

#[derive(Debug, Default, Clone)]
pub(crate) struct InstanceData {
    pub galleries: Vec<Gallery>,
    pub assets: Vec<Asset>,
    pub models: Vec<Model>,
    pub containers: Vec<Container>,
    pub content: Vec<ContentItem>,
    /// Append-only change log backing the delta cursor.
    pub content_log: Vec<ContentItem>,
    pub templates: Vec<Template>,
    pub pages: Vec<Page>,
    pub sitemap: Vec<PageRef>,
    pub published_content: Vec<i64>,
    pub published_pages: Vec<i64>,
}

impl InstanceData {
    pub fn add_content(&mut self, item: ContentItem) {
        self.content_log.push(item.clone());
        self.content.retain(|c| c.id != item.id);
        self.content.push(item);
    }
}

#[derive(Debug, Default)]
struct FakeState {
    instances: HashMap<String, InstanceData>,
    calls: Vec<String>,
    delta_cursors: Vec<Option<String>>,
    op_counts: HashMap<String, usize>,
    fail_nth: HashMap<String, HashSet<usize>>,
    fail_always: HashSet<String>,
    next_id: i64,
}

pub(crate) struct FakeCms {
    state: Mutex<FakeState>,
    delta_page_size: usize,
}

impl FakeCms {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                next_id: 1000,
                ..FakeState::default()
            }),
            delta_page_size: 2,
        }
    }

    /// Mutate (creating if needed) one instance's data.
    pub fn with_instance(&self, instance: &str, f: impl FnOnce(&mut InstanceData)) {
        let mut state = self.state.lock().unwrap();
        f(state.instances.entry(instance.to_string()).or_default());
    }

    pub fn instance(&self, instance: &str) -> InstanceData {
        let state = self.state.lock().unwrap();
        state.instances.get(instance).cloned().unwrap_or_default()
    }

    /// Every call so far, as `op:instance`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Cursor passed to each `list_content_items_delta` call, in call order.
    pub fn delta_cursors(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().delta_cursors.clone()
    }

    /// Calls of one operation so far.
    pub fn count(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .op_counts
            .get(op)
            .copied()
            .unwrap_or(0)
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock().unwrap();
        state.calls.clear();
        state.delta_cursors.clear();
        state.op_counts.clear();
    }

    /// Fail the `nth` (1-based) call of `op`.
    pub fn fail_nth(&self, op: &str, nth: usize) {
        self.state
            .lock()
            .unwrap()
            .fail_nth
            .entry(op.to_string())
            .or_default()
            .insert(nth);
    }

    /// Fail every call of `op`.
    pub fn fail_always(&self, op: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_always
            .insert(op.to_string());
    }

    /// Record a call and apply failure injection, then run `f` on the instance.
    fn call<T>(
        &self,
        op: &str,
        scope: &InstanceScope,
        f: impl FnOnce(&mut InstanceData, &mut i64) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("{op}:{}", scope.instance));
        let count = {
            let c = state.op_counts.entry(op.to_string()).or_default();
            *c += 1;
            *c
        };
        let failing = state.fail_always.contains(op)
            || state.fail_nth.get(op).is_some_and(|set| set.contains(&count));
        if failing {
            return Err(ApiError::new(Some(500), format!("injected failure in {op}")));
        }
        let mut next_id = state.next_id;
        let data = state.instances.entry(scope.instance.clone()).or_default();
        let result = f(data, &mut next_id);
        state.next_id = next_id;
        result
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> ApiError {
    ApiError::new(Some(404), format!("{what} {id} not found"))
}

/// Insert or replace by id; ids ≤ 0 or unknown ids get a fresh one.
fn upsert_by_id<T: Clone>(
    items: &mut Vec<T>,
    mut value: T,
    next_id: &mut i64,
    get_id: fn(&T) -> i64,
    set_id: fn(&mut T, i64),
) -> T {
    let id = get_id(&value);
    if id > 0 {
        if let Some(existing) = items.iter_mut().find(|x| get_id(x) == id) {
            *existing = value.clone();
            return value;
        }
    }
    *next_id += 1;
    set_id(&mut value, *next_id);
    items.push(value.clone());
    value
}

impl RemoteClient for FakeCms {
    async fn list_galleries(&self, scope: &InstanceScope) -> ApiResult<Vec<Gallery>> {
        self.call("list_galleries", scope, |d, _| Ok(d.galleries.clone()))
    }

    async fn save_gallery(&self, scope: &InstanceScope, gallery: &Gallery) -> ApiResult<Gallery> {
        self.call("save_gallery", scope, |d, next| {
            Ok(upsert_by_id(&mut d.galleries, gallery.clone(), next, |g| g.id, |g, id| g.id = id))
        })
    }

    async fn list_assets(&self, scope: &InstanceScope) -> ApiResult<Vec<Asset>> {
        self.call("list_assets", scope, |d, _| Ok(d.assets.clone()))
    }

    async fn save_asset(&self, scope: &InstanceScope, asset: &Asset) -> ApiResult<Asset> {
        let instance = scope.instance.clone();
        self.call("save_asset", scope, |d, next| {
            let mut asset = asset.clone();
            asset.url = format!("https://cdn.test/{instance}/{}", asset.file_name);
            Ok(upsert_by_id(&mut d.assets, asset, next, |a| a.id, |a, id| a.id = id))
        })
    }

    async fn list_models(&self, scope: &InstanceScope) -> ApiResult<Vec<ModelSummary>> {
        self.call("list_models", scope, |d, _| {
            Ok(d.models
                .iter()
                .map(|m| ModelSummary {
                    id: m.id,
                    reference_name: m.reference_name.clone(),
                    display_name: m.display_name.clone(),
                })
                .collect())
        })
    }

    async fn get_model_by_id(&self, scope: &InstanceScope, id: i64) -> ApiResult<Model> {
        self.call("get_model_by_id", scope, |d, _| {
            d.models
                .iter()
                .find(|m| m.id == id)
                .cloned()
                .ok_or_else(|| not_found("model", id))
        })
    }

    async fn save_model(&self, scope: &InstanceScope, model: &Model) -> ApiResult<Model> {
        self.call("save_model", scope, |d, next| {
            Ok(upsert_by_id(&mut d.models, model.clone(), next, |m| m.id, |m, id| m.id = id))
        })
    }

    async fn list_containers(&self, scope: &InstanceScope) -> ApiResult<Vec<ContainerSummary>> {
        self.call("list_containers", scope, |d, _| {
            Ok(d.containers
                .iter()
                .map(|c| ContainerSummary {
                    id: c.id,
                    reference_name: c.reference_name.clone(),
                })
                .collect())
        })
    }

    async fn get_container_by_id(&self, scope: &InstanceScope, id: i64) -> ApiResult<Container> {
        self.call("get_container_by_id", scope, |d, _| {
            d.containers
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| not_found("container", id))
        })
    }

    async fn get_container_by_reference_name(
        &self,
        scope: &InstanceScope,
        reference_name: &str,
    ) -> ApiResult<Option<Container>> {
        self.call("get_container_by_reference_name", scope, |d, _| {
            Ok(d.containers
                .iter()
                .find(|c| c.reference_name.eq_ignore_ascii_case(reference_name))
                .cloned())
        })
    }

    async fn save_container(
        &self,
        scope: &InstanceScope,
        container: &Container,
    ) -> ApiResult<Container> {
        self.call("save_container", scope, |d, next| {
            Ok(upsert_by_id(&mut d.containers, container.clone(), next, |c| c.id, |c, id| c.id = id))
        })
    }

    async fn list_content_items_delta(
        &self,
        scope: &InstanceScope,
        cursor: Option<&SyncToken>,
    ) -> ApiResult<ContentDelta> {
        let page_size = self.delta_page_size;
        self.state
            .lock()
            .unwrap()
            .delta_cursors
            .push(cursor.map(|c| c.as_str().to_string()));
        self.call("list_content_items_delta", scope, |d, _| {
            let start = cursor
                .and_then(|c| c.as_str().parse::<usize>().ok())
                .unwrap_or(0)
                .min(d.content_log.len());
            let end = (start + page_size).min(d.content_log.len());
            Ok(ContentDelta {
                items: d.content_log[start..end].to_vec(),
                next_cursor: SyncToken(end.to_string()),
                has_more: end < d.content_log.len(),
            })
        })
    }

    async fn get_content_item(&self, scope: &InstanceScope, id: i64) -> ApiResult<ContentItem> {
        self.call("get_content_item", scope, |d, _| {
            d.content
                .iter()
                .find(|c| c.id == id)
                .cloned()
                .ok_or_else(|| not_found("content item", id))
        })
    }

    async fn save_content_item(&self, scope: &InstanceScope, item: &ContentItem) -> ApiResult<i64> {
        self.call("save_content_item", scope, |d, next| {
            let saved = upsert_by_id(&mut d.content, item.clone(), next, |c| c.id, |c, id| c.id = id);
            d.content_log.push(saved.clone());
            Ok(saved.id)
        })
    }

    async fn publish_content(&self, scope: &InstanceScope, id: i64) -> ApiResult<()> {
        self.call("publish_content", scope, |d, _| {
            d.published_content.push(id);
            Ok(())
        })
    }

    async fn list_templates(&self, scope: &InstanceScope) -> ApiResult<Vec<TemplateSummary>> {
        self.call("list_templates", scope, |d, _| {
            Ok(d.templates
                .iter()
                .map(|t| TemplateSummary {
                    id: t.id,
                    name: t.name.clone(),
                })
                .collect())
        })
    }

    async fn get_template(&self, scope: &InstanceScope, id: i64) -> ApiResult<Template> {
        self.call("get_template", scope, |d, _| {
            d.templates
                .iter()
                .find(|t| t.id == id)
                .cloned()
                .ok_or_else(|| not_found("template", id))
        })
    }

    async fn save_template(
        &self,
        scope: &InstanceScope,
        template: &Template,
    ) -> ApiResult<Template> {
        self.call("save_template", scope, |d, next| {
            Ok(upsert_by_id(&mut d.templates, template.clone(), next, |t| t.id, |t, id| t.id = id))
        })
    }

    async fn list_page_references(
        &self,
        scope: &InstanceScope,
        _channel: &str,
    ) -> ApiResult<Vec<PageRef>> {
        self.call("list_page_references", scope, |d, _| Ok(d.sitemap.clone()))
    }

    async fn get_page(&self, scope: &InstanceScope, id: i64) -> ApiResult<Page> {
        self.call("get_page", scope, |d, _| {
            d.pages
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| not_found("page", id))
        })
    }

    async fn save_page(&self, scope: &InstanceScope, page: &Page) -> ApiResult<i64> {
        self.call("save_page", scope, |d, next| {
            let saved = upsert_by_id(&mut d.pages, page.clone(), next, |p| p.id, |p, id| p.id = id);
            if !d.sitemap.iter().any(|r| r.page_id == saved.id) {
                d.sitemap.push(PageRef {
                    page_id: saved.id,
                    path: saved.path.clone(),
                });
            }
            Ok(saved.id)
        })
    }

    async fn publish_page(&self, scope: &InstanceScope, id: i64) -> ApiResult<()> {
        self.call("publish_page", scope, |d, _| {
            d.published_pages.push(id);
            Ok(())
        })
    }
}
