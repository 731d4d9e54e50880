//! Remote management API client.
//!
//! The [`RemoteClient`] trait is the seam between orchestration and the
//! network: one method per logical operation, each one request/response.
//! [`HttpClient`] is the reqwest-backed implementation used by the binary.
//!
//! The trait uses `impl Future` returns so orchestrators stay generic over the
//! client without boxing every call.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use std::future::Future;

use crate::model::{
    Asset, Container, ContainerSummary, ContentDelta, ContentItem, Gallery, Model, ModelSummary,
    Page, PageRef, SyncToken, Template, TemplateSummary,
};

pub use http::{HttpClient, HttpClientConfig};

/// Typed failure from the remote API.
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status, if a response was received.
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Rate limiting, server errors and transport failures may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self.status {
            None => true,
            Some(code) => code == 429 || code >= 500,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status == Some(404)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(code) => write!(f, "HTTP {code}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Result type for remote calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Which instance (and, for localized kinds, which locale and mode) a call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceScope {
    pub instance: String,
    pub locale: String,
    pub preview: bool,
}

impl InstanceScope {
    #[must_use]
    pub fn new(instance: impl Into<String>, locale: impl Into<String>, preview: bool) -> Self {
        Self {
            instance: instance.into(),
            locale: locale.into(),
            preview,
        }
    }
}

/// Management API operations consumed by the pull and push pipelines.
///
/// Implementations are called from a single task, strictly one request at a
/// time, and must not assume any ordering beyond that.
pub trait RemoteClient: Send + Sync {
    // Galleries
    fn list_galleries(&self, scope: &InstanceScope)
    -> impl Future<Output = ApiResult<Vec<Gallery>>> + Send;
    fn save_gallery(
        &self,
        scope: &InstanceScope,
        gallery: &Gallery,
    ) -> impl Future<Output = ApiResult<Gallery>> + Send;

    // Assets
    fn list_assets(&self, scope: &InstanceScope)
    -> impl Future<Output = ApiResult<Vec<Asset>>> + Send;
    fn save_asset(
        &self,
        scope: &InstanceScope,
        asset: &Asset,
    ) -> impl Future<Output = ApiResult<Asset>> + Send;

    // Models
    fn list_models(
        &self,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<ModelSummary>>> + Send;
    fn get_model_by_id(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<Model>> + Send;
    fn save_model(
        &self,
        scope: &InstanceScope,
        model: &Model,
    ) -> impl Future<Output = ApiResult<Model>> + Send;

    // Containers
    fn list_containers(
        &self,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<ContainerSummary>>> + Send;
    fn get_container_by_id(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<Container>> + Send;
    /// `Ok(None)` when no container with that reference name exists.
    fn get_container_by_reference_name(
        &self,
        scope: &InstanceScope,
        reference_name: &str,
    ) -> impl Future<Output = ApiResult<Option<Container>>> + Send;
    fn save_container(
        &self,
        scope: &InstanceScope,
        container: &Container,
    ) -> impl Future<Output = ApiResult<Container>> + Send;

    // Content
    fn list_content_items_delta(
        &self,
        scope: &InstanceScope,
        cursor: Option<&SyncToken>,
    ) -> impl Future<Output = ApiResult<ContentDelta>> + Send;
    fn get_content_item(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<ContentItem>> + Send;
    /// Create (id ≤ 0) or update an item; returns the target id.
    fn save_content_item(
        &self,
        scope: &InstanceScope,
        item: &ContentItem,
    ) -> impl Future<Output = ApiResult<i64>> + Send;
    fn publish_content(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<()>> + Send;

    // Templates
    fn list_templates(
        &self,
        scope: &InstanceScope,
    ) -> impl Future<Output = ApiResult<Vec<TemplateSummary>>> + Send;
    fn get_template(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<Template>> + Send;
    fn save_template(
        &self,
        scope: &InstanceScope,
        template: &Template,
    ) -> impl Future<Output = ApiResult<Template>> + Send;

    // Pages
    fn list_page_references(
        &self,
        scope: &InstanceScope,
        channel: &str,
    ) -> impl Future<Output = ApiResult<Vec<PageRef>>> + Send;
    fn get_page(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<Page>> + Send;
    /// Create (id ≤ 0) or update a page; returns the target id.
    fn save_page(
        &self,
        scope: &InstanceScope,
        page: &Page,
    ) -> impl Future<Output = ApiResult<i64>> + Send;
    fn publish_page(
        &self,
        scope: &InstanceScope,
        id: i64,
    ) -> impl Future<Output = ApiResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        assert_eq!(ApiError::new(Some(500), "boom").to_string(), "HTTP 500: boom");
        assert_eq!(ApiError::new(None, "refused").to_string(), "refused");
    }

    #[test]
    fn test_api_error_transient() {
        assert!(ApiError::new(None, "timeout").is_transient());
        assert!(ApiError::new(Some(429), "slow down").is_transient());
        assert!(ApiError::new(Some(503), "busy").is_transient());
        assert!(!ApiError::new(Some(404), "gone").is_transient());
        assert!(ApiError::new(Some(404), "gone").is_not_found());
    }
}
