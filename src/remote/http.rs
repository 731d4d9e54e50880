//! reqwest-backed management API client.
//!
//! Every call carries a bearer token. Transient failures (HTTP 429, 5xx and
//! transport errors) are retried a bounded number of times with linear
//! backoff; anything else is returned immediately as an [`ApiError`].

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{ApiError, ApiResult, InstanceScope, RemoteClient};
use crate::model::{
    Asset, Container, ContainerSummary, ContentDelta, ContentItem, Gallery, Model, ModelSummary,
    Page, PageRef, SyncToken, Template, TemplateSummary,
};

/// Connection settings for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// API root, e.g. `https://mgmt.cms.example.com/api/v1`.
    pub base_url: String,
    pub token: String,
    /// Total attempts per call, including the first one.
    pub max_attempts: u32,
    /// Delay multiplied by the attempt number between retries.
    pub retry_backoff: Duration,
    pub timeout: Duration,
}

impl HttpClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Management API client over HTTPS.
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

/// Response body of create/update calls that only return the id.
#[derive(Debug, Deserialize)]
struct SavedId {
    id: i64,
}

impl HttpClient {
    /// Build a client for the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new(config: HttpClientConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cms-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::new(None, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn instance_url(&self, scope: &InstanceScope, path: &str) -> String {
        format!("{}/instance/{}/{path}", self.config.base_url, scope.instance)
    }

    fn locale_url(&self, scope: &InstanceScope, path: &str) -> String {
        format!(
            "{}/instance/{}/{}/{path}",
            self.config.base_url, scope.instance, scope.locale
        )
    }

    /// Send a request, retrying transient failures.
    async fn send(&self, build: impl Fn() -> RequestBuilder + Send + Sync) -> ApiResult<Response> {
        let mut attempt: u32 = 1;
        loop {
            let err = match build().bearer_auth(&self.config.token).send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let message = if body.trim().is_empty() {
                        status.canonical_reason().unwrap_or("request failed").to_string()
                    } else {
                        body
                    };
                    ApiError::new(Some(status.as_u16()), message)
                }
                Err(e) => ApiError::new(e.status().map(|s| s.as_u16()), e.to_string()),
            };

            if !err.is_transient() || attempt >= self.config.max_attempts {
                return Err(err);
            }

            debug!(attempt, error = %err, "Retrying remote call");
            tokio::time::sleep(self.config.retry_backoff * attempt).await;
            attempt += 1;
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        trace!(url, ?query, "GET");
        let response = self.send(|| self.client.get(url).query(query)).await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        trace!(url, "POST");
        let response = self.send(|| self.client.post(url).json(body)).await?;
        decode(response).await
    }

    async fn post_empty(&self, url: &str) -> ApiResult<()> {
        trace!(url, "POST");
        self.send(|| self.client.post(url)).await.map(|_| ())
    }
}

/// `preview=true|false` query pair for locale-scoped reads.
fn preview_param(scope: &InstanceScope) -> (&'static str, &'static str) {
    ("preview", if scope.preview { "true" } else { "false" })
}

/// Append `segment` to `url` as one percent-encoded path segment.
fn push_segment(url: &str, segment: &str) -> ApiResult<String> {
    let mut url =
        Url::parse(url).map_err(|e| ApiError::new(None, format!("Invalid URL {url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| ApiError::new(None, "URL cannot take a path segment"))?
        .push(segment);
    Ok(url.into())
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status().as_u16();
    response
        .json()
        .await
        .map_err(|e| ApiError::new(Some(status), format!("Failed to parse response: {e}")))
}

impl RemoteClient for HttpClient {
    async fn list_galleries(&self, scope: &InstanceScope) -> ApiResult<Vec<Gallery>> {
        self.get_json(&self.instance_url(scope, "galleries"), &[]).await
    }

    async fn save_gallery(&self, scope: &InstanceScope, gallery: &Gallery) -> ApiResult<Gallery> {
        self.post_json(&self.instance_url(scope, "galleries"), gallery)
            .await
    }

    async fn list_assets(&self, scope: &InstanceScope) -> ApiResult<Vec<Asset>> {
        self.get_json(&self.instance_url(scope, "assets"), &[]).await
    }

    async fn save_asset(&self, scope: &InstanceScope, asset: &Asset) -> ApiResult<Asset> {
        self.post_json(&self.instance_url(scope, "assets"), asset).await
    }

    async fn list_models(&self, scope: &InstanceScope) -> ApiResult<Vec<ModelSummary>> {
        self.get_json(&self.instance_url(scope, "models"), &[]).await
    }

    async fn get_model_by_id(&self, scope: &InstanceScope, id: i64) -> ApiResult<Model> {
        self.get_json(&self.instance_url(scope, &format!("models/{id}")), &[])
            .await
    }

    async fn save_model(&self, scope: &InstanceScope, model: &Model) -> ApiResult<Model> {
        self.post_json(&self.instance_url(scope, "models"), model).await
    }

    async fn list_containers(&self, scope: &InstanceScope) -> ApiResult<Vec<ContainerSummary>> {
        self.get_json(&self.instance_url(scope, "containers"), &[])
            .await
    }

    async fn get_container_by_id(&self, scope: &InstanceScope, id: i64) -> ApiResult<Container> {
        self.get_json(&self.instance_url(scope, &format!("containers/{id}")), &[])
            .await
    }

    async fn get_container_by_reference_name(
        &self,
        scope: &InstanceScope,
        reference_name: &str,
    ) -> ApiResult<Option<Container>> {
        let url = push_segment(&self.instance_url(scope, "containers/by-name"), reference_name)?;
        match self.get_json(&url, &[]).await {
            Ok(container) => Ok(Some(container)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn save_container(
        &self,
        scope: &InstanceScope,
        container: &Container,
    ) -> ApiResult<Container> {
        self.post_json(&self.instance_url(scope, "containers"), container)
            .await
    }

    async fn list_content_items_delta(
        &self,
        scope: &InstanceScope,
        cursor: Option<&SyncToken>,
    ) -> ApiResult<ContentDelta> {
        let url = self.locale_url(scope, "content/sync");
        match cursor {
            Some(token) => {
                self.get_json(&url, &[("token", token.as_str()), preview_param(scope)])
                    .await
            }
            None => self.get_json(&url, &[preview_param(scope)]).await,
        }
    }

    async fn get_content_item(&self, scope: &InstanceScope, id: i64) -> ApiResult<ContentItem> {
        self.get_json(
            &self.locale_url(scope, &format!("content/{id}")),
            &[preview_param(scope)],
        )
        .await
    }

    async fn save_content_item(&self, scope: &InstanceScope, item: &ContentItem) -> ApiResult<i64> {
        let saved: SavedId = self
            .post_json(&self.locale_url(scope, "content"), item)
            .await?;
        Ok(saved.id)
    }

    async fn publish_content(&self, scope: &InstanceScope, id: i64) -> ApiResult<()> {
        self.post_empty(&self.locale_url(scope, &format!("content/{id}/publish")))
            .await
    }

    async fn list_templates(&self, scope: &InstanceScope) -> ApiResult<Vec<TemplateSummary>> {
        self.get_json(&self.locale_url(scope, "templates"), &[]).await
    }

    async fn get_template(&self, scope: &InstanceScope, id: i64) -> ApiResult<Template> {
        self.get_json(&self.locale_url(scope, &format!("templates/{id}")), &[])
            .await
    }

    async fn save_template(
        &self,
        scope: &InstanceScope,
        template: &Template,
    ) -> ApiResult<Template> {
        self.post_json(&self.locale_url(scope, "templates"), template)
            .await
    }

    async fn list_page_references(
        &self,
        scope: &InstanceScope,
        channel: &str,
    ) -> ApiResult<Vec<PageRef>> {
        let url = push_segment(&self.locale_url(scope, "sitemap"), channel)?;
        self.get_json(&url, &[preview_param(scope)]).await
    }

    async fn get_page(&self, scope: &InstanceScope, id: i64) -> ApiResult<Page> {
        self.get_json(
            &self.locale_url(scope, &format!("pages/{id}")),
            &[preview_param(scope)],
        )
        .await
    }

    async fn save_page(&self, scope: &InstanceScope, page: &Page) -> ApiResult<i64> {
        let saved: SavedId = self.post_json(&self.locale_url(scope, "pages"), page).await?;
        Ok(saved.id)
    }

    async fn publish_page(&self, scope: &InstanceScope, id: i64) -> ApiResult<()> {
        self.post_empty(&self.locale_url(scope, &format!("pages/{id}/publish")))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const INSTANCE: &str = "3f2b8c9e-1d4a-4e6b-9c1f-7a2d5e8b0c3a";

    fn client_for(server: &MockServer) -> HttpClient {
        let mut config = HttpClientConfig::new(server.uri(), "secret");
        config.retry_backoff = Duration::from_millis(1);
        HttpClient::new(config).unwrap()
    }

    fn scope() -> InstanceScope {
        InstanceScope::new(INSTANCE, "en-us", true)
    }

    #[tokio::test]
    async fn test_list_models_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/models")))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "referenceName": "Post", "displayName": "Post"}
            ])))
            .mount(&server)
            .await;

        let models = client_for(&server).list_models(&scope()).await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].reference_name, "Post");
    }

    #[tokio::test]
    async fn test_retries_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/galleries")))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/galleries")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let galleries = client_for(&server).list_galleries(&scope()).await.unwrap();
        assert!(galleries.is_empty());
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/assets")))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server).list_assets(&scope()).await.unwrap_err();
        assert_eq!(err.status, Some(500));
        assert_eq!(err.message, "down");
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/models/9")))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad id"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .get_model_by_id(&scope(), 9)
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(400));
    }

    #[tokio::test]
    async fn test_container_by_name_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/containers/by-name/posts")))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let container = client_for(&server)
            .get_container_by_reference_name(&scope(), "posts")
            .await
            .unwrap();
        assert!(container.is_none());
    }

    #[tokio::test]
    async fn test_content_delta_passes_cursor_and_mode() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/en-us/content/sync")))
            .and(query_param("token", "77"))
            .and(query_param("preview", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [],
                "nextCursor": "78",
                "hasMore": false
            })))
            .mount(&server)
            .await;

        let delta = client_for(&server)
            .list_content_items_delta(&scope(), Some(&SyncToken("77".into())))
            .await
            .unwrap();
        assert_eq!(delta.next_cursor, SyncToken("78".into()));
        assert!(!delta.has_more);
    }

    #[tokio::test]
    async fn test_content_delta_encodes_opaque_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/en-us/content/sync")))
            .and(query_param("token", "a+b&c=d#e"))
            .and(query_param("preview", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [],
                "nextCursor": "f/g=",
                "hasMore": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let delta = client_for(&server)
            .list_content_items_delta(&scope(), Some(&SyncToken("a+b&c=d#e".into())))
            .await
            .unwrap();
        assert_eq!(delta.next_cursor, SyncToken("f/g=".into()));
    }

    #[tokio::test]
    async fn test_full_delta_sends_no_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/instance/{INSTANCE}/en-us/content/sync")))
            .and(query_param("preview", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [],
                "nextCursor": "1",
                "hasMore": false
            })))
            .mount(&server)
            .await;

        client_for(&server)
            .list_content_items_delta(&scope(), None)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.query_pairs().all(|(k, _)| k != "token"));
    }

    #[tokio::test]
    async fn test_container_reference_name_is_one_path_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!(
                "/instance/{INSTANCE}/containers/by-name/news%2Fposts%20%23archive"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 5,
                "referenceName": "news/posts #archive",
                "modelId": 1,
                "title": "Archive",
                "columns": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let container = client_for(&server)
            .get_container_by_reference_name(&scope(), "news/posts #archive")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(container.id, 5);
    }

    #[tokio::test]
    async fn test_save_content_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/instance/{INSTANCE}/en-us/content")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 501})))
            .mount(&server)
            .await;

        let item = ContentItem {
            id: -1,
            container_reference_name: "posts".into(),
            model_id: 2,
            state: crate::model::ItemState::Staging,
            fields: serde_json::Map::new(),
        };
        let id = client_for(&server)
            .save_content_item(&scope(), &item)
            .await
            .unwrap();
        assert_eq!(id, 501);
    }
}
