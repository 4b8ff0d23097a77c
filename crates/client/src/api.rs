//! REST client for the product backend.
//!
//! Wraps the meta-object, aggregation, dashboard and published-widget
//! endpoints using [`reqwest`]. Every response body is handed back as a
//! [`RawPayload`]; shape normalization happens in `painel-core`.

use std::sync::Arc;
use std::time::Duration;

use painel_core::dashboard::Dashboard;
use painel_core::services::AggregationRequest;
use painel_core::types::Row;
use painel_core::RawPayload;
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::credentials::CredentialsProvider;
use crate::error::ClientError;

/// Header carrying the tenant identifier on multi-tenant deployments.
pub const TENANT_HEADER: &str = "X-Tenant-Id";

/// HTTP client for one backend deployment.
pub struct PainelApi {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialsProvider>,
    tenant_id: Option<String>,
    meta_objects_path: String,
    aggregation_path: String,
}

impl std::fmt::Debug for PainelApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PainelApi")
            .field("base_url", &self.base_url)
            .field("tenant_id", &self.tenant_id)
            .field("meta_objects_path", &self.meta_objects_path)
            .field("aggregation_path", &self.aggregation_path)
            .finish_non_exhaustive()
    }
}

impl PainelApi {
    /// Create a client with its own connection pool and the configured
    /// request timeout.
    pub fn new(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Self::with_client(client, config, credentials)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        config: &ClientConfig,
        credentials: Arc<dyn CredentialsProvider>,
    ) -> Result<Self, ClientError> {
        let base_url = Url::parse(&config.api_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", config.api_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(config.api_url.clone()));
        }

        Ok(Self {
            client,
            base_url,
            credentials,
            tenant_id: config.tenant_id.clone(),
            meta_objects_path: config.meta_objects_path.clone(),
            aggregation_path: config.aggregation_path.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the meta-object list from the configured path.
    pub async fn fetch_meta_objects(&self) -> Result<RawPayload, ClientError> {
        let url = self.endpoint(path_segments(&self.meta_objects_path))?;
        let response = self.request(Method::GET, url).send().await?;
        Self::parse_response(response).await
    }

    /// Run an aggregation query. Sends
    /// `{objectId, groupBy, aggregate, aggregateField}` and reads the
    /// result rows from whatever envelope the backend uses.
    pub async fn aggregate(&self, query: &AggregationRequest) -> Result<Vec<Row>, ClientError> {
        let url = self.endpoint(path_segments(&self.aggregation_path))?;
        let payload = self.send_json(Method::POST, url, query).await?;
        let rows = payload.into_rows();

        tracing::debug!(
            object_id = %query.object_id,
            group_by = %query.group_by,
            rows = rows.len(),
            "Aggregation query returned",
        );
        Ok(rows)
    }

    /// `GET /dashboards/{id}`
    pub async fn load_dashboard(&self, id: &str) -> Result<RawPayload, ClientError> {
        let url = self.endpoint(["dashboards", id])?;
        let response = self.request(Method::GET, url).send().await?;
        Self::parse_response(response).await
    }

    /// `POST /dashboards`
    pub async fn create_dashboard(&self, dashboard: &Dashboard) -> Result<RawPayload, ClientError> {
        let url = self.endpoint(["dashboards"])?;
        self.send_json(Method::POST, url, dashboard).await
    }

    /// `PUT /dashboards/{id}`
    pub async fn update_dashboard(
        &self,
        id: &str,
        dashboard: &Dashboard,
    ) -> Result<RawPayload, ClientError> {
        let url = self.endpoint(["dashboards", id])?;
        self.send_json(Method::PUT, url, dashboard).await
    }

    /// `GET /widgets/target/{target}`
    pub async fn widgets_for_target(&self, target: &str) -> Result<RawPayload, ClientError> {
        let url = self.endpoint(["widgets", "target", target])?;
        let response = self.request(Method::GET, url).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Append percent-encoded path segments to the base URL.
    fn endpoint<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request carrying the current bearer token and tenant header.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!(method = %method, url = %url, "Sending backend request");

        let mut request = self.client.request(method, url);
        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token);
        }
        if let Some(tenant_id) = &self.tenant_id {
            request = request.header(TENANT_HEADER, tenant_id.as_str());
        }
        request
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
    ) -> Result<RawPayload, ClientError> {
        let response = self.request(method, url).json(body).send().await?;
        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ClientError::Api`] containing
    /// the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), "Backend request failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read a successful response body as JSON.
    ///
    /// An empty or non-JSON body becomes `null`, which every normalizer
    /// treats as "nothing usable".
    async fn parse_response(response: reqwest::Response) -> Result<RawPayload, ClientError> {
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(RawPayload::new(Value::Null));
        }

        let value = serde_json::from_str(&body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Backend returned a non-JSON body");
            Value::Null
        });
        Ok(RawPayload::new(value))
    }
}

/// Split a configured relative path such as `queries/aggregate` into
/// segments, so slashes are not percent-encoded.
fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}
