//! Backend client implementation

use crate::errors::BackendError;
use crate::query::Query;
use crate::response::RemoteResponse;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value as JsonValue;
use spotter_config::{BackendConfig, Validatable};
use spotter_core::RemoteError;
use tracing::{debug, info, warn};
use url::Url;

/// Client for the hosted backend.
///
/// Every method resolves to a [`RemoteResponse`]; failures are reported in
/// its `error` field rather than as `Err`.
#[async_trait::async_trait]
pub trait BackendClient: Send + Sync {
    /// Read rows from `table`
    async fn select(&self, table: &str, query: &Query) -> RemoteResponse<JsonValue>;

    /// Call a stored procedure with named JSON arguments
    async fn rpc(&self, function: &str, args: &JsonValue) -> RemoteResponse<JsonValue>;
}

/// [`BackendClient`] speaking PostgREST over HTTP
#[derive(Debug, Clone)]
pub struct RestBackendClient {
    client: Client,
    base_url: Url,
    schema: String,
}

impl RestBackendClient {
    /// Create a client from validated configuration
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        config.validate()?;

        let mut base_url = Url::parse(&config.url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let base_url = base_url.join("rest/v1/")?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(ref key) = config.api_key {
            let apikey =
                HeaderValue::from_str(key).map_err(|_| BackendError::InvalidHeader("apikey"))?;
            let bearer = HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| BackendError::InvalidHeader("authorization"))?;
            headers.insert("apikey", apikey);
            headers.insert(AUTHORIZATION, bearer);
        }

        debug!(
            "Creating backend client for {} with {}s timeout",
            base_url,
            config.request_timeout.as_secs()
        );

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url,
            schema: config.schema.clone(),
        })
    }

    /// Base URL of the REST layer, ending in `/rest/v1/`
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full request URL for a select on `table`
    pub fn table_url(&self, table: &str, query: &Query) -> Result<Url, BackendError> {
        validate_identifier(table)?;

        let mut url = self.base_url.join(table)?;
        url.query_pairs_mut().extend_pairs(query.to_pairs());
        Ok(url)
    }

    fn rpc_url(&self, function: &str) -> Result<Url, BackendError> {
        validate_identifier(function)?;
        Ok(self.base_url.join("rpc/")?.join(function)?)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> RemoteResponse<JsonValue> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Backend request failed before a response: {}", e);
                return RemoteResponse::failure(transport_error(&e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return RemoteResponse::failure(transport_error(&e).with_status(status.as_u16())),
        };

        if !status.is_success() {
            info!("Backend responded with {}", status);
            return RemoteResponse::failure(error_from_body(status, &body));
        }

        if body.trim().is_empty() {
            return RemoteResponse::empty();
        }

        match serde_json::from_str(&body) {
            Ok(data) => RemoteResponse::success(data),
            Err(e) => RemoteResponse::failure(
                RemoteError::new(format!("Invalid JSON in response: {}", e))
                    .with_code("PARSE_ERROR")
                    .with_status(status.as_u16()),
            ),
        }
    }
}

#[async_trait::async_trait]
impl BackendClient for RestBackendClient {
    async fn select(&self, table: &str, query: &Query) -> RemoteResponse<JsonValue> {
        let url = match self.table_url(table, query) {
            Ok(url) => url,
            Err(e) => return RemoteResponse::failure(invalid_request(e)),
        };

        debug!("GET {}", url);
        let request = self
            .client
            .get(url)
            .header("Accept-Profile", self.schema.as_str());
        self.send(request).await
    }

    async fn rpc(&self, function: &str, args: &JsonValue) -> RemoteResponse<JsonValue> {
        let url = match self.rpc_url(function) {
            Ok(url) => url,
            Err(e) => return RemoteResponse::failure(invalid_request(e)),
        };

        debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .header("Content-Profile", self.schema.as_str())
            .header(CONTENT_TYPE, "application/json")
            .json(args);
        self.send(request).await
    }
}

fn validate_identifier(name: &str) -> Result<(), BackendError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(BackendError::InvalidTable(name.to_string()))
    }
}

fn invalid_request(error: BackendError) -> RemoteError {
    RemoteError::new(error.to_string()).with_code("INVALID_REQUEST")
}

/// The request never produced a response
fn transport_error(error: &reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::new(format!("Request timeout: {}", error)).with_code("TIMEOUT")
    } else {
        RemoteError::new(format!("Failed to fetch: {}", error)).with_code("FETCH_ERROR")
    }
}

/// Parse a PostgREST error body, falling back to the raw text
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> RemoteError {
    let fallback = || {
        let text = body.trim();
        if text.is_empty() {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        } else {
            text.to_string()
        }
    };

    let mut error = match serde_json::from_str::<RemoteError>(body) {
        Ok(error) if !error.message.trim().is_empty() => error,
        _ => RemoteError::new(fallback()),
    };
    error.status = Some(status.as_u16());
    error
}
