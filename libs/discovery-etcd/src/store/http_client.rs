//! etcd v2 keys API client over hyper.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};

use super::EtcdKeysApi;
use super::error::{EtcdErrorBody, StoreError};
use super::types::Response;

const KEYS_PREFIX: &str = "/v2/keys";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const BODY_PREVIEW_LIMIT: usize = 256;

/// Builder for [`EtcdHttpClient`].
#[derive(Debug, Clone, Default)]
pub struct EtcdHttpClientBuilder {
    endpoints: Vec<String>,
    request_timeout: Option<Duration>,
    pool_idle_timeout: Option<Duration>,
}

impl EtcdHttpClientBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a cluster member, e.g. `http://127.0.0.1:2379`.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    #[must_use]
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints.extend(endpoints.into_iter().map(Into::into));
        self
    }

    /// Bounds one request/response exchange with a single endpoint.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Validates the endpoints and builds the client.
    ///
    /// # Errors
    /// Returns [`StoreError::NoEndpoints`] when no endpoint was given and
    /// [`StoreError::InvalidEndpoint`] for anything that is not an absolute `http://` URL.
    pub fn build(self) -> Result<EtcdHttpClient, StoreError> {
        if self.endpoints.is_empty() {
            return Err(StoreError::NoEndpoints);
        }

        let endpoints = self
            .endpoints
            .iter()
            .map(String::as_str)
            .map(validate_endpoint)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        if let Some(idle) = self.pool_idle_timeout {
            builder.pool_idle_timeout(idle);
        }

        tracing::debug!(?endpoints, "etcd http client configured");

        Ok(EtcdHttpClient {
            client: builder.build_http(),
            endpoints,
            request_timeout: self.request_timeout,
        })
    }
}

fn validate_endpoint(endpoint: &str) -> Result<String, StoreError> {
    let invalid = |reason: &str| StoreError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
        reason: reason.to_owned(),
    };

    let uri: Uri = endpoint.parse().map_err(|_| invalid("not a valid URL"))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(_) => return Err(invalid("only http:// endpoints are supported")),
        None => return Err(invalid("missing scheme")),
    }
    if uri.authority().is_none() {
        return Err(invalid("missing host"));
    }

    Ok(endpoint.trim_end_matches('/').to_owned())
}

/// Path of `key` under the keys API, with each segment percent-encoded.
fn keys_path(key: &str) -> String {
    let mut path = String::from(KEYS_PREFIX);
    for segment in key.split('/').filter(|s| !s.is_empty()) {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    path
}

fn decode_response(status: StatusCode, body: &[u8]) -> Result<Response, StoreError> {
    if status.is_success() {
        return serde_json::from_slice(body).map_err(StoreError::InvalidResponse);
    }

    if let Ok(etcd_err) = serde_json::from_slice::<EtcdErrorBody>(body) {
        return Err(etcd_err.into());
    }

    let preview = &body[..body.len().min(BODY_PREVIEW_LIMIT)];
    Err(StoreError::UnexpectedStatus {
        status,
        body_preview: String::from_utf8_lossy(preview).into_owned(),
    })
}

/// HTTP client for the etcd v2 keys API.
///
/// Each call goes to the first endpoint; the next one is used only when the
/// previous endpoint fails at the transport level or times out. Errors reported
/// by etcd itself are returned as-is.
#[derive(Clone)]
pub struct EtcdHttpClient {
    client: Client<HttpConnector, Full<Bytes>>,
    endpoints: Vec<String>,
    request_timeout: Option<Duration>,
}

impl std::fmt::Debug for EtcdHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdHttpClient")
            .field("endpoints", &self.endpoints)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl EtcdHttpClient {
    #[must_use]
    pub fn builder() -> EtcdHttpClientBuilder {
        EtcdHttpClientBuilder::new()
    }

    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    async fn execute(
        &self,
        method: &Method,
        path_and_query: &str,
        form: Option<&str>,
    ) -> Result<Response, StoreError> {
        let mut last_err = StoreError::NoEndpoints;

        for endpoint in &self.endpoints {
            match self.execute_on(endpoint, method, path_and_query, form).await {
                Err(err) if err.is_transport() => {
                    tracing::warn!(
                        endpoint = %endpoint,
                        error = %err,
                        "etcd endpoint unavailable"
                    );
                    last_err = err;
                }
                result => return result,
            }
        }

        Err(last_err)
    }

    async fn execute_on(
        &self,
        endpoint: &str,
        method: &Method,
        path_and_query: &str,
        form: Option<&str>,
    ) -> Result<Response, StoreError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(format!("{endpoint}{path_and_query}"));
        let body = match form {
            Some(form) => {
                builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
                Full::new(Bytes::from(form.to_owned()))
            }
            None => Full::new(Bytes::new()),
        };
        let request = builder
            .body(body)
            .map_err(|e| StoreError::InvalidRequest(Box::new(e)))?;

        let exchange = async {
            let response = self
                .client
                .request(request)
                .await
                .map_err(|e| StoreError::Transport(Box::new(e)))?;
            let status = response.status();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| StoreError::Transport(Box::new(e)))?
                .to_bytes();
            Ok::<_, StoreError>((status, body))
        };

        let (status, body) = match self.request_timeout {
            Some(timeout) => tokio::time::timeout(timeout, exchange)
                .await
                .map_err(|_| StoreError::Timeout(timeout))??,
            None => exchange.await?,
        };

        tracing::trace!(%endpoint, %method, path = %path_and_query, %status, "etcd response");
        decode_response(status, &body)
    }
}

#[async_trait]
impl EtcdKeysApi for EtcdHttpClient {
    async fn set(&self, key: &str, value: &str, ttl: u64) -> Result<Response, StoreError> {
        let mut fields = vec![("value", value.to_owned())];
        if ttl > 0 {
            fields.push(("ttl", ttl.to_string()));
        }
        let form = serde_urlencoded::to_string(&fields)
            .map_err(|e| StoreError::InvalidRequest(Box::new(e)))?;

        self.execute(&Method::PUT, &keys_path(key), Some(&form))
            .await
    }

    async fn get(&self, key: &str, sort: bool, recursive: bool) -> Result<Response, StoreError> {
        let path = format!("{}?recursive={recursive}&sorted={sort}", keys_path(key));
        self.execute(&Method::GET, &path, None).await
    }
}
