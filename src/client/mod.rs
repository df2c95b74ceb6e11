//! HTTP clients for the two CMS APIs.
//!
//! The delivery API (content listing) and the management API (asset
//! listings, component schemas) share one request core: paginated GETs
//! with retry on flaky statuses. They differ only in base URL and auth
//! mechanism (query-string token vs bearer header), so both concrete
//! clients are thin wrappers over [`ApiClient`].

pub mod delivery;
pub mod management;

pub use delivery::DeliveryClient;
pub use management::ManagementClient;

use std::future::Future;
use std::time::Duration;

use reqwest::Method;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Items requested per page. The fetch loop stops on the first batch
/// smaller than this, never on a reported total count.
pub const PER_PAGE: usize = 100;

/// Errors from the API layer. Any of these aborts the whole audit run;
/// nothing downstream of a failed fetch runs.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} still failing after {attempts} attempts (last: HTTP {status}): {body}")]
    RetriesExhausted {
        endpoint: String,
        attempts: u32,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned an unexpected payload: {detail}")]
    Shape { endpoint: String, detail: String },
}

/// Retry schedule for HTTP 429 and 5xx responses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub max_retries: u32,

    /// Delay before the first retry; doubles on every further retry.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay_ms: 400,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-indexed).
    ///
    /// With the defaults this yields 400, 800, 1600, 3200 ms.
    pub fn delay_for(&self, retry: u32) -> Duration {
        Duration::from_millis(self.base_delay_ms << retry)
    }

    /// Rate limits and server errors are worth retrying; anything else
    /// fails immediately.
    pub fn is_retryable(status: u16) -> bool {
        status == 429 || (500..=599).contains(&status)
    }
}

/// How a request authenticates.
pub enum ApiAuth {
    /// `Authorization: Bearer <token>` header (management API).
    Bearer(String),

    /// `token=<token>` query parameter (delivery API).
    QueryToken(String),
}

/// Shared request core used by both concrete clients.
pub struct ApiClient {
    base_url: String,
    auth: ApiAuth,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, auth: ApiAuth) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            retry: RetryPolicy::default(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET a JSON payload.
    pub async fn get_json(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Value, RequestError> {
        let response = self.execute(Method::GET, path, params).await?;
        response
            .json()
            .await
            .map_err(|source| RequestError::Transport {
                endpoint: self.url(path),
                source,
            })
    }

    /// DELETE a resource; the response body is ignored.
    pub async fn delete(&self, path: &str) -> Result<(), RequestError> {
        self.execute(Method::DELETE, path, &[]).await?;
        Ok(())
    }

    /// Fetch every page of a listing endpoint and merge the item arrays,
    /// in page order.
    pub async fn fetch_all_pages(
        &self,
        path: &str,
        base_params: &[(String, String)],
        items_field: &str,
    ) -> Result<Vec<Value>, RequestError> {
        collect_pages(PER_PAGE, |page| {
            let mut params = base_params.to_vec();
            params.push(("per_page".to_string(), PER_PAGE.to_string()));
            params.push(("page".to_string(), page.to_string()));

            async move {
                let payload = self.get_json(path, &params).await?;
                let items = payload
                    .get(items_field)
                    .and_then(Value::as_array)
                    .ok_or_else(|| RequestError::Shape {
                        endpoint: self.url(path),
                        detail: format!("missing '{}' array", items_field),
                    })?;
                debug!(endpoint = %path, page, count = items.len(), "Fetched page");
                Ok(items.clone())
            }
        })
        .await
    }

    /// Issue one request, retrying per the policy on 429/5xx.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::Response, RequestError> {
        let url = self.url(path);
        let mut retry = 0u32;

        loop {
            let response = self.send(method.clone(), &url, params).await?;
            if response.status().is_success() {
                return Ok(response);
            }

            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();

            if !RetryPolicy::is_retryable(status) {
                return Err(RequestError::Status {
                    endpoint: url,
                    status,
                    body,
                });
            }
            if retry >= self.retry.max_retries {
                return Err(RequestError::RetriesExhausted {
                    endpoint: url,
                    attempts: retry + 1,
                    status,
                    body,
                });
            }

            let delay = self.retry.delay_for(retry);
            warn!(
                endpoint = %url,
                status,
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                "Retrying flaky response"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        params: &[(String, String)],
    ) -> Result<reqwest::Response, RequestError> {
        let mut request = self.client.request(method, url).query(params);
        request = match &self.auth {
            ApiAuth::Bearer(token) => request.bearer_auth(token),
            ApiAuth::QueryToken(token) => request.query(&[("token", token.as_str())]),
        };

        request
            .send()
            .await
            .map_err(|source| RequestError::Transport {
                endpoint: url.to_string(),
                source,
            })
    }
}

/// Drain a paginated listing. `page` counts up from 1 and the loop ends on
/// the first batch strictly smaller than `per_page`.
pub async fn collect_pages<T, F, Fut>(
    per_page: usize,
    mut fetch_page: F,
) -> Result<Vec<T>, RequestError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Vec<T>, RequestError>>,
{
    let mut items = Vec::new();
    let mut page = 1u32;

    loop {
        let batch = fetch_page(page).await?;
        let batch_len = batch.len();
        items.extend(batch);
        if batch_len < per_page {
            return Ok(items);
        }
        page += 1;
    }
}
