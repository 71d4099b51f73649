use std::time::Duration;

use async_trait::async_trait;
use codsync_core::config::HttpConfig;
use codsync_core::error::AppError;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::time::sleep;

/// Interface for JSON GETs against external services.
///
/// Discovery never needs more than "fetch this URL, give me the document",
/// so the whole network surface hides behind this trait and tests run
/// against canned documents.
#[async_trait]
pub trait JsonFetch: Send + Sync {
    /// Fetches `url` and parses the response body as JSON.
    ///
    /// # Errors
    ///
    /// Every failure - network, HTTP status, unreadable body - is a
    /// transport-kind error ([`AppError::is_transport`] returns true).
    async fn fetch_json(&self, url: &str) -> Result<Value, AppError>;
}

/// reqwest-backed [`JsonFetch`] with automatic retry on transient failures.
///
/// # Examples
///
/// ```no_run
/// use codsync_client::{HttpFetcher, JsonFetch};
/// use codsync_core::config::HttpConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let fetcher = HttpFetcher::new(&HttpConfig::default())?;
/// let doc = fetcher
///     .fetch_json("https://gistmaps.itos.uga.edu/arcgis/rest/services/COD_External?f=pjson")
///     .await?;
/// println!("catalog: {doc}");
/// # Ok(())
/// # }
/// ```
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_base_delay: Duration,
    timeout_secs: u64,
}

impl HttpFetcher {
    /// Creates a fetcher from the shared HTTP configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(config: &HttpConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent("codsync/0.1 (cod-service-sync)")
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    /// Makes an HTTP GET request with retry and backoff on:
    /// - Network errors
    /// - Timeouts
    /// - Server errors (5xx)
    /// - Rate limiting (429)
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, AppError> {
        let mut last_error = AppError::Generic("No attempts made".to_string());
        let base_delay_ms = self.retry_base_delay.as_millis() as u64;

        for attempt in 1..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(resp) => {
                    let status = resp.status();

                    // Success
                    if status.is_success() {
                        return Ok(resp);
                    }

                    // Rate limited - retry with exponential backoff
                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::RateLimitExceeded;
                        if attempt < self.max_retries {
                            let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempt));
                            sleep(delay).await;
                            continue;
                        }
                    }

                    // Server error - retry
                    if status.is_server_error() {
                        last_error =
                            AppError::ClientError(format!("Server error: HTTP {}", status.as_u16()));
                        if attempt < self.max_retries {
                            let delay = Duration::from_millis(base_delay_ms * attempt as u64);
                            sleep(delay).await;
                            continue;
                        }
                    }

                    // Client error (4xx except 429) - don't retry
                    return Err(AppError::ClientError(format!(
                        "HTTP {} from {}",
                        status.as_u16(),
                        url
                    )));
                }
                Err(e) => {
                    // Network/timeout errors - retry
                    if e.is_timeout() {
                        last_error = AppError::Timeout(self.timeout_secs);
                    } else if e.is_connect() {
                        last_error = AppError::NetworkError(format!("Connection failed: {}", e));
                    } else {
                        last_error = AppError::ClientError(e.to_string());
                    }

                    if attempt < self.max_retries && (e.is_timeout() || e.is_connect()) {
                        let delay = Duration::from_millis(base_delay_ms * attempt as u64);
                        sleep(delay).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl JsonFetch for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, AppError> {
        let resp = self.get_with_retry(url).await?;
        resp.json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;

    use super::*;

    /// Canned-response fetcher; URLs without a canned document fail with a
    /// transport error, like an endpoint that is not published.
    pub(crate) struct StubFetch {
        responses: HashMap<String, Value>,
    }

    impl StubFetch {
        pub(crate) fn new() -> Self {
            Self {
                responses: HashMap::new(),
            }
        }

        pub(crate) fn with(mut self, url: &str, document: Value) -> Self {
            self.responses.insert(url.to_string(), document);
            self
        }
    }

    #[async_trait]
    impl JsonFetch for StubFetch {
        async fn fetch_json(&self, url: &str) -> Result<Value, AppError> {
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| AppError::NetworkError(format!("no route to {url}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StubFetch;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_fetcher() {
        let result = HttpFetcher::new(&HttpConfig::default());
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stub_fetch_returns_canned_document() {
        let fetch = StubFetch::new().with("https://example.org/a.json", json!({"ok": true}));

        let doc = fetch.fetch_json("https://example.org/a.json").await.unwrap();
        assert_eq!(doc["ok"], json!(true));
    }

    #[tokio::test]
    async fn test_stub_fetch_fails_with_transport_error() {
        let fetch = StubFetch::new();
        let err = fetch
            .fetch_json("https://example.org/missing.json")
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
