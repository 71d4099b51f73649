use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;

use codsync_core::config::HttpConfig;
use codsync_core::error::AppError;
use codsync_core::models::Dataset;

/// Generic wrapper for portal API responses.
///
/// CKAN API reference: <https://docs.ckan.org/en/2.9/api/>
///
/// The portal always returns responses with the structure:
/// ```json
/// {
///     "success": bool,
///     "result": T
/// }
/// ```
#[derive(Deserialize, Debug)]
struct PortalResponse<T> {
    success: bool,
    result: Option<T>,
}

/// Batch grouping behavior for dataset updates.
///
/// `KeepOld` keeps the dataset in the activity batch of its previous update
/// instead of opening a new one, so scripted refreshes do not flood the
/// portal's activity feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    KeepOld,
    DontGroup,
}

impl BatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchMode::KeepOld => "KEEP_OLD",
            BatchMode::DontGroup => "DONT_GROUP",
        }
    }
}

/// Tuning for a dataset update push.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Re-run HXL tag processing on the portal side after the update.
    pub hxl_update: bool,
    pub batch_mode: BatchMode,
    /// Attribution string recorded on the dataset revision.
    pub updated_by_script: String,
    /// Drop portal resources absent from the pushed resource list.
    pub remove_additional_resources: bool,
    /// Fields excluded from the portal's change detection.
    pub ignore_fields: Vec<String>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            hxl_update: false,
            batch_mode: BatchMode::KeepOld,
            updated_by_script: "codsync".to_string(),
            remove_additional_resources: true,
            ignore_fields: vec![
                "num_of_rows".to_string(),
                "resource:description".to_string(),
            ],
        }
    }
}

/// HTTP client for the CKAN-based humanitarian data portal.
///
/// Only the two actions the sync needs are wrapped: `package_show` to read a
/// dataset and `package_update` to push one back. Reads work anonymously;
/// updates require an API key.
///
/// # Examples
///
/// ```no_run
/// use codsync_core::config::HttpConfig;
/// use codsync_portal::PortalClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let portal = PortalClient::new("https://data.humdata.org", None, &HttpConfig::default())?;
/// if let Some(dataset) = portal.read_dataset("cod-ab-pol").await? {
///     println!("{} has {} resources", dataset.name, dataset.resources.len());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PortalClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
    max_retries: u32,
    retry_base_delay: Duration,
    timeout_secs: u64,
}

impl PortalClient {
    /// Creates a portal client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidUrl` if the base URL is malformed.
    /// Returns `AppError::ClientError` if the HTTP client cannot be built.
    pub fn new(
        base_url_str: &str,
        api_key: Option<String>,
        config: &HttpConfig,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url_str)
            .map_err(|_| AppError::InvalidUrl(format!("Invalid portal URL: {}", base_url_str)))?;

        let client = Client::builder()
            .user_agent("codsync/0.1 (cod-service-sync)")
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            api_key,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            timeout_secs: config.timeout.as_secs(),
        })
    }

    /// Reads a dataset by its key via `package_show`.
    ///
    /// # Returns
    ///
    /// `Ok(None)` when the portal has no dataset under that key; countries
    /// without a published COD dataset are simply skipped by the sync.
    pub async fn read_dataset(&self, key: &str) -> Result<Option<Dataset>, AppError> {
        let mut url = self
            .base_url
            .join("api/3/action/package_show")
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("id", key);

        let resp = self.send_with_retry(self.client.get(url.clone())).await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AppError::ClientError(format!(
                "HTTP {} from {}",
                status.as_u16(),
                url
            )));
        }

        let portal_resp: PortalResponse<Dataset> = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        if !portal_resp.success {
            return Err(AppError::PortalError(format!(
                "portal failed to show dataset {}",
                key
            )));
        }

        Ok(portal_resp.result)
    }

    /// Pushes a dataset back to the portal via `package_update`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::PortalError` if no API key is configured, if the
    /// portal rejects the payload, or if it answers `success: false`.
    pub async fn update_dataset(
        &self,
        dataset: &Dataset,
        options: &UpdateOptions,
    ) -> Result<(), AppError> {
        let Some(api_key) = &self.api_key else {
            return Err(AppError::PortalError(
                "no API key configured, cannot update datasets".to_string(),
            ));
        };

        let url = self
            .base_url
            .join("api/3/action/package_update")
            .map_err(|e| AppError::InvalidUrl(e.to_string()))?;

        let payload = update_payload(dataset, options)?;
        let request = self
            .client
            .post(url.clone())
            .header("Authorization", api_key.as_str())
            .json(&payload);

        let resp = self.send_with_retry(request).await?;
        let status = resp.status();

        if !status.is_success() {
            return Err(AppError::PortalError(format!(
                "{}: HTTP {} from {}",
                dataset.name,
                status.as_u16(),
                url
            )));
        }

        let portal_resp: PortalResponse<Value> = resp
            .json()
            .await
            .map_err(|e| AppError::ClientError(e.to_string()))?;

        if !portal_resp.success {
            return Err(AppError::PortalError(format!(
                "portal rejected update of {}",
                dataset.name
            )));
        }

        Ok(())
    }

    /// Sends a request with retry and backoff on network errors, timeouts,
    /// server errors (5xx), and rate limiting (429). Non-retryable responses
    /// are returned to the caller for status-specific handling.
    async fn send_with_retry(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, AppError> {
        let mut last_error = AppError::Generic("No attempts made".to_string());
        let base_delay_ms = self.retry_base_delay.as_millis() as u64;

        for attempt in 1..=self.max_retries {
            let Some(req) = request.try_clone() else {
                return Err(AppError::Generic(
                    "request body is not cloneable for retry".to_string(),
                ));
            };

            match req.send().await {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = AppError::RateLimitExceeded;
                        if attempt < self.max_retries {
                            let delay = Duration::from_millis(base_delay_ms * 2_u64.pow(attempt));
                            sleep(delay).await;
                            continue;
                        }
                    } else if status.is_server_error() {
                        last_error =
                            AppError::ClientError(format!("Server error: HTTP {}", status.as_u16()));
                        if attempt < self.max_retries {
                            let delay = Duration::from_millis(base_delay_ms * attempt as u64);
                            sleep(delay).await;
                            continue;
                        }
                    } else {
                        // Success and non-retryable client errors alike.
                        return Ok(resp);
                    }
                }
                Err(e) => {
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

/// Builds the `package_update` payload: the dataset's own fields plus the
/// update options the portal reads from the package document.
fn update_payload(dataset: &Dataset, options: &UpdateOptions) -> Result<Value, AppError> {
    let mut payload = serde_json::to_value(dataset)?;

    let Value::Object(map) = &mut payload else {
        return Err(AppError::PortalError(format!(
            "{}: dataset did not serialize to an object",
            dataset.name
        )));
    };

    map.insert("batch_mode".to_string(), json!(options.batch_mode.as_str()));
    map.insert(
        "updated_by_script".to_string(),
        json!(options.updated_by_script),
    );
    map.insert("hxl_update".to_string(), json!(options.hxl_update));
    map.insert(
        "remove_additional_resources".to_string(),
        json!(options.remove_additional_resources),
    );
    map.insert("ignore_fields".to_string(), json!(options.ignore_fields));

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codsync_core::models::Resource;

    fn http_config() -> HttpConfig {
        HttpConfig::default()
    }

    #[test]
    fn test_new_with_valid_url() {
        let result = PortalClient::new("https://data.humdata.org", None, &http_config());
        assert!(result.is_ok());
        let client = result.unwrap();
        assert_eq!(client.base_url.as_str(), "https://data.humdata.org/");
    }

    #[test]
    fn test_new_with_invalid_url() {
        let result = PortalClient::new("not-a-valid-url", None, &http_config());
        assert!(matches!(result, Err(AppError::InvalidUrl(_))));
    }

    #[test]
    fn test_portal_response_deserialization() {
        let json = r#"{
            "success": true,
            "result": {
                "id": "abc",
                "name": "cod-em-pol",
                "resources": [
                    {"id": "r1", "url": "https://example.com/r1", "name": "r1", "format": "Geoservice"}
                ]
            }
        }"#;

        let response: PortalResponse<Dataset> = serde_json::from_str(json).unwrap();
        assert!(response.success);
        let dataset = response.result.unwrap();
        assert_eq!(dataset.name, "cod-em-pol");
        assert_eq!(dataset.resources.len(), 1);
    }

    #[test]
    fn test_portal_response_failure_has_no_result() {
        let json = r#"{"success": false, "error": {"message": "Not found"}}"#;
        let response: PortalResponse<Dataset> = serde_json::from_str(json).unwrap();
        assert!(!response.success);
        assert!(response.result.is_none());
    }

    #[test]
    fn test_update_options_defaults() {
        let options = UpdateOptions::default();
        assert!(!options.hxl_update);
        assert_eq!(options.batch_mode, BatchMode::KeepOld);
        assert!(options.remove_additional_resources);
        assert_eq!(
            options.ignore_fields,
            vec!["num_of_rows".to_string(), "resource:description".to_string()]
        );
    }

    #[test]
    fn test_batch_mode_as_str() {
        assert_eq!(BatchMode::KeepOld.as_str(), "KEEP_OLD");
        assert_eq!(BatchMode::DontGroup.as_str(), "DONT_GROUP");
    }

    #[test]
    fn test_update_payload() {
        let dataset = Dataset {
            id: Some("abc".to_string()),
            name: "cod-ab-pol".to_string(),
            title: None,
            resources: vec![Resource::new(
                "https://gistmaps.itos.uga.edu/arcgis/rest/services/COD_External/POL_pcode/MapServer",
                "COD_External/POL_pcode (MapServer)",
                "Geoservice",
            )],
            extras: serde_json::Map::new(),
        };

        let payload = update_payload(&dataset, &UpdateOptions::default()).unwrap();

        assert_eq!(payload["name"], "cod-ab-pol");
        assert_eq!(payload["batch_mode"], "KEEP_OLD");
        assert_eq!(payload["updated_by_script"], "codsync");
        assert_eq!(payload["hxl_update"], false);
        assert_eq!(payload["remove_additional_resources"], true);
        assert_eq!(payload["resources"][0]["format"], "Geoservice");
    }
}
