//! HttpSink - uploads every item of a batch as its own POST request

use contracts::{BatchSink, ContractError, DeliveryReport, ItemFailure};
use futures_util::future::join_all;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default timeout for upload requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for HttpSink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Upload endpoint
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl HttpSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let url = params
            .get("url")
            .ok_or_else(|| "missing 'url' parameter".to_string())?
            .clone();

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("invalid url '{}': expected http:// or https://", url));
        }

        let timeout = match params.get("timeout_ms") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| format!("invalid timeout_ms '{}'", raw))?,
            None => DEFAULT_TIMEOUT,
        };

        Ok(Self { url, timeout })
    }
}

/// Request body: the item wrapped under `_data`
#[derive(Serialize)]
struct UploadEnvelope<'a, T> {
    #[serde(rename = "_data")]
    data: &'a T,
}

/// Sink that POSTs items to an HTTP endpoint, concurrently within a batch
#[derive(Debug)]
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
    client: Client,
}

impl HttpSink {
    /// Create a new HttpSink
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Result<Self, ContractError> {
        let name = name.into();
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                ContractError::sink_connection(&name, format!("failed to create HTTP client: {e}"))
            })?;

        debug!(sink = %name, url = %config.url, "HttpSink created");
        Ok(Self {
            name,
            config,
            client,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = HttpSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sinks.{name}.params"), e))?;
        Self::new(name, config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Upload one item. Anything other than 200 counts as a failure.
    async fn upload<T: Serialize>(&self, item: &T) -> Result<(), String> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&UploadEnvelope { data: item })
            .send()
            .await
            .map_err(|e| {
                debug!(sink = %self.name, error = %e, "Upload request failed");
                e.to_string()
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            debug!(
                sink = %self.name,
                status = status.as_u16(),
                body = %body,
                "Upload rejected"
            );
            return Err(format!("status {}", status.as_u16()));
        }

        Ok(())
    }
}

impl<T> BatchSink<T> for HttpSink
where
    T: Serialize + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sink_deliver",
        skip(self, batch),
        fields(sink = %self.name, items = batch.len())
    )]
    async fn deliver(&mut self, batch: Vec<T>) -> Result<DeliveryReport, ContractError> {
        let this = &*self;
        let results = join_all(batch.iter().map(|item| this.upload(item))).await;

        let mut report = DeliveryReport::default();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(()) => report.delivered += 1,
                Err(message) => report.failures.push(ItemFailure::new(index, message)),
            }
        }

        if report.delivered == 0 && !report.failures.is_empty() {
            let first = &report.failures[0].message;
            return Err(ContractError::sink_delivery(
                &self.name,
                format!("all {} uploads failed, first: {}", report.failures.len(), first),
            ));
        }

        info!(sink = %self.name, "Uploaded {} errors", report.delivered);
        Ok(report)
    }

    #[instrument(name = "http_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "HttpSink closed");
        Ok(())
    }
}
