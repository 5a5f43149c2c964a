//! Shared upstream HTTP client.

use serde_json::Value;

use crate::types::{Error, HttpConfig, Result};

/// Thin wrapper over a pooled `reqwest::Client` that speaks JSON GET.
///
/// Cloning is cheap and shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET `url` with `query` parameters and decode a JSON body.
    ///
    /// Non-2xx statuses are transport errors; a body that is not JSON is a
    /// malformed response. `url` is logged, query parameters (which may carry
    /// API keys) are not.
    pub async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value> {
        tracing::debug!(url, "upstream GET");
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!("HTTP {status} from {url}")));
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("invalid JSON from {url}: {e}")))
    }
}

/// Append `api_key` to `query` when one is configured.
pub fn with_api_key(
    mut query: Vec<(&'static str, String)>,
    api_key: Option<&str>,
) -> Vec<(&'static str, String)> {
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        query.push(("api_key", key.to_string()));
    }
    query
}
