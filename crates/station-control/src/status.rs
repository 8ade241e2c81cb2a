//! Listener stats from the streaming server's JSON status endpoint.
//!
//! Listener count is advisory: any transport or parse failure is logged
//! and degrades to "unknown", which callers report as 0.

use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use station_proto::config::StatusConfig;

const STATUS_PATH: &str = "/status-json.xsl";

#[derive(Clone)]
pub struct StatusClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl StatusClient {
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", config.base_url.trim_end_matches('/'), STATUS_PATH),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }

    /// Current listener count, or `None` when the endpoint is down or the
    /// field is absent.
    pub async fn listener_count(&self) -> Option<u64> {
        let response = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| warn!("status endpoint request failed: {}", e))
            .ok()?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| warn!("status endpoint returned non-JSON: {}", e))
            .ok()?;
        listeners_from_status(&json)
    }
}

/// Walk `icestats.source.listeners`. With multiple mounts the server
/// reports `source` as an array; the first mount wins.
pub fn listeners_from_status(json: &Value) -> Option<u64> {
    let source = &json.get("icestats")?["source"];
    let source = match source {
        Value::Array(mounts) => mounts.first()?,
        other => other,
    };
    source.get("listeners")?.as_u64()
}
