// CT Log API Client
//
// Handles HTTP communication with CT log servers (RFC 6962 get-sth and
// get-entries). Retrying is left to the caller: rate limiting and timeouts
// surface as their own error variants.

use super::Result;
use crate::error::ColumbusError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the log cursor needs from a CT log
#[async_trait]
pub trait LogClient: Send + Sync {
    /// Current tree size from the signed tree head
    async fn get_tree_size(&self) -> Result<u64>;

    /// Leaves `start..=end`; a log may return fewer than requested
    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<CtLogEntryResponse>>;
}

/// CT Log API Client
pub struct CtClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CtClient {
    /// Create a client for the log at `log_url`
    pub fn new(log_url: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(log_url).map_err(|e| ColumbusError::ConfigError {
            message: format!("Invalid CT log URL {}: {}", log_url, e),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("columbus/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(10)
            .build()?;

        Ok(Self {
            client,
            base_url: log_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ColumbusError::Timeout {
                    log: self.base_url.clone(),
                    duration: self.timeout,
                }
            } else {
                ColumbusError::RequestError(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ColumbusError::RateLimited {
                log: self.base_url.clone(),
            });
        }
        if !status.is_success() {
            return Err(ColumbusError::HttpError {
                status: status.as_u16(),
                details: format!("Request to {} failed with status: {}", url, status),
            });
        }

        Ok(response)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        response.json().await.map_err(|e| {
            if e.is_timeout() {
                ColumbusError::Timeout {
                    log: self.base_url.clone(),
                    duration: self.timeout,
                }
            } else {
                ColumbusError::ParseError {
                    message: format!("Failed to parse {} response: {}", what, e),
                }
            }
        })
    }
}

#[async_trait]
impl LogClient for CtClient {
    async fn get_tree_size(&self) -> Result<u64> {
        let url = format!("{}/ct/v1/get-sth", self.base_url);

        let response = self.get(&url).await?;
        let sth: SignedTreeHead = self.read_json(response, "STH").await?;

        Ok(sth.tree_size)
    }

    async fn get_entries(&self, start: u64, end: u64) -> Result<Vec<CtLogEntryResponse>> {
        let url = format!(
            "{}/ct/v1/get-entries?start={}&end={}",
            self.base_url, start, end
        );

        debug!("Fetching entries from {} to {}", start, end);

        let response = self.get(&url).await?;
        let entries: EntriesResponse = self.read_json(response, "entries").await?;

        Ok(entries.entries)
    }
}

/// Signed Tree Head response
#[derive(Debug, Deserialize, Serialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    pub timestamp: u64,
    #[serde(default)]
    pub sha256_root_hash: String,
    #[serde(default)]
    pub tree_head_signature: String,
}

/// Get-entries API response
#[derive(Debug, Deserialize, Serialize)]
pub struct EntriesResponse {
    pub entries: Vec<CtLogEntryResponse>,
}

/// Individual CT log entry from API
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CtLogEntryResponse {
    pub leaf_input: String,
    #[serde(default)]
    pub extra_data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = CtClient::new("https://ct.example.com/logs/2026/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.base_url(), "https://ct.example.com/logs/2026");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(CtClient::new("not a url", DEFAULT_TIMEOUT).is_err());
    }
}
