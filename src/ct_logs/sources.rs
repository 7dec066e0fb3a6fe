// CT Log Sources Management
//
// Configured log list, the built-in defaults, and the optional Google CT
// log list

use super::Result;
use crate::error::ColumbusError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Google CT log list URL (v3 format)
pub const CT_LOG_LIST_URL: &str = "https://www.gstatic.com/ct/log_list/v3/log_list.json";

/// CT log to harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSource {
    /// Short name, also the checkpoint file stem
    pub name: String,
    /// Base URL for the log API
    pub uri: String,
}

impl LogSource {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
        }
    }

    /// Derive a file-safe name from a log URL
    /// (`https://ct.googleapis.com/logs/us1/argon2026h2/` -> `ct.googleapis.com_logs_us1_argon2026h2`)
    pub fn from_uri(uri: &str) -> Result<Self> {
        let url = url::Url::parse(uri).map_err(|e| ColumbusError::ConfigError {
            message: format!("Invalid CT log URL {}: {}", uri, e),
        })?;

        let host = url.host_str().ok_or_else(|| ColumbusError::ConfigError {
            message: format!("CT log URL without host: {}", uri),
        })?;

        let mut name = host.to_string();
        for segment in url.path().split('/').filter(|s| !s.is_empty()) {
            name.push('_');
            name.push_str(segment);
        }

        Ok(Self::new(name, uri))
    }
}

/// Logs harvested when the configuration names none
pub fn default_sources() -> Vec<LogSource> {
    vec![
        LogSource::new("argon2026h2", "https://ct.googleapis.com/logs/us1/argon2026h2/"),
        LogSource::new("xenon2026h2", "https://ct.googleapis.com/logs/eu1/xenon2026h2/"),
        LogSource::new("nimbus2026", "https://ct.cloudflare.com/logs/nimbus2026/"),
        LogSource::new("oak2026h2", "https://oak.ct.letsencrypt.org/2026h2/"),
        LogSource::new("sabre2026h2", "https://sabre2026h2.ct.sectigo.com/"),
    ]
}

/// Fetch the usable logs from Google's log list
pub async fn fetch_google_sources(timeout: Duration) -> Result<Vec<LogSource>> {
    info!("Fetching CT log sources from {}", CT_LOG_LIST_URL);

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("columbus/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client.get(CT_LOG_LIST_URL).send().await?;

    if !response.status().is_success() {
        return Err(ColumbusError::HttpError {
            status: response.status().as_u16(),
            details: format!(
                "CT log list request failed with status: {}",
                response.status()
            ),
        });
    }

    let log_list: GoogleCtLogList =
        response.json().await.map_err(|e| ColumbusError::ParseError {
            message: format!("Failed to parse CT log list: {}", e),
        })?;

    let sources = usable_sources(&log_list)?;
    info!("Loaded {} usable CT log sources", sources.len());
    Ok(sources)
}

fn usable_sources(log_list: &GoogleCtLogList) -> Result<Vec<LogSource>> {
    debug!(
        "Fetched {} operators from CT log list",
        log_list.operators.len()
    );

    let mut sources = Vec::new();
    for operator in &log_list.operators {
        for log in &operator.logs {
            if let Some(state) = &log.state
                && state.usable.is_some()
            {
                sources.push(LogSource::from_uri(&log.url)?);
            }
        }
    }
    Ok(sources)
}

// Google CT Log List JSON structures
#[derive(Debug, Deserialize)]
struct GoogleCtLogList {
    operators: Vec<Operator>,
}

#[derive(Debug, Deserialize)]
struct Operator {
    #[serde(default)]
    logs: Vec<Log>,
}

#[derive(Debug, Deserialize)]
struct Log {
    url: String,
    state: Option<LogState>,
}

#[derive(Debug, Deserialize)]
struct LogState {
    usable: Option<UsableState>,
}

#[derive(Debug, Deserialize)]
struct UsableState {
    // Presence marks the log as usable
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_from_uri() {
        let source = LogSource::from_uri("https://ct.googleapis.com/logs/us1/argon2026h2/").unwrap();
        assert_eq!(source.name, "ct.googleapis.com_logs_us1_argon2026h2");

        let source = LogSource::from_uri("https://sabre2026h2.ct.sectigo.com/").unwrap();
        assert_eq!(source.name, "sabre2026h2.ct.sectigo.com");
    }

    #[test]
    fn test_default_sources_are_unique() {
        let sources = default_sources();
        let mut names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), sources.len());
    }

    #[test]
    fn test_only_usable_logs_are_kept() {
        let json = r#"{
            "operators": [{
                "name": "Google",
                "logs": [
                    {"url": "https://ct.googleapis.com/logs/us1/argon2026h2/",
                     "state": {"usable": {"timestamp": "2025-01-01T00:00:00Z"}}},
                    {"url": "https://ct.googleapis.com/logs/us1/argon2020/",
                     "state": {"retired": {"timestamp": "2021-01-01T00:00:00Z"}}}
                ]
            }]
        }"#;

        let list: GoogleCtLogList = serde_json::from_str(json).unwrap();
        let sources = usable_sources(&list).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].uri, "https://ct.googleapis.com/logs/us1/argon2026h2/");
    }
}
