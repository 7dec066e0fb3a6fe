// Error types for columbus
//
// Structured error types built with thiserror. Library code returns
// `crate::Result<T>`; the binary wraps everything in anyhow.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for columbus operations
#[derive(Debug, Error)]
pub enum ColumbusError {
    /// Name failed hostname validation
    #[error("Invalid domain: {name}")]
    InvalidDomain { name: String },

    /// Name is a public suffix on its own
    #[error("Domain is a bare TLD: {name}")]
    TldOnly { name: String },

    /// Name could not be split into label, tld and sub
    #[error("Failed to split domain into parts: {name}")]
    PartsFailed { name: String },

    /// `days` query parameter outside of -1, 0 and positive values
    #[error("Invalid days value: {days}")]
    InvalidDays { days: i64 },

    /// Domain identity does not exist in the store
    #[error("Domain not found: {name}")]
    NotFound { name: String },

    /// Database operation errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// DNS error worth skipping (NXDOMAIN, SERVFAIL, REFUSED, timeout)
    #[error("Transient DNS error for {name} ({record_type}): {details}")]
    DnsTransient {
        name: String,
        record_type: String,
        details: String,
    },

    /// DNS error that aborts the resolution
    #[error("DNS error for {name} ({record_type}): {details}")]
    DnsFatal {
        name: String,
        record_type: String,
        details: String,
    },

    /// CT log answered 429
    #[error("Rate limited by {log}")]
    RateLimited { log: String },

    /// CT log request exceeded its deadline
    #[error("Request to {log} timed out after {duration:?}")]
    Timeout { log: String, duration: Duration },

    /// HTTP client error
    #[error("HTTP error (status {status}): {details}")]
    HttpError { status: u16, details: String },

    /// Reqwest HTTP client errors
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    /// Parsing error for data formats
    #[error("Parse error: {message}")]
    ParseError { message: String },

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// Bounded queue has no room left
    #[error("Update queue is full")]
    QueueFull,

    /// Queue or channel closed during shutdown
    #[error("Channel closed: {details}")]
    ChannelClosed { details: String },

    /// Generic I/O error
    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: io::Error,
    },

    /// File system errors
    #[error("File system error: {path}: {source}")]
    FileSystemError {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl ColumbusError {
    /// Validation errors are reported to the caller and never retried
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ColumbusError::InvalidDomain { .. }
                | ColumbusError::TldOnly { .. }
                | ColumbusError::PartsFailed { .. }
                | ColumbusError::InvalidDays { .. }
        )
    }

    /// Transient errors may be skipped or retried with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ColumbusError::DnsTransient { .. }
                | ColumbusError::RateLimited { .. }
                | ColumbusError::Timeout { .. }
        )
    }
}

impl From<sqlx::Error> for ColumbusError {
    fn from(err: sqlx::Error) -> Self {
        ColumbusError::DatabaseError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ColumbusError {
    fn from(err: tokio::task::JoinError) -> Self {
        ColumbusError::Other(format!("Task join error: {}", err))
    }
}

impl From<hickory_proto::error::ProtoError> for ColumbusError {
    fn from(err: hickory_proto::error::ProtoError) -> Self {
        ColumbusError::ParseError {
            message: format!("DNS message error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_errors_are_classified() {
        let err = ColumbusError::TldOnly {
            name: "co.uk".to_string(),
        };
        assert!(err.is_validation());
        assert!(!err.is_transient());
        assert!(err.to_string().contains("co.uk"));

        let err = ColumbusError::InvalidDays { days: -3 };
        assert!(err.is_validation());
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_transient_errors_are_classified() {
        let err = ColumbusError::DnsTransient {
            name: "www.example.com".to_string(),
            record_type: "A".to_string(),
            details: "NXDomain".to_string(),
        };
        assert!(err.is_transient());

        let err = ColumbusError::RateLimited {
            log: "argon".to_string(),
        };
        assert!(err.is_transient());

        let err = ColumbusError::DnsFatal {
            name: "www.example.com".to_string(),
            record_type: "A".to_string(),
            details: "no connections".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn test_error_conversion_from_io() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let err: ColumbusError = io_err.into();

        assert!(matches!(err, ColumbusError::IoError { .. }));
    }

    #[test]
    fn test_error_chain_preserved() {
        use std::error::Error;

        let err = ColumbusError::FileSystemError {
            path: "/var/lib/columbus/argon.index".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };

        assert!(err.source().is_some());
    }
}
