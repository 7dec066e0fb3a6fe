// DNS Client
//
// Queries one record type for one name against the configured upstream
// resolvers and classifies failures as transient or fatal.

use super::record::{canonical_value, type_name};
use crate::error::ColumbusError;
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::error::ProtoErrorKind;
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::RecordType;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::debug;

/// Record lookups used by the resolver
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// Canonical values of every `record_type` record at `name`.
    ///
    /// A NOERROR answer without matching records is an empty vector.
    async fn query(&self, name: &str, record_type: RecordType) -> crate::Result<Vec<String>>;
}

/// hickory-resolver backed client
pub struct HickoryClient {
    resolver: TokioAsyncResolver,
}

impl HickoryClient {
    /// Build a client that talks to `upstreams` over UDP (with TCP fallback
    /// for truncated answers)
    pub fn new(upstreams: &[SocketAddr], timeout: Duration) -> crate::Result<Self> {
        if upstreams.is_empty() {
            return Err(ColumbusError::ConfigError {
                message: "No DNS resolvers configured".to_string(),
            });
        }

        let mut config = ResolverConfig::new();
        for addr in upstreams {
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Udp));
            config.add_name_server(NameServerConfig::new(*addr, Protocol::Tcp));
        }

        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 2;
        // No answer caching
        opts.cache_size = 0;

        let resolver = TokioAsyncResolver::tokio(config, opts);

        Ok(Self { resolver })
    }
}

#[async_trait]
impl DnsClient for HickoryClient {
    async fn query(&self, name: &str, record_type: RecordType) -> crate::Result<Vec<String>> {
        // Trailing dot keeps the resolver from applying search domains
        let fqdn = format!("{}.", name.trim_end_matches('.'));

        let lookup = match self.resolver.lookup(fqdn.as_str(), record_type).await {
            Ok(lookup) => lookup,
            Err(e) => return classify(name, record_type, e),
        };

        let mut values: Vec<String> = Vec::new();
        for record in lookup.record_iter() {
            if record.record_type() != record_type {
                continue;
            }
            if let Some(value) = record.data().and_then(canonical_value)
                && !values.contains(&value)
            {
                values.push(value);
            }
        }

        debug!(
            "{} -> {} answered {} value(s)",
            name,
            type_name(record_type),
            values.len()
        );

        Ok(values)
    }
}

/// Map a resolver error onto the error taxonomy
fn classify(
    name: &str,
    record_type: RecordType,
    err: ResolveError,
) -> crate::Result<Vec<String>> {
    let transient = |details: String| ColumbusError::DnsTransient {
        name: name.to_string(),
        record_type: type_name(record_type),
        details,
    };
    let fatal = |details: String| ColumbusError::DnsFatal {
        name: name.to_string(),
        record_type: type_name(record_type),
        details,
    };

    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NoError => Ok(Vec::new()),
            ResponseCode::NXDomain | ResponseCode::ServFail | ResponseCode::Refused => {
                Err(transient(response_code.to_string()))
            }
            other => Err(fatal(other.to_string())),
        },
        ResolveErrorKind::Timeout => Err(transient("timeout".to_string())),
        ResolveErrorKind::Proto(proto) if matches!(proto.kind(), ProtoErrorKind::Timeout) => {
            Err(transient("timeout".to_string()))
        }
        ResolveErrorKind::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
            Err(transient("timeout".to_string()))
        }
        _ => Err(fatal(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_requires_upstreams() {
        assert!(HickoryClient::new(&[], Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_client_creation() {
        let upstreams: Vec<SocketAddr> = vec!["1.1.1.1:53".parse().unwrap()];
        assert!(HickoryClient::new(&upstreams, Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn test_timeout_is_transient() {
        let err = ResolveError::from(ResolveErrorKind::Timeout);
        let result = classify("www.example.com", RecordType::A, err);
        assert!(matches!(result, Err(ColumbusError::DnsTransient { .. })));
    }

    #[test]
    fn test_no_connections_is_fatal() {
        let err = ResolveError::from(ResolveErrorKind::NoConnections);
        let result = classify("www.example.com", RecordType::A, err);
        assert!(matches!(result, Err(ColumbusError::DnsFatal { .. })));
    }
}
