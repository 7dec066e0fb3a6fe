// Record Resolver
//
// Resolves every supported record type for one name and writes the answers
// through the domain store, skipping wildcard types and names resolved
// within the freshness window.

use super::client::DnsClient;
use super::record::{SUPPORTED_TYPES, type_name};
use crate::db::DomainStore;
use crate::utils::domain_name::{self, DomainName};
use hickory_proto::rr::RecordType;
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default freshness window in hours
pub const DEFAULT_FRESHNESS_HOURS: i64 = 1;

/// Length of the random sibling label used for wildcard checks
const RANDOM_LABEL_LENGTH: usize = 16;

pub struct RecordResolver {
    store: Arc<dyn DomainStore>,
    client: Arc<dyn DnsClient>,
    freshness_hours: i64,
}

impl RecordResolver {
    pub fn new(store: Arc<dyn DomainStore>, client: Arc<dyn DnsClient>) -> Self {
        Self {
            store,
            client,
            freshness_hours: DEFAULT_FRESHNESS_HOURS,
        }
    }

    pub fn with_freshness_hours(mut self, hours: i64) -> Self {
        self.freshness_hours = hours;
        self
    }

    /// Resolve all supported types for `fqdn`.
    ///
    /// With `ignore_transient` NXDOMAIN, SERVFAIL, REFUSED and timeouts only
    /// skip the affected type. With `ignore_freshness` the name is resolved
    /// even when it was updated within the freshness window.
    pub async fn resolve(
        &self,
        fqdn: &str,
        ignore_transient: bool,
        ignore_freshness: bool,
    ) -> crate::Result<()> {
        let name = domain_name::clean(fqdn);

        if !ignore_freshness && self.store.recently_updated(&name, self.freshness_hours).await? {
            debug!("{} -> updated recently, skipping", name);
            return Ok(());
        }

        self.store.touch_updated_time(&name).await?;

        // A registrable name's parent is a public suffix, never a wildcard zone
        let has_sub = DomainName::parse(&name).is_ok_and(|d| !d.sub.is_empty());

        let mut new_records = 0;
        for record_type in SUPPORTED_TYPES {
            if has_sub && self.is_wildcard(&name, record_type).await {
                debug!("{} -> wildcard {}, skipping", name, type_name(record_type));
                continue;
            }

            let values = match self.client.query(&name, record_type).await {
                Ok(values) => values,
                Err(e) if ignore_transient && e.is_transient() => {
                    debug!("{} -> {}", name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            for value in values.iter().filter(|v| !v.is_empty()) {
                if self
                    .store
                    .upsert_record(&name, u16::from(record_type), value)
                    .await?
                {
                    new_records += 1;
                }
            }
        }

        if new_records > 0 {
            debug!("{} -> {} new record(s)", name, new_records);
        }

        Ok(())
    }

    /// A type is wildcard for `name` when a random sibling label under the
    /// same parent answers it.
    async fn is_wildcard(&self, name: &str, record_type: RecordType) -> bool {
        let Some((_, parent)) = name.split_once('.') else {
            return false;
        };

        let sibling = format!("{}.{}", random_label(), parent);
        match self.client.query(&sibling, record_type).await {
            Ok(values) => !values.is_empty(),
            Err(e) => {
                if !e.is_transient() {
                    warn!("{} -> wildcard check failed: {}", name, e);
                }
                false
            }
        }
    }
}

/// Lowercase alphanumeric label unlikely to exist
pub fn random_label() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_LABEL_LENGTH)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_label_is_valid() {
        let label = random_label();
        assert_eq!(label.len(), RANDOM_LABEL_LENGTH);
        assert!(domain_name::is_valid_label(&label));
        assert_ne!(label, random_label());
    }
}
