// Database Traits
// Defines the store interface the resolver, scheduler and harvester write through

use crate::db::models::*;
use async_trait::async_trait;

/// Domain store
///
/// Every name argument is cleaned, validated and split before it reaches
/// storage, so implementations report `InvalidDomain`, `TldOnly` and
/// `PartsFailed` consistently.
///
/// `days` arguments follow one rule: `-1` selects everything, `0` only
/// domains holding at least one record, and a positive value only domains
/// with a record observed within that many days. Any other negative value is
/// rejected with `InvalidDays`.
#[async_trait]
pub trait DomainStore: Send + Sync {
    /// Create the identity if absent; true when a new identity was created
    async fn insert_domain(&self, name: &str) -> crate::Result<bool>;

    /// Insert the (type, value) pair or refresh its time; true when new
    async fn upsert_record(&self, name: &str, rtype: u16, value: &str) -> crate::Result<bool>;

    /// Set the updated time to now without touching records
    async fn touch_updated_time(&self, name: &str) -> crate::Result<()>;

    /// True when the name was updated within the last `window_hours`
    async fn recently_updated(&self, name: &str, window_hours: i64) -> crate::Result<bool>;

    /// Distinct non-empty subs stored under the registrable part of `base`
    async fn subdomains_of(&self, base: &str, days: i64) -> crate::Result<Vec<String>>;

    /// Every stored hostname under the registrable part of `base`
    async fn full_hostnames_of(&self, base: &str, days: i64) -> crate::Result<Vec<String>>;

    /// Records of exactly `fqdn`
    async fn records_of(&self, fqdn: &str, days: i64) -> crate::Result<Vec<DnsRecord>>;

    /// Distinct TLDs stored for a label
    async fn tlds_of_label(&self, label: &str) -> crate::Result<Vec<String>>;

    /// Distinct labels beginning with `prefix`
    async fn labels_starting_with(&self, prefix: &str) -> crate::Result<Vec<String>>;

    /// Random sample of hostnames not updated within `older_than_days` (or never)
    async fn sample_stale(&self, older_than_days: i64, limit: i64) -> crate::Result<Vec<String>>;

    /// Count a request for the registrable part of `name`; true when first seen
    async fn toplist_insert(&self, name: &str) -> crate::Result<bool>;

    /// Random sample of popular registrable domains
    async fn toplist_sample(&self, limit: i64) -> crate::Result<Vec<TopListEntry>>;

    /// Remember that the registrable part of `name` was looked up and had
    /// nothing stored; true when first recorded
    async fn not_found_insert(&self, name: &str) -> crate::Result<bool>;
}
