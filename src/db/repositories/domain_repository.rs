// Domain Repository Implementation
// SQL binding of the domain store for PostgreSQL and SQLite

use crate::db::connection::{BindValue, DatabasePool};
use crate::db::days::DaysFilter;
use crate::db::models::{DnsRecord, DomainRecord, TopListEntry};
use crate::db::traits::DomainStore;
use crate::error::ColumbusError;
use crate::utils::domain_name::{self, DomainName};
use async_trait::async_trait;
use chrono::Utc;

/// Seconds in one hour
const SECONDS_PER_HOUR: i64 = 60 * 60;

/// Upper bound on prefix lookups
const PREFIX_LIMIT: i64 = 1000;

pub struct DomainRepositoryImpl {
    pool: DatabasePool,
}

fn now() -> i64 {
    Utc::now().timestamp()
}

/// SQL fragment restricting `d` (domains) by the days filter; binds the
/// cutoff as parameter `$n` when needed.
fn days_clause(filter: DaysFilter, n: usize) -> String {
    match filter {
        DaysFilter::All => String::new(),
        DaysFilter::WithRecords => {
            " AND EXISTS (SELECT 1 FROM records r WHERE r.domain_id = d.id)".to_string()
        }
        DaysFilter::Within(_) => format!(
            " AND EXISTS (SELECT 1 FROM records r WHERE r.domain_id = d.id AND r.time > ${})",
            n
        ),
    }
}

impl DomainRepositoryImpl {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Look up the row id of an identity
    async fn find_id(&self, domain: &DomainName) -> crate::Result<Option<i64>> {
        self.pool
            .fetch_optional_id(
                "SELECT id FROM domains WHERE label = $1 AND tld = $2 AND sub = $3",
                vec![
                    domain.label.as_str().into(),
                    domain.tld.as_str().into(),
                    domain.sub.as_str().into(),
                ],
            )
            .await
    }

    /// Atomically create the identity if absent and return (id, created)
    async fn ensure_identity(&self, domain: &DomainName) -> crate::Result<(i64, bool)> {
        let affected = self
            .pool
            .execute(
                "INSERT INTO domains (label, tld, sub) VALUES ($1, $2, $3) \
                 ON CONFLICT (label, tld, sub) DO NOTHING",
                vec![
                    domain.label.as_str().into(),
                    domain.tld.as_str().into(),
                    domain.sub.as_str().into(),
                ],
            )
            .await?;

        let id = self.find_id(domain).await?.ok_or_else(|| {
            ColumbusError::DatabaseError(format!("Identity vanished after insert: {}", domain))
        })?;

        Ok((id, affected == 1))
    }

    /// Move `updated` forward to `now`; never moves it backwards
    async fn touch_id(&self, id: i64, now: i64) -> crate::Result<()> {
        self.pool
            .execute(
                "UPDATE domains SET updated = $1 WHERE id = $2 AND (updated IS NULL OR updated < $1)",
                vec![BindValue::Int64(now), BindValue::Int64(id)],
            )
            .await?;
        Ok(())
    }

    /// `upsert_record` with an explicit observation time
    pub async fn upsert_record_at(
        &self,
        name: &str,
        rtype: u16,
        value: &str,
        now: i64,
    ) -> crate::Result<bool> {
        let domain = DomainName::parse(name)?;

        if value.is_empty() {
            return Err(ColumbusError::ParseError {
                message: format!("Empty record value for {}", domain),
            });
        }

        let (id, _) = self.ensure_identity(&domain).await?;

        let inserted = self
            .pool
            .execute(
                "INSERT INTO records (domain_id, rtype, value, time) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (domain_id, rtype, value) DO NOTHING",
                vec![
                    BindValue::Int64(id),
                    BindValue::Int32(i32::from(rtype)),
                    value.into(),
                    BindValue::Int64(now),
                ],
            )
            .await?
            == 1;

        if !inserted {
            self.pool
                .execute(
                    "UPDATE records SET time = $1 \
                     WHERE domain_id = $2 AND rtype = $3 AND value = $4 AND time < $1",
                    vec![
                        BindValue::Int64(now),
                        BindValue::Int64(id),
                        BindValue::Int32(i32::from(rtype)),
                        value.into(),
                    ],
                )
                .await?;
        }

        self.touch_id(id, now).await?;

        Ok(inserted)
    }

    /// `touch_updated_time` with an explicit time
    pub async fn touch_updated_time_at(&self, name: &str, now: i64) -> crate::Result<()> {
        let domain = DomainName::parse(name)?;
        let id = self
            .find_id(&domain)
            .await?
            .ok_or_else(|| ColumbusError::NotFound { name: domain.full() })?;
        self.touch_id(id, now).await
    }

    /// `recently_updated` relative to an explicit time
    pub async fn recently_updated_at(
        &self,
        name: &str,
        window_hours: i64,
        now: i64,
    ) -> crate::Result<bool> {
        let domain = DomainName::parse(name)?;

        let rows: Vec<(Option<i64>,)> = self
            .pool
            .fetch_all_as(
                "SELECT updated FROM domains WHERE label = $1 AND tld = $2 AND sub = $3",
                vec![
                    domain.label.as_str().into(),
                    domain.tld.as_str().into(),
                    domain.sub.as_str().into(),
                ],
            )
            .await?;

        let threshold = now - window_hours.saturating_mul(SECONDS_PER_HOUR);
        Ok(matches!(rows.first(), Some((Some(updated),)) if *updated > threshold))
    }

    /// Rows under the registrable part of `base`, filtered by `days`
    async fn domains_under(
        &self,
        base: &str,
        days: i64,
        now: i64,
        require_sub: bool,
    ) -> crate::Result<Vec<DomainRecord>> {
        let filter = DaysFilter::from_days(days)?;
        let domain = DomainName::parse(base)?;

        let mut query = String::from(
            "SELECT d.id, d.label, d.tld, d.sub, d.updated FROM domains d \
             WHERE d.label = $1 AND d.tld = $2",
        );
        if require_sub {
            query.push_str(" AND d.sub <> ''");
        }
        query.push_str(&days_clause(filter, 3));
        query.push_str(" ORDER BY d.sub");

        let mut bindings: Vec<BindValue> = vec![domain.label.into(), domain.tld.into()];
        if let Some(cutoff) = filter.cutoff(now) {
            bindings.push(BindValue::Int64(cutoff));
        }

        self.pool.fetch_all_as(&query, bindings).await
    }

    /// `subdomains_of` relative to an explicit time
    pub async fn subdomains_of_at(
        &self,
        base: &str,
        days: i64,
        now: i64,
    ) -> crate::Result<Vec<String>> {
        let rows = self.domains_under(base, days, now, true).await?;
        Ok(rows.into_iter().map(|d| d.sub).collect())
    }

    /// `full_hostnames_of` relative to an explicit time
    pub async fn full_hostnames_of_at(
        &self,
        base: &str,
        days: i64,
        now: i64,
    ) -> crate::Result<Vec<String>> {
        let rows = self.domains_under(base, days, now, false).await?;
        Ok(rows.iter().map(DomainRecord::full_name).collect())
    }

    /// `records_of` relative to an explicit time
    pub async fn records_of_at(
        &self,
        fqdn: &str,
        days: i64,
        now: i64,
    ) -> crate::Result<Vec<DnsRecord>> {
        let filter = DaysFilter::from_days(days)?;
        let domain = DomainName::parse(fqdn)?;

        let id = self
            .find_id(&domain)
            .await?
            .ok_or_else(|| ColumbusError::NotFound { name: domain.full() })?;

        if let Some(cutoff) = filter.cutoff(now) {
            let fresh = self
                .pool
                .fetch_optional_id(
                    "SELECT domain_id FROM records WHERE domain_id = $1 AND time > $2 LIMIT 1",
                    vec![BindValue::Int64(id), BindValue::Int64(cutoff)],
                )
                .await?;
            if fresh.is_none() {
                return Ok(Vec::new());
            }
        }

        self.pool
            .fetch_all_as(
                "SELECT rtype, value, time FROM records WHERE domain_id = $1 ORDER BY rtype, value",
                vec![BindValue::Int64(id)],
            )
            .await
    }

    /// `sample_stale` relative to an explicit time
    pub async fn sample_stale_at(
        &self,
        older_than_days: i64,
        limit: i64,
        now: i64,
    ) -> crate::Result<Vec<String>> {
        let threshold = now - older_than_days.saturating_mul(crate::db::days::SECONDS_PER_DAY);

        let rows: Vec<DomainRecord> = self
            .pool
            .fetch_all_as(
                "SELECT id, label, tld, sub, updated FROM domains \
                 WHERE updated IS NULL OR updated < $1 ORDER BY RANDOM() LIMIT $2",
                vec![BindValue::Int64(threshold), BindValue::Int64(limit)],
            )
            .await?;

        Ok(rows.iter().map(DomainRecord::full_name).collect())
    }
}

#[async_trait]
impl DomainStore for DomainRepositoryImpl {
    async fn insert_domain(&self, name: &str) -> crate::Result<bool> {
        let domain = DomainName::parse(name)?;
        let (_, created) = self.ensure_identity(&domain).await?;
        Ok(created)
    }

    async fn upsert_record(&self, name: &str, rtype: u16, value: &str) -> crate::Result<bool> {
        self.upsert_record_at(name, rtype, value, now()).await
    }

    async fn touch_updated_time(&self, name: &str) -> crate::Result<()> {
        self.touch_updated_time_at(name, now()).await
    }

    async fn recently_updated(&self, name: &str, window_hours: i64) -> crate::Result<bool> {
        self.recently_updated_at(name, window_hours, now()).await
    }

    async fn subdomains_of(&self, base: &str, days: i64) -> crate::Result<Vec<String>> {
        self.subdomains_of_at(base, days, now()).await
    }

    async fn full_hostnames_of(&self, base: &str, days: i64) -> crate::Result<Vec<String>> {
        self.full_hostnames_of_at(base, days, now()).await
    }

    async fn records_of(&self, fqdn: &str, days: i64) -> crate::Result<Vec<DnsRecord>> {
        self.records_of_at(fqdn, days, now()).await
    }

    async fn tlds_of_label(&self, label: &str) -> crate::Result<Vec<String>> {
        let label = domain_name::parse_label(label)?;

        let rows: Vec<(String,)> = self
            .pool
            .fetch_all_as(
                "SELECT DISTINCT tld FROM domains WHERE label = $1 ORDER BY tld",
                vec![label.into()],
            )
            .await?;

        Ok(rows.into_iter().map(|(tld,)| tld).collect())
    }

    async fn labels_starting_with(&self, prefix: &str) -> crate::Result<Vec<String>> {
        let prefix = prefix.trim().to_ascii_lowercase();

        // A prefix may end in a hyphen, a full label may not
        if !domain_name::is_valid_label(prefix.trim_end_matches('-')) {
            return Err(ColumbusError::InvalidDomain { name: prefix });
        }

        let length = prefix.len() as i32;
        let rows: Vec<(String,)> = self
            .pool
            .fetch_all_as(
                "SELECT DISTINCT label FROM domains WHERE substr(label, 1, $1) = $2 \
                 ORDER BY label LIMIT $3",
                vec![
                    BindValue::Int32(length),
                    prefix.into(),
                    BindValue::Int64(PREFIX_LIMIT),
                ],
            )
            .await?;

        Ok(rows.into_iter().map(|(label,)| label).collect())
    }

    async fn sample_stale(&self, older_than_days: i64, limit: i64) -> crate::Result<Vec<String>> {
        self.sample_stale_at(older_than_days, limit, now()).await
    }

    async fn toplist_insert(&self, name: &str) -> crate::Result<bool> {
        let registrable = DomainName::parse(name)?.registrable();

        let inserted = self
            .pool
            .execute(
                "INSERT INTO toplist (domain, count) VALUES ($1, 1) ON CONFLICT (domain) DO NOTHING",
                vec![registrable.as_str().into()],
            )
            .await?
            == 1;

        if !inserted {
            self.pool
                .execute(
                    "UPDATE toplist SET count = count + 1 WHERE domain = $1",
                    vec![registrable.into()],
                )
                .await?;
        }

        Ok(inserted)
    }

    async fn toplist_sample(&self, limit: i64) -> crate::Result<Vec<TopListEntry>> {
        self.pool
            .fetch_all_as(
                "SELECT domain, count FROM toplist ORDER BY RANDOM() LIMIT $1",
                vec![BindValue::Int64(limit)],
            )
            .await
    }

    async fn not_found_insert(&self, name: &str) -> crate::Result<bool> {
        let registrable = DomainName::parse(name)?.registrable();

        let inserted = self
            .pool
            .execute(
                "INSERT INTO not_found (domain) VALUES ($1) ON CONFLICT (domain) DO NOTHING",
                vec![registrable.into()],
            )
            .await?;

        Ok(inserted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_clause() {
        assert_eq!(days_clause(DaysFilter::All, 3), "");
        assert!(days_clause(DaysFilter::WithRecords, 3).contains("EXISTS"));
        assert!(days_clause(DaysFilter::Within(7), 3).contains("r.time > $3"));
    }
}
