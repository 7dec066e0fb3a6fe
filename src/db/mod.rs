// Database Module
// Storage layer for domain identities, DNS records, the toplist and the
// not-found collection

pub mod config;
pub mod connection;
pub mod days;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod traits;

// Re-exports
pub use config::{DatabaseConfig, DatabaseType};
pub use connection::DatabasePool;
pub use days::DaysFilter;
pub use migrations::run_migrations;
pub use models::*;
pub use repositories::DomainRepositoryImpl;
pub use traits::*;

use std::sync::Arc;
use tracing::warn;

/// Main database struct
pub struct ColumbusDatabase {
    pool: DatabasePool,
    domains: Arc<DomainRepositoryImpl>,
}

impl ColumbusDatabase {
    /// Connect and bring the schema up to date
    pub async fn new(config: &DatabaseConfig) -> crate::Result<Self> {
        let pool = DatabasePool::new(config).await?;

        run_migrations(&pool).await?;

        let domains = Arc::new(DomainRepositoryImpl::new(pool.clone()));

        Ok(Self { pool, domains })
    }

    /// Get database pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Concrete repository, for callers that need the `*_at` variants
    pub fn repository(&self) -> Arc<DomainRepositoryImpl> {
        Arc::clone(&self.domains)
    }

    /// Shared handle to the domain store
    pub fn store(&self) -> Arc<dyn DomainStore> {
        self.domains.clone()
    }

    /// Close database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Hostnames stored under the registrable part of `domain`, counting the
/// request: a hit goes to the toplist, a miss to the not-found collection.
/// Failing to count is logged and does not fail the lookup.
pub async fn lookup_hostnames(
    store: &dyn DomainStore,
    domain: &str,
    days: i64,
) -> crate::Result<Vec<String>> {
    let hostnames = store.full_hostnames_of(domain, days).await?;

    let counted = if hostnames.is_empty() {
        store.not_found_insert(domain).await
    } else {
        store.toplist_insert(domain).await
    };
    if let Err(e) = counted {
        warn!("{} -> failed to count lookup: {}", domain, e);
    }

    Ok(hostnames)
}
