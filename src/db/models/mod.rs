// Database Models Module
// Re-exports all database model types

pub mod domain;
pub mod record;
pub mod toplist;

pub use domain::DomainRecord;
pub use record::DnsRecord;
pub use toplist::TopListEntry;
