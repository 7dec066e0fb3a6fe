// DNS Module
//
// Active resolution of tracked record types for known names.

pub mod client;
pub mod record;
pub mod resolver;

pub use client::{DnsClient, HickoryClient};
pub use record::{DNAME, SUPPORTED_TYPES};
pub use resolver::RecordResolver;
