// Columbus - CT log and DNS driven subdomain index
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

//! Columbus discovers subdomains by harvesting Certificate Transparency logs
//! and by resolving DNS records for every name it learns, optionally also
//! from live traffic through a passive DNS relay. Everything lands in one
//! domain store with idempotent upsert semantics.

pub mod cli;
pub mod config;
pub mod ct_logs;
pub mod db;
pub mod dns;
pub mod error;
pub mod relay;
pub mod scheduler;
pub mod utils;

// Re-export commonly used types
pub use crate::cli::Args;
pub use crate::config::AppConfig;
pub use crate::error::ColumbusError;

/// Result type for columbus operations
pub type Result<T> = std::result::Result<T, ColumbusError>;
