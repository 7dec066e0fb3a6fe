// Certificate Transparency Logs Module
//
// Resumable harvesting of CT logs: every cursor walks one log, extracts the
// DNS names of each certificate and hands them to the update queue.

pub mod checkpoint;
pub mod client;
pub mod cursor;
pub mod parser;
pub mod registry;
pub mod sources;

pub use checkpoint::Checkpoint;
pub use client::{CtClient, LogClient};
pub use cursor::{CursorSettings, LogCursor, LogStatus};
pub use parser::{CertType, CtLogEntry, parse_entry};
pub use registry::LogRegistry;
pub use sources::{LogSource, default_sources};

use crate::error::ColumbusError;

/// Result type for CT logs operations
pub type Result<T> = std::result::Result<T, ColumbusError>;
