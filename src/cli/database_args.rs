// Database configuration arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;

/// Database maintenance
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// Initialize database (create tables and run migrations)
    #[arg(long = "db-init")]
    pub init: bool,
}
