// Certificate Transparency logs harvesting arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;

/// Certificate Transparency log harvesting options
///
/// Log sources, step size and intervals come from the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct HarvestArgs {
    /// Harvest the configured CT logs
    #[arg(long = "harvest", alias = "ct-logs", id = "harvest_enable")]
    pub enable: bool,

    /// Harvest every usable log from Google's CT log list instead of the
    /// configured ones
    #[arg(long = "google-logs", requires = "harvest_enable")]
    pub google_logs: bool,

    /// Print checkpoint index against remote tree size for every log
    #[arg(long = "status")]
    pub status: bool,
}
