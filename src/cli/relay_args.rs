// Passive DNS relay arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;

/// Passive DNS relay options
#[derive(Args, Debug, Clone, Default)]
pub struct RelayArgs {
    /// Start the passive DNS relay
    #[arg(long = "relay", id = "relay_enable")]
    pub enable: bool,

    /// Listen address, overrides the configuration file
    #[arg(
        long = "relay-listen",
        value_name = "ADDR",
        requires = "relay_enable",
        id = "relay_listen"
    )]
    pub listen: Option<String>,
}
