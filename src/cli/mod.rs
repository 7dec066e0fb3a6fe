// CLI module - Command line interface and argument parsing
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Parser;
use std::path::PathBuf;

// Sub-modules for organized CLI arguments
mod database_args;
mod harvest_args;
mod query_args;
mod relay_args;

// Re-export sub-structs
pub use database_args::DatabaseArgs;
pub use harvest_args::HarvestArgs;
pub use query_args::QueryArgs;
pub use relay_args::RelayArgs;

/// Columbus - CT log and DNS driven subdomain index
///
/// The long-running services (`--harvest`, `--update`, `--relay`) can be
/// combined in one process; the one-shot commands run alone.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, long_about = None)]
#[command(name = "columbus")]
#[command(about = "CT log and DNS driven subdomain index", long_about = None)]
pub struct Args {
    /// Configuration file (TOML format)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Generate example configuration file
    #[arg(long = "config-example", value_name = "FILE")]
    pub config_example: Option<PathBuf>,

    // ============ Database Operations ============
    #[command(flatten)]
    pub database: DatabaseArgs,

    // ============ Certificate Transparency Logs ============
    #[command(flatten)]
    pub harvest: HarvestArgs,

    // ============ Record Updater ============
    /// Run the stale and popular domain samplers
    #[arg(long = "update")]
    pub update: bool,

    // ============ Passive DNS Relay ============
    #[command(flatten)]
    pub relay: RelayArgs,

    // ============ Queries ============
    #[command(flatten)]
    pub query: QueryArgs,
}

impl Args {
    /// Validate CLI arguments for mutual exclusivity and logical consistency
    pub fn validate(&self) -> anyhow::Result<()> {
        let one_shot = self.query.count() + usize::from(self.harvest.status);

        if one_shot > 1 {
            anyhow::bail!("Only one of --insert, --lookup, --records, --tlds, --starts and --status can be used at a time.");
        }

        if one_shot == 1 && self.runs_services() {
            anyhow::bail!(
                "One-shot commands cannot be combined with --harvest, --update or --relay."
            );
        }

        if self.query.days.is_some() && self.query.lookup.is_none() && self.query.records.is_none() {
            anyhow::bail!("--days only applies to --lookup and --records.");
        }

        Ok(())
    }

    /// True when a long-running service was requested
    pub fn runs_services(&self) -> bool {
        self.harvest.enable || self.update || self.relay.enable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_services_combine() {
        let args = Args::parse_from(["columbus", "--harvest", "--update", "--relay"]);
        assert!(args.validate().is_ok());
        assert!(args.runs_services());
    }

    #[test]
    fn test_lookup_with_days() {
        let args = Args::parse_from(["columbus", "--lookup", "example.com", "--days", "7"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.query.days, Some(7));
    }

    #[test]
    fn test_days_needs_a_query() {
        let args = Args::parse_from(["columbus", "--tlds", "example", "--days", "7"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_one_shot_excludes_services() {
        let args = Args::parse_from(["columbus", "--insert", "www.example.com", "--harvest"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_single_one_shot() {
        let args = Args::parse_from(["columbus", "--insert", "a.example.com", "--status"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_relay_listen_override() {
        let args = Args::parse_from(["columbus", "--relay", "--relay-listen", "127.0.0.1:5353"]);
        assert_eq!(args.relay.listen.as_deref(), Some("127.0.0.1:5353"));
    }
}
