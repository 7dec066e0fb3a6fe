// One-shot query arguments
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0

use clap::Args;

/// One-shot store operations
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Queue a domain for insertion and resolution
    #[arg(long = "insert", value_name = "DOMAIN")]
    pub insert: Option<String>,

    /// Print the known hostnames of a domain
    #[arg(long = "lookup", value_name = "DOMAIN")]
    pub lookup: Option<String>,

    /// Print the DNS records of a hostname
    #[arg(long = "records", value_name = "FQDN")]
    pub records: Option<String>,

    /// Print the TLDs a label is registered under
    #[arg(long = "tlds", value_name = "LABEL")]
    pub tlds: Option<String>,

    /// Print labels starting with a prefix
    #[arg(long = "starts", value_name = "PREFIX")]
    pub starts: Option<String>,

    /// Age filter for --lookup and --records: -1 all, 0 with records,
    /// N records seen in the last N days
    #[arg(long = "days", value_name = "N", allow_negative_numbers = true)]
    pub days: Option<i64>,
}

impl QueryArgs {
    /// Number of one-shot queries requested
    pub fn count(&self) -> usize {
        [
            self.insert.is_some(),
            self.lookup.is_some(),
            self.records.is_some(),
            self.tlds.is_some(),
            self.starts.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}
