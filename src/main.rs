// Columbus - CT log and DNS driven subdomain index
// Copyright (C) 2025 Marc Rivero (@seifreed)
// Licensed under GPL-3.0
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.

use anyhow::{Context, Result};
use clap::Parser;
use columbus::ct_logs::{LogRegistry, LogSource, client, sources};
use columbus::db::{ColumbusDatabase, DomainStore, lookup_hostnames};
use columbus::dns::{HickoryClient, RecordResolver};
use columbus::relay::{PassiveDnsRelay, UdpUpstream};
use columbus::scheduler::{UpdateQueue, UpdateScheduler};
use columbus::{AppConfig, Args};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Per-query timeout for the record resolver
const DNS_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging - respect RUST_LOG environment variable
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    // Parse command line arguments
    let args = Args::parse();
    args.validate()?;

    // Handle --config-example (generate config example and exit)
    if let Some(config_path) = &args.config_example {
        AppConfig::create_example(
            config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Invalid file path"))?,
        )?;
        println!("✓ Example configuration saved to: {}", config_path.display());
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => AppConfig::from_file(
            path.to_str()
                .ok_or_else(|| anyhow::anyhow!("Invalid config file path"))?,
        )?,
        None => AppConfig::default(),
    };

    // --status only talks to the CT logs
    if args.harvest.status {
        return print_status(&config).await;
    }

    if !args.database.init && args.query.count() == 0 && !args.runs_services() {
        println!("Nothing to do. Use --help for usage.");
        return Ok(());
    }

    info!("Connecting to {}", config.database.location());
    let db = ColumbusDatabase::new(&config.database)
        .await
        .context("Failed to open database")?;

    if args.database.init {
        println!("✓ Database initialized");
        if args.query.count() == 0 && !args.runs_services() {
            db.close().await;
            return Ok(());
        }
    }

    let store = db.store();

    let result = if args.query.count() > 0 {
        run_query(&args, &config, store).await
    } else {
        run_services(&args, &config, store).await
    };

    db.close().await;
    result
}

/// One-shot store operations
async fn run_query(args: &Args, config: &AppConfig, store: Arc<dyn DomainStore>) -> Result<()> {
    let days = args.query.days.unwrap_or(-1);

    if let Some(domain) = &args.query.insert {
        let scheduler = start_scheduler(config, Arc::clone(&store), &CancellationToken::new())?;
        scheduler.insert(domain)?;
        println!("✓ Queued {}", domain);
        scheduler.drain().await;
    } else if let Some(domain) = &args.query.lookup {
        let hostnames = lookup_hostnames(store.as_ref(), domain, days).await?;
        if hostnames.is_empty() {
            eprintln!("✗ {} not found", domain);
        }
        for hostname in hostnames {
            println!("{}", hostname);
        }
    } else if let Some(fqdn) = &args.query.records {
        for record in store.records_of(fqdn, days).await? {
            println!("{}\t{}\t{}", record.type_name(), record.value, record.time);
        }
    } else if let Some(label) = &args.query.tlds {
        for tld in store.tlds_of_label(label).await? {
            println!("{}", tld);
        }
    } else if let Some(prefix) = &args.query.starts {
        for label in store.labels_starting_with(prefix).await? {
            println!("{}", label);
        }
    }

    Ok(())
}

/// Harvester, samplers and relay until Ctrl+C
async fn run_services(args: &Args, config: &AppConfig, store: Arc<dyn DomainStore>) -> Result<()> {
    let root = CancellationToken::new();

    let mut scheduler = start_scheduler(config, store, &root)?;
    if args.update {
        scheduler.start_samplers();
    }

    let mut registry = None;
    if args.harvest.enable {
        let sources = if args.harvest.google_logs {
            sources::fetch_google_sources(client::DEFAULT_TIMEOUT).await?
        } else {
            config.log_sources()
        };

        let mut logs = LogRegistry::new(
            sources,
            scheduler.sender(),
            config.cursor_settings(),
            client::DEFAULT_TIMEOUT,
        )?;
        logs.start_all(&root).await;
        registry = Some(logs);
    }

    let mut relay = None;
    if args.relay.enable {
        let mut settings = config.relay_settings()?;
        if let Some(listen) = &args.relay.listen {
            settings.listen_address = listen
                .parse()
                .with_context(|| format!("Invalid relay listen address: {}", listen))?;
        }

        let upstream = Arc::new(UdpUpstream::new(
            config.resolver_addrs()?,
            settings.upstream_timeout,
        )?);
        relay = Some(PassiveDnsRelay::start(&settings, upstream, scheduler.sender(), &root).await?);
    }

    info!("Columbus running, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown signal received");

    // Producers first, so the queue is not fed after the workers stop
    if let Some(mut logs) = registry {
        logs.close_all().await;
    }
    if let Some(relay) = relay {
        relay.shutdown().await;
    }
    scheduler.shutdown().await;
    root.cancel();

    Ok(())
}

fn start_scheduler(
    config: &AppConfig,
    store: Arc<dyn DomainStore>,
    parent: &CancellationToken,
) -> Result<UpdateScheduler> {
    let client = Arc::new(HickoryClient::new(&config.resolver_addrs()?, DNS_TIMEOUT)?);
    let resolver = Arc::new(RecordResolver::new(Arc::clone(&store), client));
    Ok(UpdateScheduler::start(
        store,
        resolver,
        config.scheduler_settings(),
        parent,
    ))
}

/// Checkpoint index against remote tree size, one line per log
async fn print_status(config: &AppConfig) -> Result<()> {
    // Cursors are only peeked at, nothing is ever queued
    let queue = UpdateQueue::new(1);
    let sources: Vec<LogSource> = config.log_sources();

    let registry = LogRegistry::new(
        sources,
        queue.sender(),
        config.cursor_settings(),
        client::DEFAULT_TIMEOUT,
    )?;

    for status in registry.peek_all().await {
        match status.last_error {
            Some(e) => println!("{}\t{}\terror: {}", status.name, status.index, e),
            None => {
                let pct = if status.size > 0 {
                    status.index as f64 * 100.0 / status.size as f64
                } else {
                    0.0
                };
                println!(
                    "{}\t{}/{}\t{:.2}%",
                    status.name, status.index, status.size, pct
                );
            }
        }
    }

    Ok(())
}
