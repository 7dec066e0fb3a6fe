// Samplers - periodic producers for the update queue
//
// The stale sampler re-checks names not resolved for a long time, the
// popular sampler keeps frequently requested domains fresh. Both respect the
// queue's soft limit so the direct insert path always finds room.

use super::queue::{JobSender, UpdateJob};
use crate::db::DomainStore;
use crate::utils::sleep_or_cancelled;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sampler timing and sizing
#[derive(Debug, Clone)]
pub struct SamplerSettings {
    /// Names not updated for this many days are stale
    pub stale_after_days: i64,
    /// Rows taken per sample
    pub sample_size: i64,
    /// Sleep step while the queue is at its soft limit
    pub backoff: Duration,
    /// Pause after a store error
    pub error_pause: Duration,
    /// Pause when the stale sample came back empty
    pub idle_interval: Duration,
    /// Pause between popular-domain passes
    pub popular_interval: Duration,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            stale_after_days: 30,
            sample_size: 1000,
            backoff: Duration::from_secs(60),
            error_pause: Duration::from_secs(600),
            idle_interval: Duration::from_secs(3600),
            popular_interval: Duration::from_secs(3600),
        }
    }
}

/// Enqueue `Refresh` jobs for a batch of names, holding back at the soft limit.
/// Returns false when cancelled.
async fn feed(
    names: Vec<String>,
    sender: &JobSender,
    settings: &SamplerSettings,
    cancel: &CancellationToken,
) -> bool {
    for name in names {
        if !sender.wait_below_soft_limit(settings.backoff, cancel).await {
            return false;
        }

        let sent = tokio::select! {
            _ = cancel.cancelled() => return false,
            sent = sender.enqueue(UpdateJob::refresh(name)) => sent,
        };
        if sent.is_err() {
            return false;
        }
    }
    true
}

/// Stale-domain sampler loop
pub async fn run_stale_sampler(
    store: Arc<dyn DomainStore>,
    sender: JobSender,
    settings: SamplerSettings,
    cancel: CancellationToken,
) {
    info!(
        "Stale sampler started (older than {} days, {} per sample)",
        settings.stale_after_days, settings.sample_size
    );

    loop {
        if !sender.wait_below_soft_limit(settings.backoff, &cancel).await {
            break;
        }

        let names = match store
            .sample_stale(settings.stale_after_days, settings.sample_size)
            .await
        {
            Ok(names) => names,
            Err(e) => {
                warn!("Stale sampler failed to sample: {}", e);
                if !sleep_or_cancelled(settings.error_pause, &cancel).await {
                    break;
                }
                continue;
            }
        };

        if names.is_empty() {
            debug!("Stale sampler found nothing to refresh");
            if !sleep_or_cancelled(settings.idle_interval, &cancel).await {
                break;
            }
            continue;
        }

        debug!("Stale sampler queued {} name(s)", names.len());
        if !feed(names, &sender, &settings, &cancel).await {
            break;
        }
    }

    info!("Stale sampler stopped");
}

/// Popular-domain sampler loop
pub async fn run_popular_sampler(
    store: Arc<dyn DomainStore>,
    sender: JobSender,
    settings: SamplerSettings,
    cancel: CancellationToken,
) {
    info!("Popular sampler started");

    'outer: loop {
        match store.toplist_sample(settings.sample_size).await {
            Ok(entries) => {
                for entry in entries {
                    let hostnames = match store.full_hostnames_of(&entry.domain, -1).await {
                        Ok(hostnames) => hostnames,
                        Err(e) => {
                            warn!("{} -> failed to list hostnames: {}", entry.domain, e);
                            continue;
                        }
                    };

                    if !feed(hostnames, &sender, &settings, &cancel).await {
                        break 'outer;
                    }
                }
            }
            Err(e) => {
                warn!("Popular sampler failed to sample: {}", e);
                if !sleep_or_cancelled(settings.error_pause, &cancel).await {
                    break;
                }
                continue;
            }
        }

        if !sleep_or_cancelled(settings.popular_interval, &cancel).await {
            break;
        }
    }

    info!("Popular sampler stopped");
}
