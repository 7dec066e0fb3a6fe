// Update Scheduler Module
//
// Bounded update queue drained by a fixed worker pool. Producers are the
// CT harvester, the passive relay, the direct insert path and the two
// samplers.

pub mod queue;
pub mod samplers;
pub mod worker;

pub use queue::{JobKind, JobSender, UpdateJob, UpdateQueue};
pub use samplers::SamplerSettings;
pub use worker::WorkerPool;

use crate::db::DomainStore;
use crate::dns::RecordResolver;
use crate::utils::domain_name::DomainName;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Scheduler settings
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub samplers: SamplerSettings,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1000,
            samplers: SamplerSettings::default(),
        }
    }
}

/// Running scheduler
pub struct UpdateScheduler {
    queue: Arc<UpdateQueue>,
    store: Arc<dyn DomainStore>,
    settings: SchedulerSettings,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl UpdateScheduler {
    /// Start the worker pool under a child of `parent`
    pub fn start(
        store: Arc<dyn DomainStore>,
        resolver: Arc<RecordResolver>,
        settings: SchedulerSettings,
        parent: &CancellationToken,
    ) -> Self {
        let queue = Arc::new(UpdateQueue::new(settings.queue_capacity));
        let cancel = parent.child_token();

        let pool = Arc::new(WorkerPool::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            resolver,
        ));
        let handles = pool.spawn(settings.workers, cancel.clone());

        info!(
            "Update scheduler started (capacity {}, soft limit {})",
            settings.queue_capacity,
            queue.sender().soft_limit()
        );

        Self {
            queue,
            store,
            settings,
            cancel,
            handles,
        }
    }

    /// Start the stale and popular samplers
    pub fn start_samplers(&mut self) {
        let stale = tokio::spawn(samplers::run_stale_sampler(
            Arc::clone(&self.store),
            self.queue.sender(),
            self.settings.samplers.clone(),
            self.cancel.clone(),
        ));
        let popular = tokio::spawn(samplers::run_popular_sampler(
            Arc::clone(&self.store),
            self.queue.sender(),
            self.settings.samplers.clone(),
            self.cancel.clone(),
        ));
        self.handles.push(stale);
        self.handles.push(popular);
    }

    /// Producer handle for harvesters and the relay
    pub fn sender(&self) -> JobSender {
        self.queue.sender()
    }

    /// Jobs waiting in the queue
    pub fn depth(&self) -> usize {
        self.queue.len()
    }

    /// Validate and enqueue a name without waiting for resolution
    pub fn insert(&self, name: &str) -> crate::Result<()> {
        let domain = DomainName::parse(name)?;
        self.queue.sender().try_enqueue(UpdateJob::insert_new(domain.full()))
    }

    /// Wait until every queued job was picked up, then shut down. Jobs in
    /// progress run to completion.
    pub async fn drain(self) {
        while !self.queue.is_empty() && !self.cancel.is_cancelled() {
            tokio::time::sleep(DRAIN_POLL).await;
        }
        self.shutdown().await;
    }

    /// Cancel workers and samplers and wait for them to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Scheduler task failed: {}", e);
            }
        }
        info!("Update scheduler stopped");
    }
}
