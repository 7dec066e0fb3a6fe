// Update Workers - Background job processor

use super::queue::{JobKind, UpdateJob, UpdateQueue};
use crate::db::DomainStore;
use crate::dns::RecordResolver;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fixed pool of workers draining the update queue
pub struct WorkerPool {
    queue: Arc<UpdateQueue>,
    store: Arc<dyn DomainStore>,
    resolver: Arc<RecordResolver>,
}

impl WorkerPool {
    pub fn new(
        queue: Arc<UpdateQueue>,
        store: Arc<dyn DomainStore>,
        resolver: Arc<RecordResolver>,
    ) -> Self {
        Self {
            queue,
            store,
            resolver,
        }
    }

    /// Spawn `workers` tasks; each stops when `cancel` fires
    pub fn spawn(self: Arc<Self>, workers: usize, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        info!("Starting {} update worker(s)", workers);

        (0..workers.max(1))
            .map(|id| {
                let pool = Arc::clone(&self);
                let cancel = cancel.clone();
                tokio::spawn(async move { pool.run(id, cancel).await })
            })
            .collect()
    }

    async fn run(&self, id: usize, cancel: CancellationToken) {
        loop {
            let job = tokio::select! {
                _ = cancel.cancelled() => break,
                job = self.queue.dequeue() => job,
            };

            let Some(job) = job else { break };
            self.execute(job).await;
        }

        debug!("Update worker {} stopped", id);
    }

    /// Run one job; failures are logged and never stop the worker
    pub async fn execute(&self, job: UpdateJob) {
        if job.kind == JobKind::InsertNew {
            match self.store.insert_domain(&job.domain).await {
                Ok(true) => debug!("{} -> new domain", job.domain),
                Ok(false) => {}
                Err(e) if e.is_validation() => {
                    debug!("{} -> rejected: {}", job.domain, e);
                    return;
                }
                Err(e) => {
                    warn!("{} -> insert failed: {}", job.domain, e);
                    return;
                }
            }
        }

        if let Err(e) = self.resolver.resolve(&job.domain, true, false).await {
            warn!("{} -> resolve failed: {}", job.domain, e);
        }
    }
}
