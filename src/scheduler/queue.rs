// Update Queue Implementation

use crate::error::ColumbusError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// What a worker does with a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobKind {
    /// Create the identity, then resolve it
    InsertNew,
    /// Resolve an already known name again
    Refresh,
}

/// Update job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJob {
    pub domain: String,
    pub kind: JobKind,
}

impl UpdateJob {
    pub fn insert_new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            kind: JobKind::InsertNew,
        }
    }

    pub fn refresh(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            kind: JobKind::Refresh,
        }
    }
}

/// Producer side of the bounded update queue
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::Sender<UpdateJob>,
    capacity: usize,
}

impl JobSender {
    /// Enqueue, waiting for room
    pub async fn enqueue(&self, job: UpdateJob) -> crate::Result<()> {
        self.tx.send(job).await.map_err(|_| ColumbusError::ChannelClosed {
            details: "update queue".to_string(),
        })
    }

    /// Enqueue without waiting; a full queue is `QueueFull`
    pub fn try_enqueue(&self, job: UpdateJob) -> crate::Result<()> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ColumbusError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => ColumbusError::ChannelClosed {
                details: "update queue".to_string(),
            },
        })
    }

    /// Jobs currently waiting
    pub fn depth(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Depth at which every producer but direct insert holds back
    pub fn soft_limit(&self) -> usize {
        (self.capacity / 2).max(1)
    }

    /// Sleep in `backoff` steps while the queue is at or above the soft
    /// limit, so one enqueue afterwards keeps depth within it.
    /// Returns false when cancelled.
    pub async fn wait_below_soft_limit(
        &self,
        backoff: Duration,
        cancel: &CancellationToken,
    ) -> bool {
        while self.depth() >= self.soft_limit() {
            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(backoff) => {}
            }
        }
        !cancel.is_cancelled()
    }
}

/// Bounded queue shared by producers and the worker pool
pub struct UpdateQueue {
    sender: JobSender,
    rx: Arc<Mutex<mpsc::Receiver<UpdateJob>>>,
}

impl UpdateQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        Self {
            sender: JobSender { tx, capacity },
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    pub fn sender(&self) -> JobSender {
        self.sender.clone()
    }

    /// Next job, `None` once every sender is gone
    pub async fn dequeue(&self) -> Option<UpdateJob> {
        self.rx.lock().await.recv().await
    }

    pub fn len(&self) -> usize {
        self.sender.depth()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
