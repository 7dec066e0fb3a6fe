// CT Log Cursor - resumable crawler for a single log
//
// Sizing -> Fetching -> Draining -> Idle(fetch interval) -> Sizing, until the
// cursor's cancellation token fires. Names found in certificates go to the
// update queue as InsertNew jobs.

use super::Result;
use super::checkpoint::Checkpoint;
use super::client::LogClient;
use super::parser::parse_entry;
use super::sources::LogSource;
use crate::error::ColumbusError;
use crate::scheduler::{JobSender, UpdateJob};
use crate::utils::sleep_or_cancelled;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Maximum page size most logs accept
pub const DEFAULT_STEP: u64 = 1000;

/// Added to the wait after every 429
pub const RATE_LIMIT_STEP: Duration = Duration::from_secs(10);

/// Pause after a timed out request
pub const TIMEOUT_PAUSE: Duration = Duration::from_secs(10);

/// Cursor tuning
#[derive(Debug, Clone)]
pub struct CursorSettings {
    /// Entries requested per page
    pub step: u64,
    /// Sleep between size checks once caught up
    pub fetch_interval: Duration,
    /// Period of the checkpoint saver
    pub save_interval: Duration,
    /// Directory holding `<name>.index` files
    pub working_dir: PathBuf,
    pub rate_limit_step: Duration,
    pub timeout_pause: Duration,
    /// Sleep step while the update queue is at its soft limit
    pub queue_backoff: Duration,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            fetch_interval: Duration::from_secs(3600),
            save_interval: Duration::from_secs(60),
            working_dir: PathBuf::from("."),
            rate_limit_step: RATE_LIMIT_STEP,
            timeout_pause: TIMEOUT_PAUSE,
            queue_backoff: Duration::from_secs(60),
        }
    }
}

/// Read-only snapshot of a cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStatus {
    pub name: String,
    pub uri: String,
    /// Next leaf not yet processed
    pub index: u64,
    /// Remote tree size as of the last check
    pub size: u64,
    /// Current rate limit backoff
    pub wait_secs: u64,
    pub last_error: Option<String>,
    pub running: bool,
}

#[derive(Debug, Default)]
struct CursorState {
    index: u64,
    size: u64,
    wait: Duration,
    last_error: Option<String>,
    running: bool,
}

struct CursorInner {
    source: LogSource,
    client: Arc<dyn LogClient>,
    settings: CursorSettings,
    checkpoint: Checkpoint,
    jobs: JobSender,
    state: RwLock<CursorState>,
}

/// Resumable crawler for one CT log
pub struct LogCursor {
    inner: Arc<CursorInner>,
    cancel: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
}

impl LogCursor {
    pub fn new(
        source: LogSource,
        client: Arc<dyn LogClient>,
        jobs: JobSender,
        settings: CursorSettings,
    ) -> Self {
        let checkpoint = Checkpoint::new(&settings.working_dir, &source.name);
        let settings = CursorSettings {
            step: settings.step.max(1),
            ..settings
        };

        Self {
            inner: Arc::new(CursorInner {
                source,
                client,
                settings,
                checkpoint,
                jobs,
                state: RwLock::new(CursorState::default()),
            }),
            cancel: None,
            handles: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.source.name
    }

    /// Load the checkpoint and the remote size without starting any task
    pub async fn peek(&self) -> Result<LogStatus> {
        let index = self.inner.checkpoint.load().await?;
        let size = self.inner.client.get_tree_size().await?;

        {
            let mut state = self.inner.state.write().await;
            state.index = index;
            state.size = size;
        }

        Ok(self.status().await)
    }

    /// Load the checkpoint, size the log and spawn the fetch loop and the
    /// checkpoint saver under a child of `parent`
    pub async fn start(&mut self, parent: &CancellationToken) -> Result<()> {
        if self.cancel.is_some() {
            return Ok(());
        }

        let name = &self.inner.source.name;
        let index = self.inner.checkpoint.load().await?;
        let size = match self.inner.client.get_tree_size().await {
            Ok(size) => size,
            Err(e) => {
                self.inner.state.write().await.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        info!(
            "{} -> starting at index {} of {} ({})",
            name, index, size, self.inner.source.uri
        );

        {
            let mut state = self.inner.state.write().await;
            state.index = index;
            state.size = size;
            state.wait = Duration::ZERO;
            state.last_error = None;
            state.running = true;
        }

        let cancel = parent.child_token();
        // The saver also stops when the fetch loop gives up on its own
        let saver_cancel = cancel.child_token();

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let saver_done = saver_cancel.clone();
        self.handles.push(tokio::spawn(async move {
            inner.fetch_loop(token).await;
            saver_done.cancel();
        }));

        let inner = Arc::clone(&self.inner);
        self.handles.push(tokio::spawn(async move {
            inner.saver_loop(saver_cancel).await
        }));

        self.cancel = Some(cancel);
        Ok(())
    }

    /// Cancel and wait until the fetch loop and saver exit
    pub async fn close(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("{} -> cursor task failed: {}", self.inner.source.name, e);
            }
        }
    }

    /// Spawned tasks that have not exited yet
    pub fn active_tasks(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub async fn status(&self) -> LogStatus {
        let state = self.inner.state.read().await;
        LogStatus {
            name: self.inner.source.name.clone(),
            uri: self.inner.source.uri.clone(),
            index: state.index,
            size: state.size,
            wait_secs: state.wait.as_secs(),
            last_error: state.last_error.clone(),
            running: state.running,
        }
    }
}

/// Outcome of processing one retrieved page
enum PageOutcome {
    Done { next: u64, names: usize },
    QueueClosed { next: u64 },
}

impl CursorInner {
    async fn fetch_loop(&self, cancel: CancellationToken) {
        let name = &self.source.name;
        let mut processed: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let (index, size, wait) = {
                let state = self.state.read().await;
                (state.index, state.size, state.wait)
            };

            if index >= size {
                if processed > 0 {
                    info!("{} -> finished parsing {} entries", name, processed);
                    processed = 0;
                    self.save_checkpoint().await;
                }

                if !sleep_or_cancelled(self.settings.fetch_interval, &cancel).await {
                    break;
                }

                let result = tokio::select! {
                    _ = cancel.cancelled() => break,
                    result = self.client.get_tree_size() => result,
                };
                match result {
                    Ok(new_size) => {
                        debug!("{} -> tree size {}", name, new_size);
                        self.state.write().await.size = new_size;
                    }
                    Err(e) => {
                        self.fail(format!("failed to get tree size: {}", e)).await;
                        break;
                    }
                }
                continue;
            }

            let end = (index + self.settings.step).min(size) - 1;

            let result = tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.client.get_entries(index, end) => result,
            };

            match result {
                Ok(entries) if entries.is_empty() => {
                    self.fail(format!("empty page for {}-{}", index, end)).await;
                    break;
                }
                Ok(entries) => {
                    let wanted = (end - index + 1) as usize;
                    let outcome = self
                        .process_page(index, &entries[..entries.len().min(wanted)], &cancel)
                        .await;

                    let mut state = self.state.write().await;
                    state.wait = Duration::ZERO;
                    match outcome {
                        PageOutcome::Done { next, names } => {
                            debug!(
                                "{} -> processed {}-{}, {} names",
                                name,
                                index,
                                next - 1,
                                names
                            );
                            processed += next - index;
                            state.index = next;
                        }
                        PageOutcome::QueueClosed { next } => {
                            state.index = next;
                            state.last_error = Some("update queue closed".to_string());
                            drop(state);
                            warn!("{} -> update queue closed, stopping", name);
                            break;
                        }
                    }
                }
                Err(ColumbusError::RateLimited { .. }) => {
                    let wait = wait + self.settings.rate_limit_step;
                    {
                        let mut state = self.state.write().await;
                        state.wait = wait;
                        state.last_error = Some("rate limited".to_string());
                    }
                    warn!("{} -> rate limited, waiting {:?}", name, wait);
                    if !sleep_or_cancelled(wait, &cancel).await {
                        break;
                    }
                }
                Err(ColumbusError::Timeout { .. }) => {
                    self.state.write().await.last_error = Some("timeout".to_string());
                    warn!(
                        "{} -> request timed out, retrying in {:?}",
                        name, self.settings.timeout_pause
                    );
                    if !sleep_or_cancelled(self.settings.timeout_pause, &cancel).await {
                        break;
                    }
                }
                Err(e) => {
                    self.fail(format!("failed to get entries {}-{}: {}", index, end, e))
                        .await;
                    break;
                }
            }
        }

        self.state.write().await.running = false;
        self.save_checkpoint().await;
        info!("{} -> fetch loop stopped", name);
    }

    /// Parse every leaf of a page starting at `start`. A leaf that fails to
    /// parse is skipped for good. Holds back while the queue is at its soft
    /// limit; once cancelled the rest of the page is enqueued without waiting.
    async fn process_page(
        &self,
        start: u64,
        entries: &[super::client::CtLogEntryResponse],
        cancel: &CancellationToken,
    ) -> PageOutcome {
        let name = &self.source.name;
        let mut next = start;
        let mut names = 0;

        for entry in entries {
            let index = next;
            next += 1;

            let parsed = match parse_entry(entry, index) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("{} -> skipping entry {}: {}", name, index, e);
                    continue;
                }
            };

            for domain in parsed.names {
                // Returns at once when cancelled, the page is still finished
                self.jobs
                    .wait_below_soft_limit(self.settings.queue_backoff, cancel)
                    .await;
                if self.jobs.enqueue(UpdateJob::insert_new(domain)).await.is_err() {
                    return PageOutcome::QueueClosed { next: index };
                }
                names += 1;
            }
        }

        PageOutcome::Done { next, names }
    }

    async fn fail(&self, message: String) {
        error!("{} -> {}", self.source.name, message);
        self.state.write().await.last_error = Some(message);
    }

    async fn save_checkpoint(&self) {
        let index = self.state.read().await.index;
        if let Err(e) = self.checkpoint.save(index).await {
            error!("{} -> failed to save checkpoint: {}", self.source.name, e);
        }
    }

    async fn saver_loop(&self, cancel: CancellationToken) {
        let mut last_saved: Option<u64> = None;

        while sleep_or_cancelled(self.settings.save_interval, &cancel).await {
            let (index, size) = {
                let state = self.state.read().await;
                (state.index, state.size)
            };

            // Caught up: the fetch loop saves when it drains
            if index >= size || last_saved == Some(index) {
                continue;
            }

            self.save_checkpoint().await;
            last_saved = Some(index);
        }
    }
}
