// CT Log Registry
//
// Owns every LogCursor and drives them together.

use super::Result;
use super::client::{CtClient, LogClient};
use super::cursor::{CursorSettings, LogCursor, LogStatus};
use super::sources::LogSource;
use crate::scheduler::JobSender;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub struct LogRegistry {
    cursors: Vec<LogCursor>,
}

impl LogRegistry {
    /// One cursor per source, each with its own HTTP client
    pub fn new(
        sources: Vec<LogSource>,
        jobs: JobSender,
        settings: CursorSettings,
        timeout: Duration,
    ) -> Result<Self> {
        let mut cursors = Vec::with_capacity(sources.len());
        for source in sources {
            let client: Arc<dyn LogClient> = Arc::new(CtClient::new(&source.uri, timeout)?);
            cursors.push(LogCursor::new(source, client, jobs.clone(), settings.clone()));
        }
        Ok(Self { cursors })
    }

    pub fn from_cursors(cursors: Vec<LogCursor>) -> Self {
        Self { cursors }
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    /// Start every cursor. A cursor that fails to start is logged and left
    /// stopped; the others keep going. Returns how many started.
    pub async fn start_all(&mut self, parent: &CancellationToken) -> usize {
        let mut started = 0;
        for cursor in &mut self.cursors {
            match cursor.start(parent).await {
                Ok(()) => started += 1,
                Err(e) => error!("{} -> failed to start: {}", cursor.name(), e),
            }
        }
        info!("Started {} of {} CT log cursors", started, self.cursors.len());
        started
    }

    /// Close every cursor and wait for its tasks
    pub async fn close_all(&mut self) {
        for cursor in &mut self.cursors {
            cursor.close().await;
        }
        info!("All CT log cursors stopped");
    }

    pub async fn statuses(&self) -> Vec<LogStatus> {
        let mut statuses = Vec::with_capacity(self.cursors.len());
        for cursor in &self.cursors {
            statuses.push(cursor.status().await);
        }
        statuses
    }

    /// Checkpoint index against remote size for every log, without crawling
    pub async fn peek_all(&self) -> Vec<LogStatus> {
        let mut statuses = Vec::with_capacity(self.cursors.len());
        for cursor in &self.cursors {
            match cursor.peek().await {
                Ok(status) => statuses.push(status),
                Err(e) => {
                    let mut status = cursor.status().await;
                    status.last_error = Some(e.to_string());
                    statuses.push(status);
                }
            }
        }
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::UpdateQueue;

    #[test]
    fn test_one_cursor_per_source() {
        let queue = UpdateQueue::new(10);
        let registry = LogRegistry::new(
            vec![
                LogSource::new("a", "https://a.example.com/"),
                LogSource::new("b", "https://b.example.com/"),
            ],
            queue.sender(),
            CursorSettings::default(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_invalid_uri_rejected() {
        let queue = UpdateQueue::new(10);
        let result = LogRegistry::new(
            vec![LogSource::new("bad", "not a url")],
            queue.sender(),
            CursorSettings::default(),
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }
}
