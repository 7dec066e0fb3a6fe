// CT Log Checkpoints
//
// One file per log, `<working_dir>/<log name>.index`, holding the next leaf
// index as a decimal integer.

use super::Result;
use crate::error::ColumbusError;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Checkpoint {
    path: PathBuf,
}

impl Checkpoint {
    pub fn new(working_dir: &Path, log_name: &str) -> Self {
        Self {
            path: working_dir.join(format!("{}.index", log_name)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored index, 0 when no checkpoint exists yet
    pub async fn load(&self) -> Result<u64> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(ColumbusError::FileSystemError {
                    path: self.path.display().to_string(),
                    source: e,
                });
            }
        };

        contents.trim().parse::<u64>().map_err(|e| ColumbusError::ParseError {
            message: format!("Invalid checkpoint {}: {}", self.path.display(), e),
        })
    }

    /// Persist `index`; an index of 0 carries no progress and is not written
    pub async fn save(&self, index: u64) -> Result<()> {
        if index == 0 {
            return Ok(());
        }

        tokio::fs::write(&self.path, format!("{}\n", index))
            .await
            .map_err(|e| ColumbusError::FileSystemError {
                path: self.path.display().to_string(),
                source: e,
            })?;

        debug!("Saved checkpoint {} -> {}", self.path.display(), index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_checkpoint_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path(), "argon2026h2");
        assert_eq!(checkpoint.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path(), "argon2026h2");

        checkpoint.save(4242).await.unwrap();
        assert_eq!(checkpoint.load().await.unwrap(), 4242);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("argon2026h2.index")).unwrap(),
            "4242\n"
        );
    }

    #[tokio::test]
    async fn test_zero_is_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let checkpoint = Checkpoint::new(dir.path(), "xenon");

        checkpoint.save(0).await.unwrap();
        assert!(!checkpoint.path().exists());
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("oak.index"), "  17\n\n").unwrap();

        let checkpoint = Checkpoint::new(dir.path(), "oak");
        assert_eq!(checkpoint.load().await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("oak.index"), "seventeen").unwrap();

        let checkpoint = Checkpoint::new(dir.path(), "oak");
        assert!(checkpoint.load().await.is_err());
    }
}
