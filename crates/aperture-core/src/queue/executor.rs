//! Execution contexts for a single metadata write.
//!
//! A [`WriteJob`] owns everything the write needs, so it can be moved into an
//! isolated context without sharing memory with the queue. Results come back
//! over a oneshot channel.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::container::embed_snapshot;
use crate::error::{ContainerResult, ExecutorError};
use crate::types::{MetadataSnapshot, WriteTask};

/// Self-contained input for one metadata write.
#[derive(Debug, Clone)]
pub struct WriteJob {
    pub path: PathBuf,
    pub snapshot: MetadataSnapshot,
}

impl From<&WriteTask> for WriteJob {
    fn from(task: &WriteTask) -> Self {
        Self {
            path: task.path.clone(),
            snapshot: (*task.snapshot).clone(),
        }
    }
}

impl WriteJob {
    /// Perform the write in the current context.
    pub fn run(&self) -> ContainerResult<()> {
        embed_snapshot(&self.path, &self.snapshot)
    }
}

/// Runs write jobs somewhere.
///
/// `Err(ExecutorError::SpawnFailed)` means the job never started; the queue
/// then retries it inline. `Ok(Err(_))` means the write itself failed.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executor name for logging.
    fn name(&self) -> &str;

    /// Whether jobs run outside the caller's execution context.
    fn is_isolated(&self) -> bool;

    async fn execute(&self, job: WriteJob) -> Result<ContainerResult<()>, ExecutorError>;
}

/// Runs each job on a freshly spawned OS thread.
pub struct ThreadExecutor {
    thread_name: String,
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self {
            thread_name: "aperture-metadata-writer".to_string(),
        }
    }
}

#[async_trait]
impl Executor for ThreadExecutor {
    fn name(&self) -> &str {
        "thread"
    }

    fn is_isolated(&self) -> bool {
        true
    }

    async fn execute(&self, job: WriteJob) -> Result<ContainerResult<()>, ExecutorError> {
        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || {
                // Receiver gone means the queue is gone; nothing to report to.
                let _ = tx.send(job.run());
            })
            .map_err(|e| ExecutorError::SpawnFailed(e.to_string()))?;

        rx.await.map_err(|_| ExecutorError::Disconnected)
    }
}

/// Runs each job synchronously in the calling context.
#[derive(Default)]
pub struct InlineExecutor;

#[async_trait]
impl Executor for InlineExecutor {
    fn name(&self) -> &str {
        "inline"
    }

    fn is_isolated(&self) -> bool {
        false
    }

    async fn execute(&self, job: WriteJob) -> Result<ContainerResult<()>, ExecutorError> {
        Ok(job.run())
    }
}

/// Pick the best executor this environment supports.
///
/// Spawns and joins a no-op thread; if that fails, writes run inline.
pub fn detect_executor() -> Arc<dyn Executor> {
    let spawned = std::thread::Builder::new()
        .name("aperture-detect".to_string())
        .spawn(|| ())
        .map(|handle| handle.join().is_ok());

    match spawned {
        Ok(true) => Arc::new(ThreadExecutor::default()),
        Ok(false) | Err(_) => {
            tracing::warn!("Thread spawning unavailable, metadata writes will run inline");
            Arc::new(InlineExecutor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::embed::tests::{sample_snapshot, write_jpeg};
    use crate::container::read_metadata;
    use crate::error::ContainerError;
    use crate::types::LocationFix;
    use tempfile::TempDir;

    fn job(path: PathBuf) -> WriteJob {
        WriteJob {
            path,
            snapshot: sample_snapshot(Some(LocationFix::new(51.5074, -0.1278))),
        }
    }

    #[tokio::test]
    async fn test_thread_executor_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.jpg");
        write_jpeg(&path);

        let result = ThreadExecutor::default().execute(job(path.clone())).await.unwrap();
        assert!(result.is_ok());
        assert!((read_metadata(&path).unwrap().latitude.unwrap() - 51.5074).abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_write_failure_is_reported_not_spawn_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.jpg");
        std::fs::write(&path, b"nope").unwrap();

        let result = ThreadExecutor::default().execute(job(path)).await.unwrap();
        assert!(matches!(result, Err(ContainerError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_inline_executor_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("i.jpg");
        write_jpeg(&path);

        let executor = InlineExecutor;
        assert!(!executor.is_isolated());
        executor.execute(job(path.clone())).await.unwrap().unwrap();
        assert!(read_metadata(&path).is_some());
    }

    #[test]
    fn test_detect_prefers_threads() {
        assert!(detect_executor().is_isolated());
    }
}
