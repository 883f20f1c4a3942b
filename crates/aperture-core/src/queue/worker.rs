//! The FIFO metadata write queue and its single background worker.
//!
//! `enqueue` appends to an unbounded channel and returns immediately. One
//! worker task drains the channel strictly in order, awaiting each write
//! before pulling the next, so at most one write is in flight per queue.
//! Failed writes are logged and dropped; nothing is retried.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use super::executor::{Executor, WriteJob};
use crate::container::embed::remove_temp;
use crate::error::ExecutorError;
use crate::types::{MetadataSnapshot, WriteTask};

/// What happened to a task after its single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Metadata written; `isolated` is false when the write ran inline
    Written { isolated: bool },
    /// The target file was gone before the write started
    Discarded,
    /// The write failed; the original file is unchanged
    Failed(String),
}

/// Optional hook notified after every attempt.
pub trait WriteObserver: Send + Sync {
    fn on_finished(&self, task: &WriteTask, outcome: &WriteOutcome);
}

/// Observable queue state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Nothing queued or in flight
    Idle,
    /// The worker is processing tasks
    Draining,
    /// `drain_and_stop` has been called and all accepted work is done
    Stopped,
}

#[derive(Default)]
struct Shared {
    /// Accepted tasks not yet finished (queued + in flight)
    depth: AtomicUsize,
    accepting: AtomicBool,
    idle: Notify,
}

/// Serializes all metadata container rewrites.
///
/// Must be created inside a tokio runtime; the worker is spawned on construction.
pub struct MetadataWriteQueue {
    sender: Mutex<Option<mpsc::UnboundedSender<WriteTask>>>,
    worker: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    shared: Arc<Shared>,
}

impl MetadataWriteQueue {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self::with_observer(executor, None)
    }

    pub fn with_observer(
        executor: Arc<dyn Executor>,
        observer: Option<Arc<dyn WriteObserver>>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::default());
        shared.accepting.store(true, Ordering::SeqCst);

        tracing::debug!("Starting metadata write queue ({} executor)", executor.name());
        let worker = tokio::spawn(run_worker(rx, executor, observer, shared.clone()));

        Self {
            sender: Mutex::new(Some(tx)),
            worker: tokio::sync::Mutex::new(Some(worker)),
            shared,
        }
    }

    /// Queue a metadata write for `path`. Fire-and-forget.
    ///
    /// Returns false (and logs) if the queue has been stopped.
    pub fn enqueue(
        &self,
        path: impl Into<PathBuf>,
        snapshot: impl Into<Arc<MetadataSnapshot>>,
    ) -> bool {
        self.enqueue_task(WriteTask::new(path, snapshot.into()))
    }

    pub fn enqueue_task(&self, task: WriteTask) -> bool {
        let guard = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(sender) = guard.as_ref() else {
            tracing::warn!("Metadata queue stopped, not writing metadata for {:?}", task.path);
            return false;
        };

        self.shared.depth.fetch_add(1, Ordering::SeqCst);
        match sender.send(task) {
            Ok(()) => true,
            Err(mpsc::error::SendError(task)) => {
                finish_one(&self.shared);
                tracing::warn!("Metadata worker gone, not writing metadata for {:?}", task.path);
                false
            }
        }
    }

    /// Tasks accepted but not yet finished, including the one in flight.
    pub fn queue_depth(&self) -> usize {
        self.shared.depth.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> QueueState {
        let depth = self.queue_depth();
        if depth > 0 {
            QueueState::Draining
        } else if self.shared.accepting.load(Ordering::SeqCst) {
            QueueState::Idle
        } else {
            QueueState::Stopped
        }
    }

    /// Wait until every accepted task has been attempted.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.queue_depth() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting work, let queued and in-flight writes finish, then stop the worker.
    pub async fn drain_and_stop(&self) {
        self.shared.accepting.store(false, Ordering::SeqCst);
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        // Closing the channel lets the worker exit once it has drained the backlog.
        drop(sender);

        let handle = self.worker.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Metadata worker terminated abnormally: {e}");
            }
        }
        tracing::debug!("Metadata write queue stopped");
    }
}

fn finish_one(shared: &Shared) {
    if shared.depth.fetch_sub(1, Ordering::SeqCst) == 1 {
        shared.idle.notify_waiters();
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<WriteTask>,
    executor: Arc<dyn Executor>,
    observer: Option<Arc<dyn WriteObserver>>,
    shared: Arc<Shared>,
) {
    while let Some(task) = rx.recv().await {
        let outcome = process_task(executor.as_ref(), &task).await;
        if let Some(observer) = &observer {
            observer.on_finished(&task, &outcome);
        }
        finish_one(&shared);
    }
}

/// Attempt one task exactly once.
async fn process_task(executor: &dyn Executor, task: &WriteTask) -> WriteOutcome {
    if !tokio::fs::try_exists(&task.path).await.unwrap_or(false) {
        tracing::debug!("{:?} was deleted before its metadata was written, discarding", task.path);
        return WriteOutcome::Discarded;
    }

    let (result, isolated) = match executor.execute(WriteJob::from(task)).await {
        Ok(result) => (result.map_err(|e| e.to_string()), executor.is_isolated()),
        Err(ExecutorError::SpawnFailed(reason)) => {
            tracing::warn!(
                "{} executor could not start ({reason}), writing {:?} inline",
                executor.name(),
                task.path
            );
            (WriteJob::from(task).run().map_err(|e| e.to_string()), false)
        }
        Err(e) => (Err(e.to_string()), executor.is_isolated()),
    };

    match result {
        Ok(()) => {
            let waited = chrono::Utc::now() - task.enqueued_at;
            tracing::debug!(
                "Metadata written for {:?} ({}ms after enqueue)",
                task.path,
                waited.num_milliseconds()
            );
            WriteOutcome::Written { isolated }
        }
        Err(message) => {
            remove_temp(&task.path);
            tracing::error!("Dropping metadata write for {:?}: {}", task.path, message);
            WriteOutcome::Failed(message)
        }
    }
}
