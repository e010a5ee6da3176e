//! Bounded background queue feeding a semantic index.
//!
//! Enqueueing never blocks the caller: when the queue is full or the worker
//! has stopped, the job is dropped and counted.

use crate::provider::SemanticSearch;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct IndexJob {
    path: String,
    content: String,
}

/// Counters describing queue throughput.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct IndexStats {
    pub enqueued: u64,
    pub indexed: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    enqueued: AtomicU64,
    indexed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> IndexStats {
        IndexStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            indexed: self.indexed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Handle to the indexing worker.
pub struct IndexQueue {
    sender: Mutex<Option<mpsc::Sender<IndexJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
}

impl IndexQueue {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(target: Arc<dyn SemanticSearch>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<IndexJob>(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker_counters = counters.clone();
        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                match target.index(&job.path, &job.content).await {
                    Ok(()) => {
                        worker_counters.indexed.fetch_add(1, Ordering::Relaxed);
                        debug!("indexed document (path={})", job.path);
                    }
                    Err(err) => {
                        worker_counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!("failed to index document (path={}): {err}", job.path);
                    }
                }
            }
            debug!("index worker stopped");
        });
        info!("started index queue (capacity={})", capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
            counters,
        }
    }

    /// Queue a document for indexing. Returns false when the job was dropped.
    pub fn enqueue(&self, path: impl Into<String>, content: impl Into<String>) -> bool {
        let job = IndexJob {
            path: path.into(),
            content: content.into(),
        };
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("index queue closed, dropping job (path={})", job.path);
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("index queue full, dropping job (path={})", job.path);
                false
            }
            Err(TrySendError::Closed(job)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("index worker gone, dropping job (path={})", job.path);
                false
            }
        }
    }

    pub fn stats(&self) -> IndexStats {
        self.counters.snapshot()
    }

    /// Stop accepting jobs, drain what is queued, and wait for the worker.
    pub async fn shutdown(&self) -> IndexStats {
        drop(self.sender.lock().take());
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                error!("index worker panicked: {err}");
            }
        }
        let stats = self.stats();
        info!(
            "index queue shut down (indexed={}, failed={}, dropped={})",
            stats.indexed, stats.failed, stats.dropped
        );
        stats
    }
}
