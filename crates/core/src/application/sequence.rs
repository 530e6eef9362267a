//! Targeted Task Sequence Manager
//!
//! Per-target FIFO serialization over a shared, bounded worker pool.
//!
//! Every target key maps to the tail of its chain of pending tasks. Submitting
//! a task atomically swaps the tail: the new task receives the completion
//! signal of its predecessor and installs its own. A task waits for that
//! signal, then for a pool permit, runs, and finally signals its successor.
//! No thread or lock object is dedicated to a target; a chain whose last task
//! has finished is removed from the map.
//!
//! Guarantees:
//! - at most one task per target runs at any instant
//! - tasks of one target run in submission order, whatever their outcome
//! - tasks of different targets run concurrently, bounded by the pool size

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{oneshot, Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// A unit of work serialized on its target key
#[async_trait]
pub trait TargetedTask: Send + Sync + 'static {
    /// Serialization key
    fn target(&self) -> &str;

    /// Name used in logs
    fn name(&self) -> String;

    /// Run to a terminal state. Outcomes are the task's own business;
    /// the manager only observes completion.
    async fn run(&self);

    /// Called when `run` panicked, so the task can still record an outcome
    async fn abandoned(&self, _reason: String) {}
}

/// Point-in-time scheduler counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceStats {
    pub pool_size: usize,
    pub active_targets: usize,
    pub running_tasks: usize,
    pub pending_tasks: usize,
}

struct ChainTail {
    seq: u64,
    done: oneshot::Receiver<()>,
}

#[derive(Default)]
struct Chains {
    next_seq: u64,
    tails: HashMap<String, ChainTail>,
}

pub struct TargetedTaskSequenceManager {
    chains: Arc<Mutex<Chains>>,
    pool: Arc<Semaphore>,
    pool_size: usize,
    running: Arc<AtomicUsize>,
    pending: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

fn lock(chains: &Mutex<Chains>) -> MutexGuard<'_, Chains> {
    // The map stays consistent even if a holder panicked: every critical
    // section is a single insert or remove.
    chains.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TargetedTaskSequenceManager {
    /// Create a manager with `pool_size` workers shared across all targets
    pub fn new(pool_size: usize) -> Self {
        let pool_size = pool_size.max(1);
        Self {
            chains: Arc::new(Mutex::new(Chains::default())),
            pool: Arc::new(Semaphore::new(pool_size)),
            pool_size,
            running: Arc::new(AtomicUsize::new(0)),
            pending: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Append `task` to the chain of its target.
    ///
    /// The returned handle completes when the task has finished (or, if it
    /// panicked, when the panic has been contained).
    pub fn submit(&self, task: Arc<dyn TargetedTask>) -> JoinHandle<()> {
        let target = task.target().to_string();
        let (done_tx, done_rx) = oneshot::channel();

        let (seq, predecessor) = {
            let mut chains = lock(&self.chains);
            chains.next_seq += 1;
            let seq = chains.next_seq;
            let previous = chains.tails.insert(
                target.clone(),
                ChainTail {
                    seq,
                    done: done_rx,
                },
            );
            (seq, previous.map(|tail| tail.done))
        };
        self.pending.fetch_add(1, Ordering::SeqCst);

        debug!(
            target = %target,
            task = %task.name(),
            queued_behind = predecessor.is_some(),
            "Task submitted"
        );

        let chains = Arc::clone(&self.chains);
        let pool = Arc::clone(&self.pool);
        let running = Arc::clone(&self.running);
        let pending = Arc::clone(&self.pending);
        let idle = Arc::clone(&self.idle);

        tokio::spawn(async move {
            if let Some(predecessor) = predecessor {
                // An Err means the predecessor's sender was dropped, which also
                // only happens once it is no longer running.
                let _ = predecessor.await;
            }

            let permit = match pool.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(e) => {
                    warn!(error = %e, "Worker pool closed, running task without permit");
                    None
                }
            };

            running.fetch_add(1, Ordering::SeqCst);
            let name = task.name();
            let runner = Arc::clone(&task);
            // Run on its own task so that a panic stays contained
            let outcome = tokio::spawn(async move { runner.run().await }).await;
            running.fetch_sub(1, Ordering::SeqCst);
            drop(permit);

            if let Err(join_err) = outcome {
                if join_err.is_panic() {
                    error!(task = %name, target = %target, "Task panicked: {:?}", join_err);
                } else {
                    error!(task = %name, target = %target, "Task cancelled: {:?}", join_err);
                }
                let reason = format!("Processing aborted unexpectedly: {}", join_err);
                let hook = tokio::spawn(async move { task.abandoned(reason).await }).await;
                if let Err(e) = hook {
                    error!(task = %name, target = %target, "Abandon hook failed: {:?}", e);
                }
            }

            {
                let mut chains = lock(&chains);
                if chains.tails.get(&target).map(|tail| tail.seq) == Some(seq) {
                    chains.tails.remove(&target);
                }
            }
            let _ = done_tx.send(());

            if pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                idle.notify_waiters();
            }
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Targets with at least one unfinished task
    pub fn active_targets(&self) -> usize {
        lock(&self.chains).tails.len()
    }

    /// Tasks currently holding a worker
    pub fn running_tasks(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Tasks submitted and not yet finished (running or waiting)
    pub fn pending_tasks(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SequenceStats {
        SequenceStats {
            pool_size: self.pool_size,
            active_targets: self.active_targets(),
            running_tasks: self.running_tasks(),
            pending_tasks: self.pending_tasks(),
        }
    }

    /// Wait until no task is pending
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Wait until no task is pending, at most `timeout`; true if idle
    pub async fn drain(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait_idle()).await.is_ok()
    }
}
