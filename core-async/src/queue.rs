//! # Serial Queue
//!
//! A single-worker task queue. Futures submitted to a [`SerialQueue`] run one
//! at a time, in submission order, on a dedicated worker task. Clones share
//! the same worker, so every holder of a clone is serialized against every
//! other holder.
//!
//! The miner scheduler owns one of these for the stale-datasource sweep: two
//! refreshes that overlap still never sweep the same rows concurrently.
//!
//! The worker is spawned on the runtime of the first submission. If that
//! runtime shuts down, the worker goes with it and the next submission
//! starts a new one on the caller's runtime. Jobs that were still queued on
//! the old worker are lost and their callers see [`QueueClosed`].
//!
//! ## Usage
//!
//! ```rust
//! use core_async::queue::SerialQueue;
//!
//! # async fn example() -> Result<(), core_async::queue::QueueClosed> {
//! let queue = SerialQueue::new("cleanup");
//! let answer = queue.run(async { 21 * 2 }).await?;
//! assert_eq!(answer, 42);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

type QueuedJob = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Returned when the queue worker is gone and a submitted future will never
/// run (or its result was lost because it panicked).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("serial queue worker is no longer running")]
pub struct QueueClosed;

/// Single-worker queue that runs submitted futures strictly one at a time.
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    // Sender of the live worker. Empty until the first submission, replaced
    // once the worker's runtime is gone.
    sender: Mutex<Option<mpsc::UnboundedSender<QueuedJob>>>,
}

impl SerialQueue {
    /// Creates a queue. The worker task is started lazily on first use, so
    /// construction works outside of a runtime.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                sender: Mutex::new(None),
            }),
        }
    }

    /// Queue name, used in log output.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Enqueues `future` and returns a receiver for its output.
    ///
    /// The future starts only after every previously submitted future has
    /// finished. Fails with [`QueueClosed`] when called outside of a runtime
    /// and no worker is running.
    pub fn submit<F, T>(&self, future: F) -> Result<oneshot::Receiver<T>, QueueClosed>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: QueuedJob = Box::pin(async move {
            // The caller may have stopped waiting; nothing to do then.
            let _ = tx.send(future.await);
        });

        let mut slot = match self.inner.sender.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sender = match slot.take() {
            Some(sender) if !sender.is_closed() => sender,
            previous => {
                if previous.is_some() {
                    warn!(queue = %self.inner.name, "Serial queue worker is gone, restarting");
                }
                self.start_worker()?
            }
        };

        let sent = sender.send(job).map_err(|_| QueueClosed);
        *slot = Some(sender);
        sent?;
        Ok(rx)
    }

    /// Enqueues `future` and waits for it to run to completion.
    pub async fn run<F, T>(&self, future: F) -> Result<T, QueueClosed>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let receiver = self.submit(future)?;
        receiver.await.map_err(|_| QueueClosed)
    }

    /// Spawns a worker on the current runtime and returns its sender.
    fn start_worker(&self) -> Result<mpsc::UnboundedSender<QueuedJob>, QueueClosed> {
        let runtime = Handle::try_current().map_err(|_| QueueClosed)?;
        let (sender, mut receiver) = mpsc::unbounded_channel::<QueuedJob>();

        let name = self.inner.name.clone();
        runtime.spawn(async move {
            debug!(queue = %name, "Serial queue worker started");
            while let Some(job) = receiver.recv().await {
                // Each job runs in its own task so a panic is contained and
                // the worker keeps draining the queue.
                if let Err(err) = tokio::spawn(job).await {
                    warn!(queue = %name, error = %err, "Queued job did not complete");
                }
            }
            debug!(queue = %name, "Serial queue worker stopped");
        });
        Ok(sender)
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("name", &self.inner.name)
            .finish()
    }
}
