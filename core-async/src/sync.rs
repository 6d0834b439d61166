//! Synchronization primitives.
//!
//! Async-aware locks and channels from `tokio::sync`, the
//! [`CancellationToken`] used to stop a refresh and every job it spawned,
//! and [`select!`] for racing a future against cancellation.
//!
//! ```rust
//! use core_async::sync::{CancellationToken, Mutex};
//!
//! async fn example() {
//!     let counter = Mutex::new(0);
//!     *counter.lock().await += 1;
//!
//!     let parent = CancellationToken::new();
//!     let child = parent.child_token();
//!     parent.cancel();
//!     assert!(child.is_cancelled());
//! }
//! ```

pub use tokio::sync::{
    broadcast, mpsc, oneshot, watch, Mutex, MutexGuard, Notify, RwLock, RwLockReadGuard,
    RwLockWriteGuard, Semaphore, SemaphorePermit,
};

pub use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

pub use tokio::select;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::{sleep, Duration};

    #[tokio::test]
    async fn test_select_prefers_cancellation() {
        let token = CancellationToken::new();
        token.cancel();

        let winner = crate::select! {
            biased;
            _ = token.cancelled() => "cancelled",
            _ = sleep(Duration::from_secs(30)) => "slept",
        };
        assert_eq!(winner, "cancelled");
    }
}
