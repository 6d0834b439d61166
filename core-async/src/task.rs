//! Task spawning and execution.
//!
//! Thin wrappers over `tokio::task`. Reconciliation jobs are spawned onto the
//! shared worker pool with [`spawn`] and collected through a [`JoinSet`].
//!
//! # Examples
//!
//! ```rust
//! use core_async::task::{self, JoinSet};
//!
//! async fn example() {
//!     let mut set = JoinSet::new();
//!     for n in 0..3 {
//!         set.spawn(async move { n * 2 });
//!     }
//!
//!     let mut total = 0;
//!     while let Some(result) = set.join_next().await {
//!         total += result.unwrap();
//!     }
//!     assert_eq!(total, 6);
//! }
//! ```

pub use tokio::task::{spawn_blocking, yield_now, JoinError, JoinHandle, JoinSet};

/// Spawns a new asynchronous task on the Tokio runtime.
///
/// The spawned task may run on a different worker thread than the caller.
pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: std::future::Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::task::spawn(future)
}

/// Result type for task operations.
pub type Result<T> = std::result::Result<T, JoinError>;
