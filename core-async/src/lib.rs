//! Async runtime facade for the online miners.
//!
//! Every miner crate goes through this crate instead of naming Tokio
//! directly, so the executor choice stays in one place.
//!
//! # Modules
//!
//! - `task`: task spawning, join handles and join sets
//! - `time`: sleep, timeout and instants
//! - `sync`: locks, channels, [`CancellationToken`](sync::CancellationToken)
//!   and `select!`
//! - `runtime`: runtime handles and `block_on`
//! - `queue`: [`SerialQueue`](queue::SerialQueue), a single-worker queue that
//!   runs submitted futures one at a time
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub mod queue;
pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use queue::{QueueClosed, SerialQueue};
pub use sync::select;
pub use task::spawn;
pub use time::{sleep, Duration, Instant};
