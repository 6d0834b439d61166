//! # Event Bus System
//!
//! Diagnostic channel for the miners, built on `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! A refresh publishes what happened while it ran: when it started, the
//! outcome of the stale-datasource sweep, the outcome of every per-account
//! job and how the refresh ended. Per-job failures are reported here rather
//! than failing the refresh, so a host that wants to surface them (a status
//! icon, a journal entry) subscribes to the bus.
//!
//! ```text
//! ┌───────────┐     emit      ┌───────────┐     subscribe    ┌────────────┐
//! │ Scheduler ├──────────────>│           ├─────────────────>│ Subscriber │
//! └───────────┘               │ EventBus  │                  └────────────┘
//! ┌───────────┐     emit      │ (broadcast│     subscribe    ┌────────────┐
//! │   Jobs    ├──────────────>│  channel) ├─────────────────>│ Subscriber │
//! └───────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, MinerEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(MinerEvent::RefreshCancelled {
//!     refresh_id: "r-1".to_string(),
//!     miner: "gd:media-server:miner".to_string(),
//! });
//!
//! let event = receiver.recv().await.unwrap();
//! assert_eq!(event.description(), "Refresh cancelled");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Slow subscribers receive `RecvError::Lagged(n)` and can keep reading;
//! `RecvError::Closed` means every bus handle was dropped.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::RecvError;
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Miner Events
// ============================================================================

/// Events published while a miner refreshes its accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum MinerEvent {
    /// A refresh pass began.
    RefreshStarted {
        refresh_id: String,
        /// Miner identifier of the engine running the pass.
        miner: String,
        /// Number of accounts that will get a job.
        qualifying_accounts: usize,
    },
    /// The stale-datasource sweep finished.
    SweepCompleted {
        refresh_id: String,
        /// Datasources whose resources were deleted.
        removed_datasources: Vec<String>,
    },
    /// The stale-datasource sweep failed; jobs still run.
    SweepFailed { refresh_id: String, message: String },
    /// One account's reconciliation job finished.
    JobCompleted {
        refresh_id: String,
        account_id: String,
        created: u64,
        updated: u64,
        deleted: u64,
        failed: u64,
    },
    /// One account's reconciliation job failed.
    JobFailed {
        refresh_id: String,
        account_id: String,
        message: String,
    },
    /// The sweep and every job have finished.
    RefreshCompleted {
        refresh_id: String,
        jobs_succeeded: usize,
        jobs_failed: usize,
        duration_ms: u64,
    },
    /// The refresh was cancelled before finishing.
    RefreshCancelled { refresh_id: String, miner: String },
}

impl MinerEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            MinerEvent::RefreshStarted { .. } => "Refresh started",
            MinerEvent::SweepCompleted { .. } => "Stale datasource sweep completed",
            MinerEvent::SweepFailed { .. } => "Stale datasource sweep failed",
            MinerEvent::JobCompleted { .. } => "Account job completed",
            MinerEvent::JobFailed { .. } => "Account job failed",
            MinerEvent::RefreshCompleted { .. } => "Refresh completed",
            MinerEvent::RefreshCancelled { .. } => "Refresh cancelled",
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            MinerEvent::JobFailed { .. } => EventSeverity::Error,
            MinerEvent::SweepFailed { .. } => EventSeverity::Warning,
            MinerEvent::RefreshCancelled { .. } => EventSeverity::Warning,
            MinerEvent::RefreshCompleted { .. } => EventSeverity::Info,
            MinerEvent::JobCompleted { .. } => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }

    /// The refresh pass this event belongs to.
    pub fn refresh_id(&self) -> &str {
        match self {
            MinerEvent::RefreshStarted { refresh_id, .. }
            | MinerEvent::SweepCompleted { refresh_id, .. }
            | MinerEvent::SweepFailed { refresh_id, .. }
            | MinerEvent::JobCompleted { refresh_id, .. }
            | MinerEvent::JobFailed { refresh_id, .. }
            | MinerEvent::RefreshCompleted { refresh_id, .. }
            | MinerEvent::RefreshCancelled { refresh_id, .. } => refresh_id,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast channel carrying [`MinerEvent`]s. Cheap to clone.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MinerEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event and returns how many subscribers received it.
    ///
    /// Publishing with no subscribers drops the event and returns 0.
    pub fn emit(&self, event: MinerEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new subscriber that receives all future events.
    pub fn subscribe(&self) -> Receiver<MinerEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&MinerEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional filter.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventSeverity, EventStream};
///
/// let bus = EventBus::new(100);
/// let errors = EventStream::new(bus.subscribe())
///     .filter(|event| event.severity() >= EventSeverity::Warning);
/// ```
pub struct EventStream {
    receiver: Receiver<MinerEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<MinerEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&MinerEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &MinerEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next matching event.
    pub async fn recv(&mut self) -> Result<MinerEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns the next matching event already buffered, if any.
    pub fn try_recv(&mut self) -> Option<Result<MinerEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
