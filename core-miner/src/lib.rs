//! # Core Miner
//!
//! Engine-neutral reconciliation of online accounts into the index.
//!
//! ## Overview
//!
//! Every engine (media servers, Google Drive, ...) plugs a
//! [`MinerProvider`] into a [`Miner`]. A refresh sweeps stale datasources
//! on a serial queue, then runs one [`AccountMinerJob`] per qualifying
//! account. Each job diffs the provider's remote content against what the
//! index already holds for the account:
//!
//! - reported items are inserted or updated in place
//! - items no longer reported are deleted in one statement
//! - failures on single items are counted and skipped
//!
//! ## Components
//!
//! - [`miner`]: refresh scheduling and shared-content insertion
//! - [`job`]: one account's reconciliation
//! - [`sweep`]: stale datasource removal
//! - [`provider`]: the engine-specific seam
//! - [`store`]: index statements shared by the above

pub mod cancel;
pub mod error;
pub mod job;
pub mod miner;
pub mod provider;
pub mod registry;
pub mod resource;
pub mod store;
pub mod sweep;
pub mod urn;

pub use error::{MinerError, Result};
pub use job::{AccountMinerJob, JobStats};
pub use miner::{Miner, RefreshSummary};
pub use provider::{JobContext, MinerProvider, SharedContentRequest};
pub use registry::ProviderRegistry;
pub use resource::ResourceRecord;
pub use sweep::StaleDatasourceSweep;
