//! # Host Bridge Traits
//!
//! The external collaborators of the miners, expressed as traits that each
//! host implements.
//!
//! ## Overview
//!
//! The miners orchestrate; they do not own accounts, storage or remote
//! protocols. Everything they talk to is reached through one of these
//! seams, so the reconciliation logic can be exercised against in-memory
//! doubles and shipped against real services.
//!
//! ## Traits
//!
//! ### Accounts
//! - [`AccountDirectory`](accounts::AccountDirectory) - Configured online accounts and their capabilities
//!
//! ### Storage
//! - [`IndexConnection`](index::IndexConnection) - Semantic index updates and queries
//!
//! ### Remote content
//! - [`CatalogConnector`](catalog::CatalogConnector) - Media server lookup and container proxies
//! - [`HttpClient`](http::HttpClient) - Async HTTP for cloud providers
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//! - [`RetryPolicy`](retry::RetryPolicy) - Bounded exponential backoff
//!
//! ## Host Implementations
//!
//! | Host     | Implementation Crate | Status |
//! |----------|----------------------|--------|
//! | Desktop  | `bridge-desktop`     | ✅ SQLite index, JSON accounts, reqwest |
//! | D-Bus    | TBD                  | 📋 Planned |
//!
//! ## Error Handling
//!
//! Every trait reports failures as [`BridgeError`](error::BridgeError). The
//! miner core maps those onto its own taxonomy at the call site: index
//! reads become query failures, index writes become update failures, and
//! catalog failures become proxy failures.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync`; a single index connection is
//! shared by every concurrently running job.

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod http;
pub mod index;
pub mod logging;
pub mod retry;

pub use error::BridgeError;

// Re-export commonly used types
pub use accounts::{Account, AccountDirectory, ContentKind};
pub use catalog::{
    BusType, CatalogConnector, CatalogContainer, CatalogObject, PropertyValue, ServerDescriptor,
    DLEYNA_SERVER_NAME,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use index::{IndexConnection, IndexCursor, IndexRow, Query, Term, Update};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use retry::RetryPolicy;
