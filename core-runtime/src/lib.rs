//! # Core Runtime Module
//!
//! Ambient infrastructure shared by the miners:
//! - Configuration (`MinerConfig` builder with fail-fast validation)
//! - Logging and tracing setup
//! - Diagnostic event bus
//!
//! ## Overview
//!
//! Nothing in here knows how reconciliation works. Engines read their
//! settings and bridges from [`config::MinerConfig`], log through `tracing`
//! and publish per-job outcomes on an [`events::EventBus`].

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{MinerConfig, MinerConfigBuilder};
pub use error::{Error, Result};
pub use events::{EventBus, MinerEvent};
