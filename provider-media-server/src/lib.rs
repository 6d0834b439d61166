//! # Media Server Provider
//!
//! Indexes the photos of DLNA/UPnP media servers exposed as online
//! accounts. Each account names its server by UDN; the server is reached
//! through a [`CatalogConnector`](bridge_traits::catalog::CatalogConnector)
//! and crawled by [`ContentCrawler`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! let provider = MediaServerMiner::from_config(&config)?;
//! let miner = Miner::new(Arc::new(provider), &config, events);
//! miner.refresh_db(cancel).await?;
//! ```

pub mod crawler;
pub mod error;
pub mod miner;
pub mod server;
pub mod types;

#[cfg(test)]
mod testing;

pub use crawler::ContentCrawler;
pub use error::{MediaServerError, Result};
pub use miner::{MediaServerMiner, MINER_IDENTIFIER, PROVIDER_TYPE};
pub use server::{CatalogEndpoint, DlnaServer};
pub use types::{ContentItem, ItemKind};
