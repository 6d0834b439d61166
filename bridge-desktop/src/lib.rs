//! # Desktop Bridge Implementations
//!
//! Default implementations of the bridge traits for a desktop session.
//!
//! ## Overview
//!
//! - `IndexConnection` using a SQLite triple store (`sqlx`)
//! - `AccountDirectory` reading a JSON account file
//! - `HttpClient` using `reqwest`
//!
//! The remote catalog connector is not provided here; media-server hosts
//! inject their own D-Bus-backed `CatalogConnector`.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonAccountDirectory, ReqwestHttpClient, SqliteIndex};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let index = SqliteIndex::open("/tmp/miners/index.db".as_ref()).await?;
//!     let accounts = JsonAccountDirectory::new("/tmp/miners/accounts.json");
//!     let http = ReqwestHttpClient::new()?;
//!
//!     // Hand these to the miner configuration
//!     Ok(())
//! }
//! ```

mod accounts;
mod http;
mod index;

pub use accounts::JsonAccountDirectory;
pub use http::ReqwestHttpClient;
pub use index::SqliteIndex;
