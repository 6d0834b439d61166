//! # Google Drive Provider
//!
//! Document engine for Google accounts, backed by the Drive API v3.
//!
//! ## Overview
//!
//! This crate provides:
//! - Paginated listing of every non-trashed, non-folder file of an account
//! - Mapping of Drive files to `nfo:Document` index records
//! - Resolution of documents shared with the user from another resource
//!
//! ## Usage
//!
//! ```ignore
//! use core_miner::Miner;
//! use provider_google_drive::GoogleDriveMiner;
//!
//! let engine = GoogleDriveMiner::from_config(&config)?;
//! let miner = Miner::new(Arc::new(engine), &config, events);
//! let summary = miner.refresh_db(cancel).await?;
//! ```
//!
//! Access tokens come from `AccountDirectory::access_token`; accounts whose
//! token is unavailable fail their job with an authentication error.

pub mod connector;
pub mod error;
pub mod miner;
pub mod types;

pub use connector::GoogleDriveConnector;
pub use error::{GoogleDriveError, Result};
pub use miner::{
    document_record, GoogleDriveMiner, MINER_IDENTIFIER, MINER_VERSION, PROVIDER_TYPE, RESOURCE_KIND,
};
pub use types::{DriveFile, FilesListResponse};
