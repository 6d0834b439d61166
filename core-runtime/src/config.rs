//! # Miner Configuration
//!
//! Builder-based configuration for the online miners.
//!
//! ## Overview
//!
//! [`MinerConfig`] holds the settings shared by every engine (which content
//! kinds this process indexes, crawl and retry bounds) together with the
//! bridge implementations the engines talk to. The builder validates
//! everything up front and fails fast with actionable messages.
//!
//! ## Required Dependencies
//!
//! - `AccountDirectory` - configured online accounts
//! - `IndexConnection` - the semantic index
//!
//! ## Optional Dependencies
//!
//! - `HttpClient` - required by cloud providers (Google Drive)
//! - `CatalogConnector` - required by the media-server provider
//!
//! With the `desktop-shims` feature a JSON account directory is injected when
//! none is provided, and [`MinerConfigBuilder::build_async`] opens a SQLite
//! index at `database_path`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::MinerConfig;
//! use std::sync::Arc;
//!
//! let config = MinerConfig::builder()
//!     .index_type_names(["photos"])?
//!     .account_directory(Arc::new(MyDirectory))
//!     .index(Arc::new(MyIndex))
//!     .crawl_max_depth(16)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{
    accounts::{AccountDirectory, ContentKind},
    catalog::CatalogConnector,
    http::HttpClient,
    index::IndexConnection,
    retry::RetryPolicy,
};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::events::DEFAULT_EVENT_BUFFER_SIZE;

/// Default recursion bound of the hierarchical crawler.
pub const DEFAULT_CRAWL_MAX_DEPTH: usize = 32;

/// Largest accepted crawl depth.
pub const MAX_CRAWL_DEPTH: usize = 1024;

/// Default retry policy when opening remote catalog proxies.
pub fn default_proxy_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(5),
        use_exponential_backoff: true,
    }
}

/// Configuration shared by every miner in the process.
///
/// Use [`MinerConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct MinerConfig {
    /// Content kinds this process indexes
    pub index_types: BTreeSet<ContentKind>,

    /// Location of the SQLite index (desktop adapters only)
    pub database_path: Option<PathBuf>,

    /// Location of the JSON account file (desktop adapters only)
    pub accounts_path: Option<PathBuf>,

    /// Maximum container depth the crawler descends into
    pub crawl_max_depth: usize,

    /// Retry policy for opening remote catalog proxies
    pub proxy_retry: RetryPolicy,

    /// Buffer size of the diagnostic event bus
    pub event_buffer_size: usize,

    pub account_directory: Arc<dyn AccountDirectory>,

    pub index: Arc<dyn IndexConnection>,

    pub http_client: Option<Arc<dyn HttpClient>>,

    pub catalog_connector: Option<Arc<dyn CatalogConnector>>,
}

impl fmt::Debug for MinerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinerConfig")
            .field("index_types", &self.index_types)
            .field("database_path", &self.database_path)
            .field("accounts_path", &self.accounts_path)
            .field("crawl_max_depth", &self.crawl_max_depth)
            .field("proxy_retry", &self.proxy_retry)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &self.http_client.is_some())
            .field("catalog_connector", &self.catalog_connector.is_some())
            .finish()
    }
}

impl MinerConfig {
    pub fn builder() -> MinerConfigBuilder {
        MinerConfigBuilder::default()
    }

    /// Whether this process indexes `kind`.
    pub fn indexes(&self, kind: ContentKind) -> bool {
        self.index_types.contains(&kind)
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<()> {
        if self.index_types.is_empty() {
            return Err(Error::Config(
                "At least one index type is required (photos, documents)".to_string(),
            ));
        }

        if self.crawl_max_depth == 0 || self.crawl_max_depth > MAX_CRAWL_DEPTH {
            return Err(Error::Config(format!(
                "Crawl depth must be between 1 and {}, got {}",
                MAX_CRAWL_DEPTH, self.crawl_max_depth
            )));
        }

        if self.proxy_retry.max_attempts == 0 {
            return Err(Error::Config(
                "Proxy retry policy needs at least one attempt".to_string(),
            ));
        }

        if self.proxy_retry.base_delay > self.proxy_retry.max_delay {
            return Err(Error::Config(
                "Proxy retry base delay exceeds its maximum delay".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if let Some(path) = &self.database_path {
            if path.as_os_str().is_empty() {
                return Err(Error::Config("Database path cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

/// Builder for [`MinerConfig`].
#[derive(Default)]
pub struct MinerConfigBuilder {
    index_types: Option<BTreeSet<ContentKind>>,
    database_path: Option<PathBuf>,
    accounts_path: Option<PathBuf>,
    crawl_max_depth: Option<usize>,
    proxy_retry: Option<RetryPolicy>,
    event_buffer_size: Option<usize>,
    account_directory: Option<Arc<dyn AccountDirectory>>,
    index: Option<Arc<dyn IndexConnection>>,
    http_client: Option<Arc<dyn HttpClient>>,
    catalog_connector: Option<Arc<dyn CatalogConnector>>,
}

impl MinerConfigBuilder {
    /// Content kinds to index. Default: photos and documents.
    pub fn index_types<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = ContentKind>,
    {
        self.index_types = Some(kinds.into_iter().collect());
        self
    }

    /// Content kinds to index, by name (`"photos"`, `"documents"`).
    pub fn index_type_names<I, S>(self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = names
            .into_iter()
            .map(|name| {
                name.as_ref()
                    .parse::<ContentKind>()
                    .map_err(|e| Error::Config(e.to_string()))
            })
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(self.index_types(kinds))
    }

    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn accounts_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.accounts_path = Some(path.into());
        self
    }

    /// Default: 32
    pub fn crawl_max_depth(mut self, depth: usize) -> Self {
        self.crawl_max_depth = Some(depth);
        self
    }

    /// Default: 2 attempts, 100 ms base delay, exponential
    pub fn proxy_retry(mut self, policy: RetryPolicy) -> Self {
        self.proxy_retry = Some(policy);
        self
    }

    /// Default: 100
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn account_directory(mut self, directory: Arc<dyn AccountDirectory>) -> Self {
        self.account_directory = Some(directory);
        self
    }

    pub fn index(mut self, index: Arc<dyn IndexConnection>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn catalog_connector(mut self, connector: Arc<dyn CatalogConnector>) -> Self {
        self.catalog_connector = Some(connector);
        self
    }

    /// Builds and validates the configuration.
    ///
    /// Fails when a required bridge is missing and no desktop default can
    /// stand in for it.
    pub fn build(mut self) -> Result<MinerConfig> {
        let index = self.index.take().ok_or_else(index_missing_error)?;
        self.finish(index)
    }

    /// Like [`build`](Self::build), but opens the desktop SQLite index at
    /// `database_path` when no index was injected.
    #[cfg(feature = "desktop-shims")]
    pub async fn build_async(mut self) -> Result<MinerConfig> {
        let index = match self.index.take() {
            Some(index) => index,
            None => {
                let path = self.database_path.clone().ok_or_else(|| {
                    Error::Config(
                        "Database path is required to open the default index. \
                         Use .database_path() to set it."
                            .to_string(),
                    )
                })?;
                let index = bridge_desktop::SqliteIndex::open(&path).await?;
                Arc::new(index) as Arc<dyn IndexConnection>
            }
        };
        self.finish(index)
    }

    fn finish(self, index: Arc<dyn IndexConnection>) -> Result<MinerConfig> {
        let account_directory = match self.account_directory {
            Some(directory) => directory,
            None => provide_default_account_directory(self.accounts_path.clone())?,
        };

        let config = MinerConfig {
            index_types: self
                .index_types
                .unwrap_or_else(|| ContentKind::ALL.into_iter().collect()),
            database_path: self.database_path,
            accounts_path: self.accounts_path,
            crawl_max_depth: self.crawl_max_depth.unwrap_or(DEFAULT_CRAWL_MAX_DEPTH),
            proxy_retry: self.proxy_retry.unwrap_or_else(default_proxy_retry),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            account_directory,
            index,
            http_client: self.http_client,
            catalog_connector: self.catalog_connector,
        };

        config.validate()?;
        Ok(config)
    }
}

fn index_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "IndexConnection".to_string(),
        message: "An index connection is required to store mined resources. \
                 Desktop: enable 'desktop-shims' and use build_async() with a database path. \
                 Otherwise inject an IndexConnection implementation."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_account_directory(
    accounts_path: Option<PathBuf>,
) -> Result<Arc<dyn AccountDirectory>> {
    use bridge_desktop::JsonAccountDirectory;

    let path = accounts_path
        .or_else(JsonAccountDirectory::default_path)
        .ok_or_else(|| {
            Error::Config(
                "No accounts path given and no user configuration directory found".to_string(),
            )
        })?;
    Ok(Arc::new(JsonAccountDirectory::new(path)))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_account_directory(
    _accounts_path: Option<PathBuf>,
) -> Result<Arc<dyn AccountDirectory>> {
    Err(Error::CapabilityMissing {
        capability: "AccountDirectory".to_string(),
        message: "An account directory is required to enumerate online accounts. \
                 Desktop: enable the 'desktop-shims' feature to read a JSON account file. \
                 Otherwise inject an AccountDirectory implementation."
            .to_string(),
    })
}
