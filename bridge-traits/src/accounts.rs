//! Account Directory Abstraction
//!
//! The account directory enumerates the online accounts configured by the
//! user (GNOME Online Accounts on a desktop session). Accounts are read-only
//! snapshots: the miners never create or modify them, and an account may
//! disappear between two refreshes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// Kind of content an account can expose and a miner can index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Photos,
    Documents,
}

impl ContentKind {
    /// Every kind, in a stable order.
    pub const ALL: [ContentKind; 2] = [ContentKind::Photos, ContentKind::Documents];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Photos => "photos",
            ContentKind::Documents => "documents",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "photos" => Ok(ContentKind::Photos),
            "documents" => Ok(ContentKind::Documents),
            other => Err(BridgeError::OperationFailed(format!(
                "Unknown content kind: {}",
                other
            ))),
        }
    }
}

/// A configured online account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Opaque, stable account identifier
    pub id: String,

    /// Provider type tag (e.g. `"media-server"`, `"google"`)
    pub provider_type: String,

    /// Human-readable provider name (e.g. `"Google"`)
    #[serde(default)]
    pub provider_name: String,

    /// Content kinds the account currently exposes
    #[serde(default)]
    pub capabilities: BTreeSet<ContentKind>,

    /// Provider-specific attributes (e.g. `udn` for media servers)
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Account {
    pub fn new(id: impl Into<String>, provider_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider_type: provider_type.into(),
            provider_name: String::new(),
            capabilities: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = name.into();
        self
    }

    pub fn with_capability(mut self, kind: ContentKind) -> Self {
        self.capabilities.insert(kind);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether the account exposes `kind`.
    pub fn exposes(&self, kind: ContentKind) -> bool {
        self.capabilities.contains(&kind)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Account directory trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::accounts::AccountDirectory;
///
/// async fn count(directory: &dyn AccountDirectory) -> Result<usize> {
///     Ok(directory.list_accounts().await?.len())
/// }
/// ```
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Snapshot of every configured account, regardless of provider
    async fn list_accounts(&self) -> Result<Vec<Account>>;

    /// Look up one account by id
    async fn find_account(&self, account_id: &str) -> Result<Option<Account>> {
        Ok(self
            .list_accounts()
            .await?
            .into_iter()
            .find(|account| account.id == account_id))
    }

    /// Current access token for an OAuth-backed account
    ///
    /// Directories without credentials support keep the default, which
    /// reports the capability as unavailable.
    async fn access_token(&self, account_id: &str) -> Result<String> {
        Err(BridgeError::NotAvailable(format!(
            "access token for account {}",
            account_id
        )))
    }
}
