//! Account Directory backed by a JSON file
//!
//! The file is re-read on every call so accounts added or removed between
//! two refreshes are picked up without restarting.
//!
//! ```json
//! {
//!   "accounts": [
//!     {
//!       "id": "account_1",
//!       "provider_type": "media-server",
//!       "provider_name": "Media Server",
//!       "capabilities": ["photos"],
//!       "attributes": { "udn": "uuid:0f8e..." }
//!     }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use bridge_traits::{
    accounts::{Account, AccountDirectory},
    error::{BridgeError, Result},
};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct AccountFile {
    #[serde(default)]
    accounts: Vec<AccountRecord>,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    #[serde(flatten)]
    account: Account,
    #[serde(default)]
    access_token: Option<String>,
}

/// JSON-file account directory implementation
pub struct JsonAccountDirectory {
    path: PathBuf,
}

impl JsonAccountDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/online-miners/accounts.json` (or the platform equivalent)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("online-miners").join("accounts.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<AccountRecord>> {
        let contents = match tokio::fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "Account file missing, no accounts configured");
                return Ok(Vec::new());
            }
            Err(e) => return Err(BridgeError::Io(e)),
        };

        let file: AccountFile = serde_json::from_slice(&contents).map_err(|e| {
            BridgeError::OperationFailed(format!(
                "Invalid account file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        debug!(path = ?self.path, count = file.accounts.len(), "Loaded accounts");
        Ok(file.accounts)
    }
}

#[async_trait]
impl AccountDirectory for JsonAccountDirectory {
    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .map(|record| record.account)
            .collect())
    }

    async fn access_token(&self, account_id: &str) -> Result<String> {
        self.load()
            .await?
            .into_iter()
            .find(|record| record.account.id == account_id)
            .and_then(|record| record.access_token)
            .ok_or_else(|| {
                BridgeError::NotAvailable(format!("access token for account {}", account_id))
            })
    }
}
