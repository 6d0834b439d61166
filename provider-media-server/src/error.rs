use bridge_traits::BridgeError;
use core_miner::MinerError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaServerError {
    #[error("Account {0} has no media server UDN")]
    MissingUdn(String),

    /// The server's root container could not be opened, queried or listed.
    #[error("Media server catalog error: {0}")]
    Catalog(#[from] BridgeError),

    #[error("No catalog connector configured")]
    NoConnector,

    #[error("Crawl cancelled")]
    Cancelled,
}

impl From<MediaServerError> for MinerError {
    fn from(err: MediaServerError) -> Self {
        match err {
            MediaServerError::Catalog(err) => MinerError::proxy_failure(err),
            MediaServerError::Cancelled => MinerError::Cancelled,
            other => MinerError::Provider(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaServerError>;
