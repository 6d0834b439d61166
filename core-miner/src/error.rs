use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    #[error("Query failure: {0}")]
    QueryFailure(String),

    #[error("Update failure: {0}")]
    UpdateFailure(String),

    #[error("Remote catalog failure: {0}")]
    ProxyFailure(String),

    #[error("Unsupported service: {0}")]
    UnsupportedService(String),

    #[error("Account {0} not found")]
    AccountNotFound(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MinerError {
    /// Index read failed.
    pub fn query_failure(err: BridgeError) -> Self {
        match err {
            BridgeError::Cancelled => MinerError::Cancelled,
            other => MinerError::QueryFailure(other.to_string()),
        }
    }

    /// Index write failed.
    pub fn update_failure(err: BridgeError) -> Self {
        match err {
            BridgeError::Cancelled => MinerError::Cancelled,
            other => MinerError::UpdateFailure(other.to_string()),
        }
    }

    /// Account directory unreachable.
    pub fn connection_failure(err: BridgeError) -> Self {
        match err {
            BridgeError::Cancelled => MinerError::Cancelled,
            other => MinerError::ConnectionFailure(other.to_string()),
        }
    }

    /// Remote catalog unreachable or a call on it failed.
    pub fn proxy_failure(err: BridgeError) -> Self {
        match err {
            BridgeError::Cancelled => MinerError::Cancelled,
            other => MinerError::ProxyFailure(other.to_string()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MinerError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, MinerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_mapping() {
        let err = MinerError::query_failure(BridgeError::IndexError("disk".to_string()));
        assert!(matches!(err, MinerError::QueryFailure(ref m) if m.contains("disk")));

        let err = MinerError::update_failure(BridgeError::IndexError("locked".to_string()));
        assert!(matches!(err, MinerError::UpdateFailure(_)));

        let err = MinerError::proxy_failure(BridgeError::RemoteError("gone".to_string()));
        assert!(matches!(err, MinerError::ProxyFailure(_)));

        assert!(MinerError::connection_failure(BridgeError::Cancelled).is_cancelled());
    }
}
