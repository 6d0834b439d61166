//! Error types for Google Drive provider

use bridge_traits::error::BridgeError;
use core_miner::MinerError;
use thiserror::Error;

/// Google Drive provider errors
#[derive(Error, Debug)]
pub enum GoogleDriveError {
    /// No usable access token for the account
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Google Drive API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// File not found
    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// No HTTP client configured
    #[error("No HTTP client configured")]
    NoHttpClient,

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Google Drive operations
pub type Result<T> = std::result::Result<T, GoogleDriveError>;

impl From<GoogleDriveError> for MinerError {
    fn from(error: GoogleDriveError) -> Self {
        match error {
            GoogleDriveError::BridgeError(e) => MinerError::proxy_failure(e),
            GoogleDriveError::ApiError { .. } => MinerError::ProxyFailure(error.to_string()),
            other => MinerError::Provider(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GoogleDriveError::ApiError {
            status_code: 404,
            message: "File not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 404): File not found"
        );
    }

    #[test]
    fn test_error_conversion() {
        let error: MinerError =
            GoogleDriveError::AuthenticationFailed("Token expired".to_string()).into();
        assert!(matches!(error, MinerError::Provider(_)));

        let error: MinerError = GoogleDriveError::ApiError {
            status_code: 503,
            message: "Backend Error".to_string(),
        }
        .into();
        assert!(matches!(error, MinerError::ProxyFailure(_)));

        let error: MinerError =
            GoogleDriveError::BridgeError(BridgeError::OperationFailed("reset".to_string())).into();
        assert!(matches!(error, MinerError::ProxyFailure(_)));
    }
}
