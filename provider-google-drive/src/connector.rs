//! Google Drive API connector implementation
//!
//! Read-only access to the files of one Google Drive account through
//! `HttpClient`.

use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::retry::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{DriveFile, FilesListResponse, FOLDER_MIME_TYPE};

/// Google Drive API base URL
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,webViewLink,trashed";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Google Drive API connector
///
/// # Features
///
/// - Paginated listing of every non-trashed, non-folder file
/// - Single file metadata lookup
/// - Exponential backoff on rate limiting and server errors
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
///
/// let connector = GoogleDriveConnector::new(http_client, access_token);
/// let documents = connector.list_documents().await?;
/// ```
pub struct GoogleDriveConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// OAuth 2.0 access token
    access_token: String,

    retry: RetryPolicy,
}

impl GoogleDriveConnector {
    /// Create a new Google Drive connector
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client implementation
    /// * `access_token` - OAuth 2.0 access token with `drive.readonly` scope
    pub fn new(http_client: Arc<dyn HttpClient>, access_token: String) -> Self {
        Self {
            http_client,
            access_token,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Every non-trashed, non-folder file of the account.
    #[instrument(skip(self))]
    pub async fn list_documents(&self) -> Result<Vec<DriveFile>> {
        let mut documents = Vec::new();
        let mut page_token = None;
        let mut pages = 0u32;

        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            pages += 1;
            if page.incomplete_search {
                warn!(page = pages, "Google Drive reported an incomplete listing");
            }

            documents.extend(
                page.files
                    .into_iter()
                    .filter(|file| !file.trashed && !file.is_folder()),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(documents = documents.len(), pages, "Listed files from Google Drive");
        Ok(documents)
    }

    /// One page of the file listing.
    pub async fn list_page(&self, page_token: Option<&str>) -> Result<FilesListResponse> {
        let query = format!("trashed = false and mimeType != '{}'", FOLDER_MIME_TYPE);
        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields=nextPageToken,incompleteSearch,files({})",
            DRIVE_API_BASE,
            urlencoding::encode(&query),
            MAX_PAGE_SIZE,
            FILE_FIELDS
        );

        if let Some(page_token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(page_token)));
        }

        let response = self.get(url).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse files list response: {}", e))
        })
    }

    #[instrument(skip(self), fields(file_id = %file_id))]
    pub async fn get_metadata(&self, file_id: &str) -> Result<DriveFile> {
        let url = format!(
            "{}/files/{}?fields={}",
            DRIVE_API_BASE,
            urlencoding::encode(file_id),
            FILE_FIELDS
        );

        let response = self.get(url).await.map_err(|e| match e {
            GoogleDriveError::ApiError {
                status_code: 404, ..
            } => GoogleDriveError::FileNotFound {
                file_id: file_id.to_string(),
            },
            other => other,
        })?;

        serde_json::from_slice(&response.body).map_err(|e| {
            GoogleDriveError::ParseError(format!("Failed to parse file metadata: {}", e))
        })
    }

    async fn get(&self, url: String) -> Result<HttpResponse> {
        let request = HttpRequest::get(url)
            .bearer_token(self.access_token.as_str())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self
            .http_client
            .execute_with_retry(request, self.retry.clone())
            .await?;

        match response.status {
            200 => {
                debug!(status = response.status, "API request succeeded");
                Ok(response)
            }
            401 => Err(GoogleDriveError::AuthenticationFailed(format!(
                "status {}",
                response.status
            ))),
            status => {
                warn!(status, "API request failed");
                Err(GoogleDriveError::ApiError {
                    status_code: status,
                    message: String::from_utf8_lossy(&response.body).to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use async_trait::async_trait;
    use bridge_traits::error::Result;
    use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
    use mockall::mock;

    mock! {
        pub HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    pub fn json(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(status, bytes::Bytes::copy_from_slice(body.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::{json, MockHttpClient};
    use super::*;
    use bridge_traits::error::BridgeError;
    use mockall::Sequence;

    fn connector(http: MockHttpClient) -> GoogleDriveConnector {
        GoogleDriveConnector::new(Arc::new(http), "test_token".to_string())
            .with_retry_policy(RetryPolicy::no_retry())
    }

    #[tokio::test]
    async fn test_list_documents_follows_pages() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| {
                req.headers.get("Authorization").map(String::as_str) == Some("Bearer test_token")
                    && req.url.contains("pageSize=1000")
                    && !req.url.contains("pageToken")
            })
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{
                        "files": [
                            {"id": "d1", "name": "Report", "mimeType": "application/vnd.google-apps.document"},
                            {"id": "f1", "name": "Folder", "mimeType": "application/vnd.google-apps.folder"}
                        ],
                        "nextPageToken": "page 2"
                    }"#,
                ))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| req.url.ends_with("&pageToken=page%202"))
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{
                        "files": [
                            {"id": "d2", "name": "Old", "mimeType": "text/plain", "trashed": true},
                            {"id": "d3", "name": "Notes", "mimeType": "text/plain"}
                        ]
                    }"#,
                ))
            });

        let documents = connector(mock_http).list_documents().await.unwrap();
        let ids: Vec<_> = documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d3"]);
    }

    #[tokio::test]
    async fn test_get_metadata_success() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .withf(|req| req.url.contains("/files/d1?fields="))
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"id": "d1", "name": "Report", "mimeType": "application/pdf",
                        "webViewLink": "https://drive.google.com/file/d/d1/view"}"#,
                ))
            });

        let file = connector(mock_http).get_metadata("d1").await.unwrap();
        assert_eq!(file.name, "Report");
        assert_eq!(
            file.web_view_link.as_deref(),
            Some("https://drive.google.com/file/d/d1/view")
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .withf(|req| req.url.contains("/files/missing"))
            .returning(|_| Ok(json(404, "File not found")));
        mock_http
            .expect_execute()
            .withf(|req| req.url.contains("/files/locked"))
            .returning(|_| Ok(json(401, "Invalid Credentials")));
        mock_http
            .expect_execute()
            .withf(|req| req.url.contains("/files/busy"))
            .returning(|_| Ok(json(503, "Backend Error")));

        let connector = connector(mock_http);
        assert!(matches!(
            connector.get_metadata("missing").await,
            Err(GoogleDriveError::FileNotFound { .. })
        ));
        assert!(matches!(
            connector.get_metadata("locked").await,
            Err(GoogleDriveError::AuthenticationFailed(_))
        ));
        assert!(matches!(
            connector.get_metadata("busy").await,
            Err(GoogleDriveError::ApiError {
                status_code: 503,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_transport_and_parse_errors() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::OperationFailed("Connection failed".to_string())));
        assert!(matches!(
            connector(mock_http).list_documents().await,
            Err(GoogleDriveError::BridgeError(_))
        ));

        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json(200, "<html>captive portal</html>")));
        assert!(matches!(
            connector(mock_http).list_documents().await,
            Err(GoogleDriveError::ParseError(_))
        ));
    }
}
