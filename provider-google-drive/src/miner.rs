//! Google Drive engine.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::error::BridgeError;
use bridge_traits::index::{vocab, Term};
use bridge_traits::retry::RetryPolicy;
use bridge_traits::{AccountDirectory, ContentKind, HttpClient};
use core_miner::cancel::until_cancelled;
use core_miner::{JobContext, MinerError, MinerProvider, ResourceRecord, SharedContentRequest};
use core_runtime::logging::redact_if_sensitive;
use core_runtime::MinerConfig;
use tracing::{debug, info, instrument};

use crate::connector::GoogleDriveConnector;
use crate::error::{GoogleDriveError, Result};
use crate::types::DriveFile;

/// Account provider type handled by this engine.
pub const PROVIDER_TYPE: &str = "google";

pub const MINER_IDENTIFIER: &str = "gd:gdata:miner:86ec9bc9-c242-427f-aa19-77b5a2c9b6f0";

pub const MINER_VERSION: i32 = 3;

/// Kind prefix of every Drive resource identifier.
pub const RESOURCE_KIND: &str = "google:drive";

/// Only shared type this engine resolves.
pub const SHARED_DOCUMENT_TYPE: &str = "document";

const SUPPORTED_KINDS: [ContentKind; 1] = [ContentKind::Documents];

/// Indexes the documents of Google accounts.
pub struct GoogleDriveMiner {
    http_client: Arc<dyn HttpClient>,
    accounts: Arc<dyn AccountDirectory>,
    retry: RetryPolicy,
}

impl GoogleDriveMiner {
    pub fn new(http_client: Arc<dyn HttpClient>, accounts: Arc<dyn AccountDirectory>) -> Self {
        Self {
            http_client,
            accounts,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the engine from the shared configuration, which must carry an
    /// HTTP client.
    pub fn from_config(config: &MinerConfig) -> Result<Self> {
        let http_client = config
            .http_client
            .clone()
            .ok_or(GoogleDriveError::NoHttpClient)?;
        Ok(Self::new(http_client, config.account_directory.clone()))
    }

    async fn connector(&self, account_id: &str) -> Result<GoogleDriveConnector> {
        let token = self
            .accounts
            .access_token(account_id)
            .await
            .map_err(|e| match e {
                BridgeError::NotAvailable(message) => GoogleDriveError::AuthenticationFailed(message),
                other => GoogleDriveError::BridgeError(other),
            })?;
        debug!(
            access_token = %redact_if_sensitive("access_token", &token),
            "Obtained access token"
        );

        Ok(GoogleDriveConnector::new(self.http_client.clone(), token)
            .with_retry_policy(self.retry.clone()))
    }
}

/// Index record for one Drive file.
pub fn document_record(file: &DriveFile) -> ResourceRecord {
    let record = ResourceRecord::new(RESOURCE_KIND, file.id.as_str())
        .with_class(vocab::NFO_REMOTE_DATA_OBJECT)
        .with_class(vocab::NFO_DOCUMENT)
        .with_url(file.web_view_link.as_deref())
        .with_mime_type(Some(file.mime_type.as_str()))
        .with_title(Some(file.name.as_str()));

    match file.last_modified() {
        Some(modified) => {
            record.with_property(vocab::NIE_CONTENT_LAST_MODIFIED, Term::literal(modified))
        }
        None => record,
    }
}

#[async_trait]
impl MinerProvider for GoogleDriveMiner {
    fn provider_type(&self) -> &str {
        PROVIDER_TYPE
    }

    fn miner_identifier(&self) -> &str {
        MINER_IDENTIFIER
    }

    fn version(&self) -> i32 {
        MINER_VERSION
    }

    fn supported_kinds(&self) -> &[ContentKind] {
        &SUPPORTED_KINDS
    }

    #[instrument(skip(self, ctx), fields(account_id = %ctx.account.id))]
    async fn query(&self, ctx: &JobContext) -> core_miner::Result<Vec<ResourceRecord>> {
        ctx.require_service(ContentKind::Documents)?;

        let connector = self.connector(&ctx.account.id).await?;
        let documents = until_cancelled(&ctx.cancel, async {
            connector.list_documents().await.map_err(MinerError::from)
        })
        .await?;

        info!(documents = documents.len(), "Listed Google Drive documents");
        Ok(documents.iter().map(document_record).collect())
    }

    #[instrument(skip(self, request), fields(account_id = %request.account.id, shared_id = %request.shared_id))]
    async fn shared_content(
        &self,
        request: &SharedContentRequest,
    ) -> core_miner::Result<ResourceRecord> {
        if request.shared_type != SHARED_DOCUMENT_TYPE {
            return Err(MinerError::UnsupportedService(format!(
                "{} does not index shared content of type {}",
                PROVIDER_TYPE, request.shared_type
            )));
        }

        let connector = self.connector(&request.account.id).await?;
        let file = until_cancelled(&request.cancel, async {
            connector
                .get_metadata(&request.shared_id)
                .await
                .map_err(MinerError::from)
        })
        .await?;

        debug!(name = %file.name, "Resolved shared document");
        Ok(document_record(&file))
    }
}

impl std::fmt::Debug for GoogleDriveMiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveMiner")
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::mocks::{json, MockHttpClient};
    use bridge_traits::Account;
    use core_async::sync::CancellationToken;
    use std::collections::BTreeSet;

    struct TokenDirectory {
        token: Option<&'static str>,
    }

    #[async_trait]
    impl AccountDirectory for TokenDirectory {
        async fn list_accounts(&self) -> bridge_traits::error::Result<Vec<Account>> {
            Ok(vec![drive_account()])
        }

        async fn access_token(&self, account_id: &str) -> bridge_traits::error::Result<String> {
            self.token.map(str::to_string).ok_or_else(|| {
                BridgeError::NotAvailable(format!("access token for account {}", account_id))
            })
        }
    }

    fn drive_account() -> Account {
        Account::new("g1", PROVIDER_TYPE)
            .with_provider_name("Google")
            .with_capability(ContentKind::Documents)
    }

    fn miner(http: MockHttpClient, token: Option<&'static str>) -> GoogleDriveMiner {
        GoogleDriveMiner::new(Arc::new(http), Arc::new(TokenDirectory { token }))
            .with_retry_policy(RetryPolicy::no_retry())
    }

    fn ctx() -> JobContext {
        JobContext {
            account: drive_account(),
            services: [ContentKind::Documents].into_iter().collect(),
            datasource_urn: "gd:goa-account:g1".to_string(),
            cancel: CancellationToken::new(),
        }
    }

    fn shared(shared_type: &str) -> SharedContentRequest {
        SharedContentRequest {
            account: drive_account(),
            datasource_urn: "gd:goa-account:g1".to_string(),
            shared_id: "doc-7".to_string(),
            shared_type: shared_type.to_string(),
            source_urn: "urn:message:1".to_string(),
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn test_document_record() {
        let file = DriveFile {
            id: "abc".to_string(),
            name: "Budget".to_string(),
            mime_type: "application/vnd.google-apps.spreadsheet".to_string(),
            modified_time: Some("2024-03-01T10:15:30.123+01:00".to_string()),
            web_view_link: Some("https://docs.google.com/spreadsheets/d/abc".to_string()),
            trashed: false,
        };

        let record = document_record(&file);
        assert_eq!(record.identifier, "google:drive:abc");
        assert_eq!(record.urn("g1"), "gd:google:drive:g1:abc");
        assert_eq!(
            record.classes,
            vec![vocab::NFO_REMOTE_DATA_OBJECT, vocab::NFO_DOCUMENT]
        );
        assert_eq!(
            record.property(vocab::NIE_URL),
            Some(&Term::literal("https://docs.google.com/spreadsheets/d/abc"))
        );
        assert_eq!(record.property(vocab::NIE_TITLE), Some(&Term::literal("Budget")));
        assert_eq!(
            record.property(vocab::NIE_CONTENT_LAST_MODIFIED),
            Some(&Term::literal("2024-03-01T09:15:30Z"))
        );
    }

    #[tokio::test]
    async fn test_query_lists_documents() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| {
                req.headers.get("Authorization").map(String::as_str) == Some("Bearer secret")
            })
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"files": [
                        {"id": "d1", "name": "Plan", "mimeType": "application/pdf"},
                        {"id": "d2", "name": "Notes", "mimeType": "text/plain"}
                    ]}"#,
                ))
            });

        let records = miner(http, Some("secret")).query(&ctx()).await.unwrap();
        let identifiers: Vec<_> = records.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["google:drive:d1", "google:drive:d2"]);
        assert!(records[0].property(vocab::NIE_URL).is_none());
    }

    #[tokio::test]
    async fn test_query_without_token_fails() {
        let mut http = MockHttpClient::new();
        http.expect_execute().never();

        let err = miner(http, None).query(&ctx()).await.unwrap_err();
        assert!(matches!(err, MinerError::Provider(_)));
    }

    #[tokio::test]
    async fn test_query_api_failure_is_proxy_failure() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(json(500, "Internal Error")));

        let err = miner(http, Some("secret")).query(&ctx()).await.unwrap_err();
        assert!(matches!(err, MinerError::ProxyFailure(_)));
    }

    #[tokio::test]
    async fn test_query_requires_documents_service() {
        let http = MockHttpClient::new();
        let mut no_documents = ctx();
        no_documents.services = BTreeSet::new();

        let err = miner(http, Some("secret")).query(&no_documents).await.unwrap_err();
        assert!(matches!(err, MinerError::UnsupportedService(_)));
    }

    #[tokio::test]
    async fn test_query_cancelled() {
        let http = MockHttpClient::new();
        let ctx = ctx();
        ctx.cancel.cancel();

        let err = miner(http, Some("secret")).query(&ctx).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn test_shared_document() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .withf(|req| req.url.contains("/files/doc-7?"))
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"id": "doc-7", "name": "Minutes", "mimeType": "application/vnd.google-apps.document"}"#,
                ))
            });

        let record = miner(http, Some("secret"))
            .shared_content(&shared(SHARED_DOCUMENT_TYPE))
            .await
            .unwrap();
        assert_eq!(record.identifier, "google:drive:doc-7");
        assert_eq!(record.property(vocab::NIE_TITLE), Some(&Term::literal("Minutes")));
    }

    #[tokio::test]
    async fn test_shared_content_other_types_unsupported() {
        let mut http = MockHttpClient::new();
        http.expect_execute().never();

        let err = miner(http, Some("secret"))
            .shared_content(&shared("photo"))
            .await
            .unwrap_err();
        assert!(matches!(err, MinerError::UnsupportedService(_)));
    }

    #[test]
    fn test_engine_identity() {
        let miner = miner(MockHttpClient::new(), None);
        assert_eq!(miner.provider_type(), "google");
        assert_eq!(miner.version(), 3);
        assert_eq!(miner.supported_kinds(), &[ContentKind::Documents]);

        let photos_only = Account::new("g2", PROVIDER_TYPE).with_capability(ContentKind::Photos);
        let everything: BTreeSet<_> = [ContentKind::Photos, ContentKind::Documents]
            .into_iter()
            .collect();
        assert!(miner.create_services(&photos_only, &everything).is_empty());
        let documents: BTreeSet<_> = [ContentKind::Documents].into_iter().collect();
        assert_eq!(miner.create_services(&drive_account(), &everything), documents);
    }
}
