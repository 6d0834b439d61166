//! # Miner Providers
//!
//! A [`MinerProvider`] is the engine-specific half of a miner: it decides
//! which services an account qualifies for and turns the remote catalog of
//! one account into [`ResourceRecord`]s. Everything else (datasource
//! bookkeeping, diffing against the index, stale cleanup, scheduling) is
//! shared and lives in this crate.

use std::collections::BTreeSet;

use async_trait::async_trait;
use bridge_traits::{Account, ContentKind};
use core_async::sync::CancellationToken;

use crate::error::{MinerError, Result};
use crate::resource::ResourceRecord;

/// Everything a provider needs to crawl one account.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub account: Account,
    /// Services the account qualified for, never empty.
    pub services: BTreeSet<ContentKind>,
    pub datasource_urn: String,
    pub cancel: CancellationToken,
}

impl JobContext {
    pub fn has_service(&self, kind: ContentKind) -> bool {
        self.services.contains(&kind)
    }

    /// Fails with `UnsupportedService` unless the job indexes `kind`.
    pub fn require_service(&self, kind: ContentKind) -> Result<()> {
        if self.has_service(kind) {
            Ok(())
        } else {
            Err(MinerError::UnsupportedService(format!(
                "account {} is not indexed for {}",
                self.account.id, kind
            )))
        }
    }

    /// Fails with `Cancelled` once the job has been cancelled.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(MinerError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A request to index one item shared with the user from another resource.
#[derive(Debug, Clone)]
pub struct SharedContentRequest {
    pub account: Account,
    pub datasource_urn: String,
    pub shared_id: String,
    pub shared_type: String,
    pub source_urn: String,
    pub cancel: CancellationToken,
}

/// Engine-specific half of a miner.
#[async_trait]
pub trait MinerProvider: Send + Sync {
    /// Account provider type this engine handles (`"media-server"`).
    fn provider_type(&self) -> &str;

    /// Written as `nao:identifier` on every datasource the engine owns.
    fn miner_identifier(&self) -> &str;

    /// Bumped whenever the engine's data model changes; datasources written
    /// by an older version are swept.
    fn version(&self) -> i32;

    fn supported_kinds(&self) -> &[ContentKind];

    /// Services this engine would index for `account`.
    ///
    /// The default keeps every supported kind that is both configured and
    /// exposed by the account.
    fn create_services(
        &self,
        account: &Account,
        index_types: &BTreeSet<ContentKind>,
    ) -> BTreeSet<ContentKind> {
        self.supported_kinds()
            .iter()
            .copied()
            .filter(|kind| index_types.contains(kind) && account.exposes(*kind))
            .collect()
    }

    /// Enumerates the account's remote content.
    async fn query(&self, ctx: &JobContext) -> Result<Vec<ResourceRecord>>;

    /// Resolves one shared item into a record.
    async fn shared_content(&self, request: &SharedContentRequest) -> Result<ResourceRecord> {
        Err(MinerError::UnsupportedService(format!(
            "{} does not index shared content of type {}",
            self.provider_type(),
            request.shared_type
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PhotosOnly;

    #[async_trait]
    impl MinerProvider for PhotosOnly {
        fn provider_type(&self) -> &str {
            "media-server"
        }

        fn miner_identifier(&self) -> &str {
            "gd:media-server:miner:test"
        }

        fn version(&self) -> i32 {
            1
        }

        fn supported_kinds(&self) -> &[ContentKind] {
            &[ContentKind::Photos]
        }

        async fn query(&self, _ctx: &JobContext) -> Result<Vec<ResourceRecord>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_services_need_config_and_capability() {
        let provider = PhotosOnly;
        let photos: BTreeSet<_> = [ContentKind::Photos].into_iter().collect();
        let documents: BTreeSet<_> = [ContentKind::Documents].into_iter().collect();

        let account = Account::new("a1", "media-server").with_capability(ContentKind::Photos);
        assert_eq!(provider.create_services(&account, &photos), photos);
        assert!(provider.create_services(&account, &documents).is_empty());

        let disabled = Account::new("a2", "media-server");
        assert!(provider.create_services(&disabled, &photos).is_empty());
    }

    #[test]
    fn test_require_service() {
        let ctx = JobContext {
            account: Account::new("a1", "media-server"),
            services: [ContentKind::Photos].into_iter().collect(),
            datasource_urn: "gd:goa-account:a1".to_string(),
            cancel: CancellationToken::new(),
        };

        assert!(ctx.require_service(ContentKind::Photos).is_ok());
        assert!(matches!(
            ctx.require_service(ContentKind::Documents),
            Err(MinerError::UnsupportedService(_))
        ));
        assert!(ctx.check_cancelled().is_ok());
        ctx.cancel.cancel();
        assert!(matches!(ctx.check_cancelled(), Err(MinerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_shared_content_unsupported_by_default() {
        let request = SharedContentRequest {
            account: Account::new("a1", "media-server"),
            datasource_urn: "gd:goa-account:a1".to_string(),
            shared_id: "s1".to_string(),
            shared_type: "photo".to_string(),
            source_urn: "urn:source".to_string(),
            cancel: CancellationToken::new(),
        };

        let err = PhotosOnly.shared_content(&request).await.unwrap_err();
        assert!(matches!(err, MinerError::UnsupportedService(_)));
    }
}
