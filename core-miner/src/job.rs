//! # Account Reconciliation Job
//!
//! Brings the index in line with one account's remote content.
//!
//! ## Workflow
//!
//! 1. Insert-or-replace the account's datasource and versioned root element
//! 2. Load the resources currently attached to the datasource
//! 3. Ask the provider for the account's remote content
//! 4. Write every reported item, ticking it off the previous set
//! 5. Delete whatever was not reported, in one statement
//!
//! A failure while writing one item is logged and counted; the job moves on
//! and the item stays out of the deletion set. A failure in any other step
//! fails the job without touching the remaining steps.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bridge_traits::{Account, ContentKind, IndexConnection};
use core_async::sync::CancellationToken;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cancel::until_cancelled;
use crate::error::Result;
use crate::provider::{JobContext, MinerProvider};
use crate::store;
use crate::urn;

/// Counters reported by one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStats {
    pub created: u64,
    pub updated: u64,
    pub deleted: u64,
    pub failed: u64,
}

impl JobStats {
    pub fn merge(&mut self, other: &JobStats) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.failed += other.failed;
    }
}

impl fmt::Display for JobStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} failed",
            self.created, self.updated, self.deleted, self.failed
        )
    }
}

/// Reconciliation of one account. Owns everything it touches so it can run
/// on its own task.
pub struct AccountMinerJob {
    provider: Arc<dyn MinerProvider>,
    index: Arc<dyn IndexConnection>,
    account: Account,
    services: BTreeSet<ContentKind>,
    datasource_urn: String,
}

impl AccountMinerJob {
    pub fn new(
        provider: Arc<dyn MinerProvider>,
        index: Arc<dyn IndexConnection>,
        account: Account,
        services: BTreeSet<ContentKind>,
    ) -> Self {
        let datasource_urn = urn::datasource_urn(&account.id);
        Self {
            provider,
            index,
            account,
            services,
            datasource_urn,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn datasource_urn(&self) -> &str {
        &self.datasource_urn
    }

    /// Runs the job to completion or until `cancel` fires.
    #[instrument(skip(self, cancel), fields(account_id = %self.account.id, datasource = %self.datasource_urn))]
    pub async fn run(self, cancel: CancellationToken) -> Result<JobStats> {
        let index = self.index.as_ref();
        let mut stats = JobStats::default();

        until_cancelled(
            &cancel,
            store::ensure_datasource(
                index,
                &self.datasource_urn,
                self.provider.miner_identifier(),
                self.provider.version(),
            ),
        )
        .await?;

        let mut previous =
            until_cancelled(&cancel, store::previous_resources(index, &self.datasource_urn))
                .await?;
        debug!(previous = previous.len(), "Loaded previous resources");

        let ctx = JobContext {
            account: self.account.clone(),
            services: self.services.clone(),
            datasource_urn: self.datasource_urn.clone(),
            cancel: cancel.clone(),
        };
        let records = until_cancelled(&cancel, self.provider.query(&ctx)).await?;
        info!(items = records.len(), "Provider reported remote content");

        for record in &records {
            previous.remove(&record.identifier);

            match until_cancelled(
                &cancel,
                store::upsert_resource(index, &self.account.id, &self.datasource_urn, record),
            )
            .await
            {
                Ok(upserted) if upserted.created => stats.created += 1,
                Ok(_) => stats.updated += 1,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(identifier = %record.identifier, error = %e, "Failed to write resource");
                    stats.failed += 1;
                }
            }
        }

        let stale: Vec<String> = previous.into_values().collect();
        stats.deleted = stale.len() as u64;
        until_cancelled(&cancel, store::delete_resources(index, stale)).await?;

        info!(%stats, "Account job finished");
        Ok(stats)
    }
}

impl fmt::Debug for AccountMinerJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountMinerJob")
            .field("provider", &self.provider.provider_type())
            .field("account", &self.account.id)
            .field("services", &self.services)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MinerError;
    use crate::resource::ResourceRecord;
    use crate::store::mocks::MockIndex;
    use async_trait::async_trait;
    use bridge_traits::index::{IndexCursor, IndexRow, Query, Update};
    use bridge_traits::BridgeError;
    use std::sync::Mutex;

    struct FixedProvider {
        records: Vec<ResourceRecord>,
    }

    #[async_trait]
    impl MinerProvider for FixedProvider {
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
            Ok(self.records.clone())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl MinerProvider for FailingProvider {
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
            Err(MinerError::ProxyFailure("server vanished".to_string()))
        }
    }

    fn job(provider: impl MinerProvider + 'static, index: MockIndex) -> AccountMinerJob {
        AccountMinerJob::new(
            Arc::new(provider),
            Arc::new(index),
            Account::new("a1", "media-server").with_capability(ContentKind::Photos),
            [ContentKind::Photos].into_iter().collect(),
        )
    }

    #[tokio::test]
    async fn test_stale_resources_deleted_in_one_statement() {
        let deletes = Arc::new(Mutex::new(Vec::new()));
        let seen = deletes.clone();

        let mut index = MockIndex::new();
        index.expect_query().returning(|statement| match statement {
            Query::DatasourceResources { .. } => Ok(IndexCursor::new(vec![
                IndexRow::bound(["gd:media-server:p1", "media-server:p1"]),
                IndexRow::bound(["gd:media-server:p2", "media-server:p2"]),
                IndexRow::bound(["gd:media-server:p3", "media-server:p3"]),
            ])),
            Query::ResourceByIdentifier { identifier, .. } if identifier == "media-server:p2" => {
                Ok(IndexCursor::new(vec![IndexRow::bound(["gd:media-server:p2"])]))
            }
            _ => Ok(IndexCursor::empty()),
        });
        index.expect_update().returning(move |statement| {
            if let Update::DeleteResources { urns } = statement {
                seen.lock().unwrap().push(urns.clone());
            }
            Ok(())
        });

        let provider = FixedProvider {
            records: vec![
                ResourceRecord::new("media-server", "p2"),
                ResourceRecord::new("media-server", "p4"),
            ],
        };

        let stats = job(provider, index).run(CancellationToken::new()).await.unwrap();
        assert_eq!(
            stats,
            JobStats {
                created: 1,
                updated: 1,
                deleted: 2,
                failed: 0
            }
        );

        let deletes = deletes.lock().unwrap();
        assert_eq!(deletes.len(), 1);
        let mut urns = deletes[0].clone();
        urns.sort();
        assert_eq!(urns, vec!["gd:media-server:p1", "gd:media-server:p3"]);
    }

    #[tokio::test]
    async fn test_item_failure_is_counted_and_not_deleted() {
        let mut index = MockIndex::new();
        index.expect_query().returning(|statement| match statement {
            Query::DatasourceResources { .. } => Ok(IndexCursor::new(vec![IndexRow::bound([
                "gd:media-server:bad",
                "media-server:bad",
            ])])),
            _ => Ok(IndexCursor::empty()),
        });
        index.expect_update().returning(|statement| match statement {
            Update::InsertResource { identifier, .. } if identifier == "media-server:bad" => {
                Err(BridgeError::IndexError("constraint".to_string()))
            }
            Update::DeleteResources { .. } => panic!("nothing is stale"),
            _ => Ok(()),
        });

        let provider = FixedProvider {
            records: vec![
                ResourceRecord::new("media-server", "bad"),
                ResourceRecord::new("media-server", "good"),
            ],
        };

        let stats = job(provider, index).run(CancellationToken::new()).await.unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.created, 1);
        assert_eq!(stats.deleted, 0);
    }

    #[tokio::test]
    async fn test_provider_failure_fails_job_without_deleting() {
        let mut index = MockIndex::new();
        index.expect_query().returning(|_| {
            Ok(IndexCursor::new(vec![IndexRow::bound([
                "gd:media-server:p1",
                "media-server:p1",
            ])]))
        });
        index
            .expect_update()
            .withf(|statement| matches!(statement, Update::EnsureDatasource { .. }))
            .times(1)
            .returning(|_| Ok(()));

        let err = job(FailingProvider, index)
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MinerError::ProxyFailure(_)));
    }

    #[tokio::test]
    async fn test_datasource_write_failure_is_update_failure() {
        let mut index = MockIndex::new();
        index
            .expect_update()
            .returning(|_| Err(BridgeError::IndexError("readonly".to_string())));

        let err = job(FixedProvider { records: vec![] }, index)
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MinerError::UpdateFailure(_)));
    }

    #[tokio::test]
    async fn test_previous_set_failure_is_query_failure() {
        let mut index = MockIndex::new();
        index.expect_update().returning(|_| Ok(()));
        index
            .expect_query()
            .returning(|_| Err(BridgeError::IndexError("corrupt".to_string())));

        let err = job(FixedProvider { records: vec![] }, index)
            .run(CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, MinerError::QueryFailure(_)));
    }

    #[tokio::test]
    async fn test_cancelled_job_touches_nothing() {
        let index = MockIndex::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = job(FixedProvider { records: vec![] }, index)
            .run(cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_stats_merge_and_display() {
        let mut total = JobStats::default();
        total.merge(&JobStats {
            created: 2,
            updated: 1,
            deleted: 0,
            failed: 1,
        });
        total.merge(&JobStats {
            created: 1,
            updated: 0,
            deleted: 3,
            failed: 0,
        });
        assert_eq!(total.to_string(), "3 created, 1 updated, 3 deleted, 1 failed");
    }
}
