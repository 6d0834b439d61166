//! # Miner Scheduler
//!
//! Runs a full refresh of every qualifying account for one engine.
//!
//! ## Workflow
//!
//! 1. List accounts from the account directory
//! 2. Keep the engine's accounts whose service set is non-empty
//! 3. Sweep stale datasources on the engine's serial cleanup queue
//! 4. Run one [`AccountMinerJob`] per qualifying account, concurrently
//! 5. Report once the sweep and every job have finished
//!
//! Job failures are logged and published on the [`EventBus`]; they never
//! fail the refresh. Only cancellation and an unreachable account directory
//! do.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let miner = Arc::new(Miner::new(provider, &config, EventBus::default()));
//! let summary = miner.refresh_db(CancellationToken::new()).await?;
//! println!("{} jobs succeeded", summary.jobs_succeeded);
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bridge_traits::{Account, AccountDirectory, ContentKind, IndexConnection};
use core_async::queue::SerialQueue;
use core_async::sync::CancellationToken;
use core_async::task::{self, JoinHandle, JoinSet};
use core_runtime::events::{EventBus, MinerEvent};
use core_runtime::MinerConfig;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::cancel::until_cancelled;
use crate::error::{MinerError, Result};
use crate::job::{AccountMinerJob, JobStats};
use crate::provider::{MinerProvider, SharedContentRequest};
use crate::registry::ProviderRegistry;
use crate::store;
use crate::sweep::StaleDatasourceSweep;
use crate::urn;

/// Outcome of one refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub refresh_id: String,
    /// Datasources removed by the sweep; empty when the sweep failed.
    pub swept_datasources: Vec<String>,
    pub sweep_failed: bool,
    pub jobs_succeeded: usize,
    pub jobs_failed: usize,
    /// Totals over the successful jobs.
    pub stats: JobStats,
}

/// Scheduler for one engine.
pub struct Miner {
    provider: Arc<dyn MinerProvider>,
    accounts: Arc<dyn AccountDirectory>,
    index: Arc<dyn IndexConnection>,
    index_types: BTreeSet<ContentKind>,
    cleanup_queue: SerialQueue,
    events: EventBus,
}

impl Miner {
    /// Creates a scheduler with its own cleanup queue.
    pub fn new(provider: Arc<dyn MinerProvider>, config: &MinerConfig, events: EventBus) -> Self {
        let cleanup_queue = SerialQueue::new(format!("{}-cleanup", provider.provider_type()));
        Self {
            provider,
            accounts: config.account_directory.clone(),
            index: config.index.clone(),
            index_types: config.index_types.clone(),
            cleanup_queue,
            events,
        }
    }

    /// Creates a scheduler for the engine registered under `provider_type`.
    pub fn from_registry(
        registry: &ProviderRegistry,
        provider_type: &str,
        config: &MinerConfig,
        events: EventBus,
    ) -> Result<Self> {
        let provider = registry.get(provider_type).ok_or_else(|| {
            MinerError::UnsupportedService(format!(
                "no engine registered for provider type {}",
                provider_type
            ))
        })?;
        Ok(Self::new(provider, config, events))
    }

    /// Shares `queue` for the stale-datasource sweep, serializing sweeps
    /// across every scheduler holding a clone of it.
    pub fn with_cleanup_queue(mut self, queue: SerialQueue) -> Self {
        self.cleanup_queue = queue;
        self
    }

    pub fn provider(&self) -> &Arc<dyn MinerProvider> {
        &self.provider
    }

    pub fn provider_type(&self) -> &str {
        self.provider.provider_type()
    }

    /// Provider name of the first configured account of this engine's
    /// provider type, or an empty string when there is none.
    pub async fn display_name(&self) -> Result<String> {
        let accounts = self
            .accounts
            .list_accounts()
            .await
            .map_err(MinerError::connection_failure)?;
        Ok(accounts
            .into_iter()
            .find(|account| account.provider_type == self.provider.provider_type())
            .map(|account| account.provider_name)
            .unwrap_or_default())
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Whether this scheduler indexes `kind` at all.
    pub fn supports_type(&self, kind: ContentKind) -> bool {
        self.index_types.contains(&kind) && self.provider.supported_kinds().contains(&kind)
    }

    /// Refreshes every qualifying account.
    ///
    /// Resolves once the sweep and all jobs have finished. Fails only when
    /// the account directory is unreachable or `cancel` fires.
    #[instrument(skip(self, cancel), fields(miner = %self.provider.miner_identifier()))]
    pub async fn refresh_db(&self, cancel: CancellationToken) -> Result<RefreshSummary> {
        let started = Instant::now();
        let refresh_id = Uuid::new_v4().to_string();
        let mut summary = RefreshSummary {
            refresh_id: refresh_id.clone(),
            ..Default::default()
        };

        let accounts = until_cancelled(&cancel, async {
            self.accounts
                .list_accounts()
                .await
                .map_err(MinerError::connection_failure)
        })
        .await
        .map_err(|e| self.on_cancelled(&refresh_id, e))?;

        let own: Vec<Account> = accounts
            .into_iter()
            .filter(|account| account.provider_type == self.provider.provider_type())
            .collect();
        let configured: BTreeSet<String> = own
            .iter()
            .map(|account| urn::datasource_urn(&account.id))
            .collect();

        let jobs: Vec<AccountMinerJob> = own
            .into_iter()
            .filter_map(|account| {
                let services = self.provider.create_services(&account, &self.index_types);
                if services.is_empty() {
                    return None;
                }
                Some(AccountMinerJob::new(
                    self.provider.clone(),
                    self.index.clone(),
                    account,
                    services,
                ))
            })
            .collect();

        info!(qualifying_accounts = jobs.len(), "Refresh started");
        self.events.emit(MinerEvent::RefreshStarted {
            refresh_id: refresh_id.clone(),
            miner: self.provider.miner_identifier().to_string(),
            qualifying_accounts: jobs.len(),
        });

        let sweep = StaleDatasourceSweep::new(
            self.index.clone(),
            self.provider.miner_identifier(),
            self.provider.version(),
            configured,
        );
        match self.run_sweep(sweep, &cancel).await {
            Ok(removed) => {
                self.events.emit(MinerEvent::SweepCompleted {
                    refresh_id: refresh_id.clone(),
                    removed_datasources: removed.clone(),
                });
                summary.swept_datasources = removed;
            }
            Err(MinerError::Cancelled) => {
                return Err(self.on_cancelled(&refresh_id, MinerError::Cancelled))
            }
            Err(e) => {
                warn!(error = %e, "Stale datasource sweep failed");
                self.events.emit(MinerEvent::SweepFailed {
                    refresh_id: refresh_id.clone(),
                    message: e.to_string(),
                });
                summary.sweep_failed = true;
            }
        }

        let mut running = JoinSet::new();
        for job in jobs {
            let account_id = job.account().id.clone();
            let token = cancel.child_token();
            running.spawn(async move { (account_id, job.run(token).await) });
        }

        while let Some(joined) = running.join_next().await {
            let (account_id, outcome) = match joined {
                Ok(finished) => finished,
                Err(e) => {
                    error!(error = %e, "Account job task did not complete");
                    summary.jobs_failed += 1;
                    continue;
                }
            };

            match outcome {
                Ok(stats) => {
                    summary.jobs_succeeded += 1;
                    summary.stats.merge(&stats);
                    self.events.emit(MinerEvent::JobCompleted {
                        refresh_id: refresh_id.clone(),
                        account_id,
                        created: stats.created,
                        updated: stats.updated,
                        deleted: stats.deleted,
                        failed: stats.failed,
                    });
                }
                Err(MinerError::Cancelled) => {}
                Err(e) => {
                    error!(account_id = %account_id, error = %e, "Account job failed");
                    summary.jobs_failed += 1;
                    self.events.emit(MinerEvent::JobFailed {
                        refresh_id: refresh_id.clone(),
                        account_id,
                        message: e.to_string(),
                    });
                }
            }
        }

        if cancel.is_cancelled() {
            return Err(self.on_cancelled(&refresh_id, MinerError::Cancelled));
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            jobs_succeeded = summary.jobs_succeeded,
            jobs_failed = summary.jobs_failed,
            duration_ms,
            "Refresh completed"
        );
        self.events.emit(MinerEvent::RefreshCompleted {
            refresh_id,
            jobs_succeeded: summary.jobs_succeeded,
            jobs_failed: summary.jobs_failed,
            duration_ms,
        });

        Ok(summary)
    }

    /// Runs [`refresh_db`](Self::refresh_db) on its own task.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<RefreshSummary>> {
        let miner = Arc::clone(self);
        task::spawn(async move { miner.refresh_db(cancel).await })
    }

    /// Indexes one item shared with the user and links it to `source_urn`.
    ///
    /// The item lands in the account's datasource and carries
    /// `nie:relatedTo <source_urn>`.
    #[instrument(skip(self, cancel), fields(miner = %self.provider.miner_identifier()))]
    pub async fn insert_shared_content(
        &self,
        account_id: &str,
        shared_id: &str,
        shared_type: &str,
        source_urn: &str,
        cancel: CancellationToken,
    ) -> Result<String> {
        let account = until_cancelled(&cancel, async {
            self.accounts
                .find_account(account_id)
                .await
                .map_err(MinerError::connection_failure)
        })
        .await?
        .filter(|account| account.provider_type == self.provider.provider_type())
        .ok_or_else(|| MinerError::AccountNotFound(account_id.to_string()))?;

        let datasource_urn = urn::datasource_urn(&account.id);
        let index = self.index.as_ref();

        until_cancelled(
            &cancel,
            store::ensure_datasource(
                index,
                &datasource_urn,
                self.provider.miner_identifier(),
                self.provider.version(),
            ),
        )
        .await?;

        let request = SharedContentRequest {
            account,
            datasource_urn: datasource_urn.clone(),
            shared_id: shared_id.to_string(),
            shared_type: shared_type.to_string(),
            source_urn: source_urn.to_string(),
            cancel: cancel.clone(),
        };
        let record = until_cancelled(&cancel, self.provider.shared_content(&request)).await?;

        let upserted = until_cancelled(
            &cancel,
            store::upsert_resource(index, &request.account.id, &datasource_urn, &record),
        )
        .await?;
        until_cancelled(
            &cancel,
            store::link_related(index, &datasource_urn, &upserted.urn, source_urn),
        )
        .await?;

        info!(urn = %upserted.urn, source = source_urn, "Shared content indexed");
        Ok(upserted.urn)
    }

    /// Runs [`insert_shared_content`](Self::insert_shared_content) on its
    /// own task.
    pub fn spawn_insert_shared_content(
        self: &Arc<Self>,
        account_id: String,
        shared_id: String,
        shared_type: String,
        source_urn: String,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<String>> {
        let miner = Arc::clone(self);
        task::spawn(async move {
            miner
                .insert_shared_content(&account_id, &shared_id, &shared_type, &source_urn, cancel)
                .await
        })
    }

    async fn run_sweep(
        &self,
        sweep: StaleDatasourceSweep,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let token = cancel.clone();
        let queued = self
            .cleanup_queue
            .submit(async move { until_cancelled(&token, sweep.run()).await })
            .map_err(|e| MinerError::Internal(e.to_string()))?;

        until_cancelled(cancel, async {
            queued.await.map_err(|_| {
                MinerError::Internal(format!(
                    "cleanup queue {} dropped the sweep",
                    self.cleanup_queue.name()
                ))
            })?
        })
        .await
    }

    fn on_cancelled(&self, refresh_id: &str, err: MinerError) -> MinerError {
        if err.is_cancelled() {
            info!(refresh_id, "Refresh cancelled");
            self.events.emit(MinerEvent::RefreshCancelled {
                refresh_id: refresh_id.to_string(),
                miner: self.provider.miner_identifier().to_string(),
            });
        }
        err
    }
}

impl fmt::Debug for Miner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Miner")
            .field("provider", &self.provider.provider_type())
            .field("index_types", &self.index_types)
            .field("cleanup_queue", &self.cleanup_queue)
            .finish()
    }
}
