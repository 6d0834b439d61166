//! Workspace facade crate.
//!
//! Re-exports the miner core together with the provider crates selected
//! through feature flags, so a host daemon can depend on `online-miners`
//! alone instead of wiring each workspace crate individually.
//!
//! - `media-server`: DLNA/UPnP photo miner (`provider-media-server`)
//! - `google-drive`: Google Drive document miner (`provider-google-drive`)
//! - `desktop-shims`: SQLite index, JSON account directory and reqwest HTTP client
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = online_miners::provider_registry(&config);
//! for provider_type in registry.provider_types() {
//!     let miner = Miner::from_registry(&registry, provider_type, &config, events.clone())?;
//!     miner.refresh_db(cancel.child_token()).await?;
//! }
//! ```

pub use bridge_traits;
pub use core_miner;
pub use core_runtime;

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop;

#[cfg(feature = "media-server")]
pub use provider_media_server;

#[cfg(feature = "google-drive")]
pub use provider_google_drive;

use core_miner::ProviderRegistry;
use core_runtime::MinerConfig;

/// Engines of the enabled provider crates, keyed by provider type.
///
/// The media server engine needs `catalog_connector` and the Google Drive
/// engine needs `http_client`. An engine whose bridge is not configured is
/// left out.
pub fn provider_registry(config: &MinerConfig) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    register_media_server(&mut registry, config);
    register_google_drive(&mut registry, config);
    tracing::info!(
        providers = ?registry.provider_types().collect::<Vec<_>>(),
        "Provider registry ready"
    );
    registry
}

#[cfg(feature = "media-server")]
fn register_media_server(registry: &mut ProviderRegistry, config: &MinerConfig) {
    match provider_media_server::MediaServerMiner::from_config(config) {
        Ok(miner) => {
            registry.register(std::sync::Arc::new(miner));
        }
        Err(e) => tracing::info!(error = %e, "Media server engine not registered"),
    }
}

#[cfg(not(feature = "media-server"))]
fn register_media_server(_registry: &mut ProviderRegistry, _config: &MinerConfig) {}

#[cfg(feature = "google-drive")]
fn register_google_drive(registry: &mut ProviderRegistry, config: &MinerConfig) {
    match provider_google_drive::GoogleDriveMiner::from_config(config) {
        Ok(miner) => {
            registry.register(std::sync::Arc::new(miner));
        }
        Err(e) => tracing::info!(error = %e, "Google Drive engine not registered"),
    }
}

#[cfg(not(feature = "google-drive"))]
fn register_google_drive(_registry: &mut ProviderRegistry, _config: &MinerConfig) {}

#[cfg(all(
    test,
    feature = "desktop-shims",
    feature = "media-server",
    feature = "google-drive"
))]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::{JsonAccountDirectory, ReqwestHttpClient, SqliteIndex};
    use bridge_traits::catalog::{BusType, CatalogConnector, CatalogContainer, ServerDescriptor};
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use core_miner::{Miner, MinerError};
    use core_runtime::events::EventBus;
    use core_runtime::MinerConfigBuilder;
    use std::sync::Arc;

    struct NoServers;

    #[async_trait]
    impl CatalogConnector for NoServers {
        async fn find_server(&self, _udn: &str) -> BridgeResult<Option<ServerDescriptor>> {
            Ok(None)
        }

        async fn connect(
            &self,
            _bus: BusType,
            _name: &str,
            object_path: &str,
        ) -> BridgeResult<Arc<dyn CatalogContainer>> {
            Err(BridgeError::NotAvailable(object_path.to_string()))
        }
    }

    async fn builder(dir: &tempfile::TempDir) -> MinerConfigBuilder {
        let index = SqliteIndex::in_memory().await.unwrap();
        MinerConfig::builder()
            .account_directory(Arc::new(JsonAccountDirectory::new(
                dir.path().join("accounts.json"),
            )))
            .index(Arc::new(index))
    }

    #[tokio::test]
    async fn test_registry_holds_configured_engines() {
        let dir = tempfile::tempdir().unwrap();
        let config = builder(&dir)
            .await
            .catalog_connector(Arc::new(NoServers))
            .http_client(Arc::new(ReqwestHttpClient::new().unwrap()))
            .build()
            .unwrap();

        let registry = provider_registry(&config);
        assert_eq!(
            registry.provider_types().collect::<Vec<_>>(),
            vec!["google", "media-server"]
        );

        let miner = Miner::from_registry(&registry, "media-server", &config, EventBus::default())
            .unwrap();
        let summary = miner
            .refresh_db(core_async::sync::CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.jobs_succeeded, 0);
    }

    #[tokio::test]
    async fn test_engine_without_bridge_is_left_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = builder(&dir)
            .await
            .catalog_connector(Arc::new(NoServers))
            .build()
            .unwrap();

        let registry = provider_registry(&config);
        assert_eq!(registry.provider_types().collect::<Vec<_>>(), vec!["media-server"]);

        let err = Miner::from_registry(&registry, "google", &config, EventBus::default())
            .unwrap_err();
        assert!(matches!(err, MinerError::UnsupportedService(_)));
    }
}
