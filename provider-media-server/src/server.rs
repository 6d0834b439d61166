//! Handle on one reachable media server.

use std::sync::Arc;

use bridge_traits::catalog::{
    BusType, CatalogConnector, CatalogContainer, ServerDescriptor, DLEYNA_SERVER_NAME,
};
use bridge_traits::RetryPolicy;
use core_async::time::sleep;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{ContentItem, ItemKind, PHOTO_SEARCH_QUERY, PROPERTY_FILTER};

/// Where container proxies are opened.
#[derive(Debug, Clone)]
pub struct CatalogEndpoint {
    pub bus: BusType,
    pub name: String,
    /// Applied to every proxy that is opened.
    pub retry: RetryPolicy,
}

impl Default for CatalogEndpoint {
    fn default() -> Self {
        Self {
            bus: BusType::Session,
            name: DLEYNA_SERVER_NAME.to_string(),
            retry: RetryPolicy::no_retry(),
        }
    }
}

impl CatalogEndpoint {
    /// Opens a proxy on `object_path`, retrying per the endpoint's policy.
    pub async fn open(
        &self,
        connector: &dyn CatalogConnector,
        object_path: &str,
    ) -> Result<Arc<dyn CatalogContainer>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match connector.connect(self.bus, &self.name, object_path).await {
                Ok(container) => return Ok(container),
                Err(e) if self.retry.should_retry(attempt) => {
                    let delay = self.retry.delay_for_attempt(attempt);
                    warn!(
                        object_path,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Failed to open container proxy, retrying"
                    );
                    sleep(delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// A media server together with a proxy on its root container.
pub struct DlnaServer {
    descriptor: ServerDescriptor,
    root: Arc<dyn CatalogContainer>,
}

impl DlnaServer {
    pub async fn connect(
        connector: &dyn CatalogConnector,
        endpoint: &CatalogEndpoint,
        descriptor: ServerDescriptor,
    ) -> Result<Self> {
        let root = endpoint.open(connector, &descriptor.object_path).await?;
        Ok(Self { descriptor, root })
    }

    pub fn udn(&self) -> &str {
        &self.descriptor.udn
    }

    pub fn friendly_name(&self) -> &str {
        &self.descriptor.friendly_name
    }

    pub fn object_path(&self) -> &str {
        &self.descriptor.object_path
    }

    /// Proxy on the root container, opened once by [`DlnaServer::connect`].
    pub fn root(&self) -> &dyn CatalogContainer {
        self.root.as_ref()
    }

    pub async fn is_searchable(&self) -> Result<bool> {
        Ok(self.root.is_searchable().await?)
    }

    /// Every photo below the root, in one server-side search.
    pub async fn search_photos(&self) -> Result<Vec<ContentItem>> {
        let objects = self
            .root
            .search_objects(PHOTO_SEARCH_QUERY, PROPERTY_FILTER)
            .await?;
        debug!(udn = %self.udn(), results = objects.len(), "Photo search finished");

        Ok(objects
            .iter()
            .filter_map(|object| ContentItem::from_object(object, ItemKind::Photo))
            .filter(ContentItem::is_photo)
            .collect())
    }
}

impl std::fmt::Debug for DlnaServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DlnaServer")
            .field("descriptor", &self.descriptor)
            .field("root", &self.root.object_path())
            .finish()
    }
}
