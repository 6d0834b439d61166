//! Media server engine.

use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::catalog::CatalogConnector;
use bridge_traits::index::vocab;
use bridge_traits::ContentKind;
use core_miner::{JobContext, MinerError, MinerProvider, ResourceRecord};
use core_runtime::MinerConfig;
use tracing::{info, instrument};

use crate::crawler::ContentCrawler;
use crate::error::{MediaServerError, Result};
use crate::server::{CatalogEndpoint, DlnaServer};
use crate::types::ContentItem;

/// Account provider type handled by this engine.
pub const PROVIDER_TYPE: &str = "media-server";

pub const MINER_IDENTIFIER: &str = "gd:media-server:miner:a4a47a3e-eb55-11e3-b983-14feb59cfa0e";

pub const MINER_VERSION: i32 = 1;

/// Account attribute holding the server's UDN.
pub const UDN_ATTRIBUTE: &str = "udn";

const SUPPORTED_KINDS: [ContentKind; 1] = [ContentKind::Photos];

/// Indexes the photos of DLNA/UPnP media servers.
pub struct MediaServerMiner {
    connector: Arc<dyn CatalogConnector>,
    endpoint: CatalogEndpoint,
    crawler: ContentCrawler,
}

impl MediaServerMiner {
    pub fn new(connector: Arc<dyn CatalogConnector>) -> Self {
        Self::with_endpoint(connector, CatalogEndpoint::default())
    }

    pub fn with_endpoint(connector: Arc<dyn CatalogConnector>, endpoint: CatalogEndpoint) -> Self {
        let crawler = ContentCrawler::new(connector.clone(), endpoint.clone());
        Self {
            connector,
            endpoint,
            crawler,
        }
    }

    /// Builds the engine from the shared configuration, which must carry a
    /// catalog connector.
    pub fn from_config(config: &MinerConfig) -> Result<Self> {
        let connector = config
            .catalog_connector
            .clone()
            .ok_or(MediaServerError::NoConnector)?;
        let endpoint = CatalogEndpoint {
            retry: config.proxy_retry.clone(),
            ..CatalogEndpoint::default()
        };
        let crawler =
            ContentCrawler::new(connector.clone(), endpoint.clone()).with_max_depth(config.crawl_max_depth);

        Ok(Self {
            connector,
            endpoint,
            crawler,
        })
    }

    /// Photos of the server with `udn`; `None` when the server is offline.
    ///
    /// A server that is present but whose root cannot be opened, queried or
    /// listed is a [`MinerError::ProxyFailure`], so the job fails and the
    /// account's indexed content is left in place.
    async fn photos(&self, udn: &str, ctx: &JobContext) -> core_miner::Result<Option<Vec<ContentItem>>> {
        let descriptor = self
            .connector
            .find_server(udn)
            .await
            .map_err(MinerError::proxy_failure)?;
        let Some(descriptor) = descriptor else {
            return Ok(None);
        };

        let server = DlnaServer::connect(self.connector.as_ref(), &self.endpoint, descriptor).await?;
        let photos = self.crawler.crawl(&server, &ctx.cancel).await?;
        Ok(Some(photos))
    }
}

/// Index record for one photo.
pub fn photo_record(photo: &ContentItem) -> ResourceRecord {
    ResourceRecord::new(PROVIDER_TYPE, photo.object_id())
        .with_class(vocab::NFO_REMOTE_DATA_OBJECT)
        .with_class(vocab::NMM_PHOTO)
        .with_url(photo.url.as_deref())
        .with_mime_type(photo.mime_type.as_deref())
        .with_title(Some(photo.name.as_str()))
}

#[async_trait]
impl MinerProvider for MediaServerMiner {
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
        ctx.require_service(ContentKind::Photos)?;

        let udn = ctx
            .account
            .attribute(UDN_ATTRIBUTE)
            .ok_or_else(|| MediaServerError::MissingUdn(ctx.account.id.clone()))?;

        match self.photos(udn, ctx).await? {
            Some(photos) => Ok(photos.iter().map(photo_record).collect()),
            None => {
                info!(udn, "Media server is offline");
                Ok(Vec::new())
            }
        }
    }
}

impl std::fmt::Debug for MediaServerMiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaServerMiner")
            .field("endpoint", &self.endpoint)
            .field("crawler", &self.crawler)
            .finish()
    }
}
