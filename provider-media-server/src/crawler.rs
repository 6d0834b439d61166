//! # Content Crawler
//!
//! Collects every photo of a media server.
//!
//! Searchable servers answer one server-side query. Others are walked depth
//! first from the root proxy already held by the [`DlnaServer`]: each
//! sub-container gets its own proxy and a full `ListChildren`; photos are
//! collected and sub-containers are descended into.
//!
//! Failures on the root container fail the crawl: the searchability check,
//! the search, or the root listing. A failure to open or list a
//! sub-container skips that subtree only. The walk is bounded by a maximum
//! depth and never enters the same container twice, so a misbehaving server
//! that reports cycles still terminates.

use std::collections::HashSet;
use std::sync::Arc;

use bridge_traits::catalog::{CatalogConnector, CatalogContainer};
use core_async::sync::CancellationToken;
use core_runtime::config::DEFAULT_CRAWL_MAX_DEPTH;
use tracing::{debug, info, instrument, warn};

use crate::error::{MediaServerError, Result};
use crate::server::{CatalogEndpoint, DlnaServer};
use crate::types::{ContentItem, ItemKind, PROPERTY_FILTER};

pub struct ContentCrawler {
    connector: Arc<dyn CatalogConnector>,
    endpoint: CatalogEndpoint,
    max_depth: usize,
}

impl ContentCrawler {
    pub fn new(connector: Arc<dyn CatalogConnector>, endpoint: CatalogEndpoint) -> Self {
        Self {
            connector,
            endpoint,
            max_depth: DEFAULT_CRAWL_MAX_DEPTH,
        }
    }

    /// Containers deeper than `depth` below the root are not listed.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Photos reachable from the server's root container.
    #[instrument(skip(self, server, cancel), fields(udn = %server.udn()))]
    pub async fn crawl(
        &self,
        server: &DlnaServer,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContentItem>> {
        if server.is_searchable().await? {
            if cancel.is_cancelled() {
                return Err(MediaServerError::Cancelled);
            }
            return server.search_photos().await;
        }

        self.walk(server.root(), cancel).await
    }

    /// Depth-first listing below `root`.
    pub async fn walk(
        &self,
        root: &dyn CatalogContainer,
        cancel: &CancellationToken,
    ) -> Result<Vec<ContentItem>> {
        if cancel.is_cancelled() {
            return Err(MediaServerError::Cancelled);
        }

        let mut photos = Vec::new();
        let mut visited = HashSet::from([root.object_path().to_string()]);
        let mut pending = Vec::new();

        let children = children_of(root).await?;
        sort_children(children, 1, &mut photos, &mut pending);

        while let Some((path, depth)) = pending.pop() {
            if cancel.is_cancelled() {
                return Err(MediaServerError::Cancelled);
            }
            if !visited.insert(path.clone()) {
                warn!(path = %path, "Container reported twice, skipping");
                continue;
            }
            if depth > self.max_depth {
                warn!(path = %path, depth, "Container too deep, skipping");
                continue;
            }

            let children = match self.list(&path).await {
                Some(children) => children,
                None => continue,
            };
            debug!(path = %path, depth, children = children.len(), "Listed container");
            sort_children(children, depth + 1, &mut photos, &mut pending);
        }

        info!(
            root = root.object_path(),
            photos = photos.len(),
            containers = visited.len(),
            "Walk finished"
        );
        Ok(photos)
    }

    async fn list(&self, path: &str) -> Option<Vec<ContentItem>> {
        let container = match self.endpoint.open(self.connector.as_ref(), path).await {
            Ok(container) => container,
            Err(e) => {
                warn!(path, error = %e, "Unable to open container proxy");
                return None;
            }
        };

        match children_of(container.as_ref()).await {
            Ok(children) => Some(children),
            Err(e) => {
                warn!(path, error = %e, "Unable to list children");
                None
            }
        }
    }
}

async fn children_of(container: &dyn CatalogContainer) -> Result<Vec<ContentItem>> {
    let objects = container.list_children(0, 0, PROPERTY_FILTER).await?;
    Ok(objects
        .iter()
        .filter_map(|object| ContentItem::from_object(object, ItemKind::Other(String::new())))
        .collect())
}

/// Keeps photos and queues sub-containers at `depth`.
fn sort_children(
    children: Vec<ContentItem>,
    depth: usize,
    photos: &mut Vec<ContentItem>,
    pending: &mut Vec<(String, usize)>,
) {
    let mut containers = Vec::new();
    for child in children {
        match child.kind {
            ItemKind::Photo => photos.push(child),
            ItemKind::Container => containers.push(child.path),
            ItemKind::Other(_) => {}
        }
    }
    // Reversed so the first listed container is walked first.
    pending.extend(containers.into_iter().rev().map(|child| (child, depth)));
}

impl std::fmt::Debug for ContentCrawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCrawler")
            .field("endpoint", &self.endpoint)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeCatalog, ROOT};
    use bridge_traits::catalog::ServerDescriptor;

    fn descriptor() -> ServerDescriptor {
        ServerDescriptor {
            udn: "uuid:nas".to_string(),
            friendly_name: "NAS".to_string(),
            object_path: ROOT.to_string(),
        }
    }

    fn tree() -> FakeCatalog {
        FakeCatalog::new()
            .photo(ROOT, "p1")
            .container(ROOT, "2019")
            .photo("2019", "p2")
            .container("2019", "summer")
            .photo("summer", "p3")
            .container(ROOT, "empty")
    }

    fn names(mut items: Vec<ContentItem>) -> Vec<String> {
        items.sort_by(|a, b| a.name.cmp(&b.name));
        items.into_iter().map(|item| item.name).collect()
    }

    async fn try_crawl(catalog: Arc<FakeCatalog>, max_depth: usize) -> Result<Vec<ContentItem>> {
        let server = DlnaServer::connect(catalog.as_ref(), &CatalogEndpoint::default(), descriptor())
            .await
            .unwrap();
        ContentCrawler::new(catalog, CatalogEndpoint::default())
            .with_max_depth(max_depth)
            .crawl(&server, &CancellationToken::new())
            .await
    }

    async fn crawl(catalog: FakeCatalog, max_depth: usize) -> Vec<ContentItem> {
        try_crawl(Arc::new(catalog), max_depth).await.unwrap()
    }

    #[tokio::test]
    async fn test_walk_collects_every_level() {
        let photos = crawl(tree(), 32).await;
        assert_eq!(names(photos), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_search_matches_walk() {
        let walked = crawl(tree(), 32).await;
        let searched = crawl(tree().searchable(), 32).await;

        assert_eq!(names(searched.clone()), names(walked.clone()));
        let mut walked_urls: Vec<_> = walked.into_iter().map(|p| p.url).collect();
        let mut searched_urls: Vec<_> = searched.into_iter().map(|p| p.url).collect();
        walked_urls.sort();
        searched_urls.sort();
        assert_eq!(walked_urls, searched_urls);
    }

    #[tokio::test]
    async fn test_failed_subtree_keeps_siblings() {
        let catalog = tree()
            .container(ROOT, "broken")
            .photo("broken", "lost")
            .fail_listing("broken");

        let photos = crawl(catalog, 32).await;
        assert_eq!(names(photos), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_unreachable_container_is_skipped() {
        let catalog = tree().fail_connect("summer");
        let photos = crawl(catalog, 32).await;
        assert_eq!(names(photos), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_cycle_terminates() {
        let catalog = tree().container("summer", "2019");
        let photos = crawl(catalog, 32).await;
        assert_eq!(names(photos), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_depth_bound() {
        let photos = crawl(tree(), 1).await;
        assert_eq!(names(photos), vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_root_is_opened_once() {
        let catalog = Arc::new(tree());
        let photos = try_crawl(catalog.clone(), 32).await.unwrap();

        assert_eq!(names(photos), vec!["p1", "p2", "p3"]);
        // Root plus "2019", "summer" and "empty".
        assert_eq!(catalog.connect_count(), 4);
    }

    #[tokio::test]
    async fn test_root_failures_fail_the_crawl() {
        let failing = [
            tree().fail_listing(ROOT),
            tree().searchable().fail_search(),
            tree().fail_searchable_check(),
        ];
        for catalog in failing {
            let err = try_crawl(Arc::new(catalog), 32).await.unwrap_err();
            assert!(matches!(err, MediaServerError::Catalog(_)), "{:?}", err);
        }
    }

    #[tokio::test]
    async fn test_cancelled_walk() {
        let catalog = Arc::new(tree());
        let server = DlnaServer::connect(catalog.as_ref(), &CatalogEndpoint::default(), descriptor())
            .await
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = ContentCrawler::new(catalog.clone(), CatalogEndpoint::default())
            .walk(server.root(), &cancel)
            .await;
        assert!(matches!(result, Err(MediaServerError::Cancelled)));
        assert_eq!(catalog.connect_count(), 1);
    }
}
