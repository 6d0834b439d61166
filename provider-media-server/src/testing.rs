//! In-memory media server catalog used by the unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::catalog::{
    BusType, CatalogConnector, CatalogContainer, CatalogObject, PropertyValue, ServerDescriptor,
};
use bridge_traits::error::{BridgeError, Result};

use crate::types::{CONTAINER_TYPE, PHOTO_TYPE};

pub const ROOT: &str = "/com/intel/dLeynaServer/server/0";

#[derive(Default)]
pub struct FakeCatalog {
    children: BTreeMap<String, Vec<CatalogObject>>,
    servers: BTreeMap<String, ServerDescriptor>,
    searchable: bool,
    fail_searchable_check: bool,
    fail_search: bool,
    fail_listing: HashSet<String>,
    fail_connect: HashSet<String>,
    connects: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        let mut catalog = Self::default();
        catalog.children.insert(ROOT.to_string(), Vec::new());
        catalog
    }

    pub fn photo(mut self, parent: &str, id: &str) -> Self {
        let object = CatalogObject::new()
            .with("DisplayName", PropertyValue::Str(format!("{}.jpg", id)))
            .with("Type", PropertyValue::Str(PHOTO_TYPE.to_string()))
            .with("Path", PropertyValue::ObjectPath(format!("/items/{}", id)))
            .with("MIMEType", PropertyValue::Str("image/jpeg".to_string()))
            .with(
                "URLs",
                PropertyValue::StrList(vec![format!("http://nas/{}.jpg", id)]),
            );
        self.children.entry(parent.to_string()).or_default().push(object);
        self
    }

    /// Adds container `name` below `parent`; its object path is `name`.
    pub fn container(mut self, parent: &str, name: &str) -> Self {
        let object = CatalogObject::new()
            .with("DisplayName", PropertyValue::Str(name.to_string()))
            .with("Type", PropertyValue::Str(CONTAINER_TYPE.to_string()))
            .with("Path", PropertyValue::ObjectPath(name.to_string()));
        self.children.entry(parent.to_string()).or_default().push(object);
        self.children.entry(name.to_string()).or_default();
        self
    }

    pub fn server(mut self, udn: &str) -> Self {
        self.servers.insert(
            udn.to_string(),
            ServerDescriptor {
                udn: udn.to_string(),
                friendly_name: format!("Server {}", udn),
                object_path: ROOT.to_string(),
            },
        );
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    /// `IsSearchable` errors on every container.
    pub fn fail_searchable_check(mut self) -> Self {
        self.fail_searchable_check = true;
        self
    }

    pub fn fail_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    pub fn fail_listing(mut self, path: &str) -> Self {
        self.fail_listing.insert(path.to_string());
        self
    }

    pub fn fail_connect(mut self, path: &str) -> Self {
        self.fail_connect.insert(path.to_string());
        self
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn all_photos(&self) -> Vec<CatalogObject> {
        self.children
            .values()
            .flatten()
            .filter(|object| object.get_str("Type") == Some(PHOTO_TYPE))
            .cloned()
            .collect()
    }
}

struct FakeContainer {
    path: String,
    searchable: Option<bool>,
    children: Option<Vec<CatalogObject>>,
    search: Option<Vec<CatalogObject>>,
}

#[async_trait]
impl CatalogContainer for FakeContainer {
    fn object_path(&self) -> &str {
        &self.path
    }

    async fn is_searchable(&self) -> Result<bool> {
        self.searchable
            .ok_or_else(|| BridgeError::RemoteError("Searchable property unavailable".to_string()))
    }

    async fn search_objects(&self, _query: &str, _filter: &[&str]) -> Result<Vec<CatalogObject>> {
        self.search
            .clone()
            .ok_or_else(|| BridgeError::RemoteError("SearchObjects failed".to_string()))
    }

    async fn list_children(
        &self,
        _offset: u32,
        _max: u32,
        _filter: &[&str],
    ) -> Result<Vec<CatalogObject>> {
        self.children
            .clone()
            .ok_or_else(|| BridgeError::RemoteError(format!("ListChildren failed on {}", self.path)))
    }
}

#[async_trait]
impl CatalogConnector for FakeCatalog {
    async fn find_server(&self, udn: &str) -> Result<Option<ServerDescriptor>> {
        Ok(self.servers.get(udn).cloned())
    }

    async fn connect(
        &self,
        _bus: BusType,
        _name: &str,
        object_path: &str,
    ) -> Result<Arc<dyn CatalogContainer>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.contains(object_path) {
            return Err(BridgeError::NotAvailable(format!(
                "no object at {}",
                object_path
            )));
        }

        let children = if self.fail_listing.contains(object_path) {
            None
        } else {
            Some(self.children.get(object_path).cloned().unwrap_or_default())
        };
        let search = if self.fail_search {
            None
        } else {
            Some(self.all_photos())
        };

        Ok(Arc::new(FakeContainer {
            path: object_path.to_string(),
            searchable: (!self.fail_searchable_check).then_some(self.searchable),
            children,
            search,
        }))
    }
}
