//! Remote Catalog Abstraction
//!
//! Access to the content tree of a UPnP/DLNA media server through a
//! remote-object proxy (dLeyna on a desktop session). A connector resolves a
//! server by its UDN and opens container handles by object path; a
//! container either supports server-side search or only lists its direct
//! children.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;

/// Well-known bus name of the dLeyna media server service.
pub const DLEYNA_SERVER_NAME: &str = "com.intel.dleyna-server";

/// Message bus a remote service lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusType {
    #[default]
    Session,
    System,
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Session => f.write_str("session"),
            BusType::System => f.write_str("system"),
        }
    }
}

/// A single property value of a catalog object.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    ObjectPath(String),
    StrList(Vec<String>),
    Bool(bool),
    UInt(u64),
    Int(i64),
}

/// Property bag describing one object returned by a search or listing.
///
/// Media server objects carry at least `DisplayName`, `Type`, `Path`,
/// `URLs` and `MIMEType` when those are requested in the filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogObject {
    properties: BTreeMap<String, PropertyValue>,
}

impl CatalogObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// String-like value (plain string or object path).
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.properties.get(name)? {
            PropertyValue::Str(value) | PropertyValue::ObjectPath(value) => Some(value),
            _ => None,
        }
    }

    /// List value; a single string is returned as a one-element list.
    pub fn get_str_list(&self, name: &str) -> Vec<String> {
        match self.properties.get(name) {
            Some(PropertyValue::StrList(values)) => values.clone(),
            Some(PropertyValue::Str(value)) => vec![value.clone()],
            _ => Vec::new(),
        }
    }
}

/// Identity of a media server known to the connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub udn: String,
    pub friendly_name: String,
    /// Object path of the server's root container
    pub object_path: String,
}

/// Handle on one remote container.
#[async_trait]
pub trait CatalogContainer: Send + Sync {
    /// Object path of this container
    fn object_path(&self) -> &str;

    /// Whether the container answers server-side filtered searches
    async fn is_searchable(&self) -> Result<bool>;

    /// Search the subtree below this container
    async fn search_objects(&self, query: &str, filter: &[&str]) -> Result<Vec<CatalogObject>>;

    /// List direct children; `max == 0` means no limit
    async fn list_children(
        &self,
        offset: u32,
        max: u32,
        filter: &[&str],
    ) -> Result<Vec<CatalogObject>>;
}

/// Remote catalog connector trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::{BusType, CatalogConnector, DLEYNA_SERVER_NAME};
///
/// async fn root_is_searchable(connector: &dyn CatalogConnector, udn: &str) -> Result<bool> {
///     let Some(server) = connector.find_server(udn).await? else {
///         return Ok(false);
///     };
///     let root = connector
///         .connect(BusType::Session, DLEYNA_SERVER_NAME, &server.object_path)
///         .await?;
///     root.is_searchable().await
/// }
/// ```
#[async_trait]
pub trait CatalogConnector: Send + Sync {
    /// Look up a currently reachable server; `None` means offline
    async fn find_server(&self, udn: &str) -> Result<Option<ServerDescriptor>>;

    /// Open a proxy on the container at `object_path`
    async fn connect(
        &self,
        bus: BusType,
        name: &str,
        object_path: &str,
    ) -> Result<Arc<dyn CatalogContainer>>;
}
