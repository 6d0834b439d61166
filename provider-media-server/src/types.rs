//! Content items produced by the crawler.

use bridge_traits::catalog::CatalogObject;

/// `Type` of photo objects.
pub const PHOTO_TYPE: &str = "image.photo";

/// `Type` of container objects.
pub const CONTAINER_TYPE: &str = "container";

/// Properties requested for every searched or listed object.
pub const PROPERTY_FILTER: &[&str] = &["DisplayName", "Type", "Path", "URLs", "MIMEType"];

/// Server-side query selecting every photo below a container.
pub const PHOTO_SEARCH_QUERY: &str = "Type = \"image.photo\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemKind {
    Photo,
    Container,
    Other(String),
}

impl ItemKind {
    pub fn from_type(value: &str) -> Self {
        match value {
            PHOTO_TYPE => ItemKind::Photo,
            CONTAINER_TYPE => ItemKind::Container,
            other => ItemKind::Other(other.to_string()),
        }
    }
}

/// One object of a media server's content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    /// Display name without its file extension
    pub name: String,
    pub mime_type: Option<String>,
    /// Object path on the catalog service
    pub path: String,
    pub kind: ItemKind,
    /// First of the object's URLs; always `None` for containers
    pub url: Option<String>,
}

impl ContentItem {
    /// Maps a catalog object, using `default_kind` when the object carries
    /// no `Type`. Objects without a `Path` cannot be identified and yield
    /// `None`.
    pub fn from_object(object: &CatalogObject, default_kind: ItemKind) -> Option<Self> {
        let path = object.get_str("Path")?.to_string();
        let kind = object
            .get_str("Type")
            .map(ItemKind::from_type)
            .unwrap_or(default_kind);
        let url = match kind {
            ItemKind::Container => None,
            _ => object.get_str_list("URLs").into_iter().next(),
        };

        Some(Self {
            name: strip_extension(object.get_str("DisplayName").unwrap_or_default()).to_string(),
            mime_type: object.get_str("MIMEType").map(str::to_string),
            path,
            kind,
            url,
        })
    }

    /// Last segment of the object path, the item's stable id on the server.
    pub fn object_id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn is_photo(&self) -> bool {
        self.kind == ItemKind::Photo
    }
}

/// `"beach.jpg"` becomes `"beach"`; dot-files and names without an
/// extension are kept as they are.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
