//! Provider-neutral description of one remote item.

use bridge_traits::index::{vocab, Term};

use crate::urn;

/// One item a provider reports for an account, ready to be written to the
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    /// Resource kind, e.g. `media-server` or `google:drive`.
    pub kind: String,
    /// Id of the item inside the remote catalog.
    pub id: String,
    /// `<kind>:<id>`, unique within the datasource.
    pub identifier: String,
    pub classes: Vec<String>,
    /// Single-valued properties, replaced on every refresh.
    pub properties: Vec<(String, Term)>,
}

impl ResourceRecord {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        let kind = kind.into();
        let id = id.into();
        Self {
            identifier: format!("{}:{}", kind, id),
            kind,
            id,
            classes: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// URN minted for this item when `account_id` indexes it first.
    pub fn urn(&self, account_id: &str) -> String {
        urn::resource_urn(&self.kind, account_id, &self.id)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn with_property(mut self, property: impl Into<String>, value: Term) -> Self {
        self.properties.push((property.into(), value));
        self
    }

    /// Adds a literal property when `value` is present.
    pub fn with_optional_literal(self, property: &str, value: Option<&str>) -> Self {
        match value {
            Some(value) => self.with_property(property, Term::literal(value)),
            None => self,
        }
    }

    pub fn with_url(self, url: Option<&str>) -> Self {
        self.with_optional_literal(vocab::NIE_URL, url)
    }

    pub fn with_mime_type(self, mime_type: Option<&str>) -> Self {
        self.with_optional_literal(vocab::NIE_MIME_TYPE, mime_type)
    }

    pub fn with_title(self, title: Option<&str>) -> Self {
        self.with_optional_literal(vocab::NIE_TITLE, title)
    }

    pub fn property(&self, property: &str) -> Option<&Term> {
        self.properties
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }
}
