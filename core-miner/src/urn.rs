//! Identifier scheme shared by every engine.
//!
//! Datasources are `gd:goa-account:<account-id>` and their versioned root
//! element hangs off the same URN. Resources are
//! `gd:<kind>:<account-id>:<id>`, so two accounts reporting the same remote
//! item never share a resource.

/// Prefix of every URN the miners mint.
pub const ENGINE_PREFIX: &str = "gd";

pub fn datasource_urn(account_id: &str) -> String {
    format!("{}:goa-account:{}", ENGINE_PREFIX, account_id)
}

pub fn root_element_urn(datasource_urn: &str) -> String {
    format!("{}:root-element", datasource_urn)
}

/// URN of the item `id` of `kind` as indexed for `account_id`.
pub fn resource_urn(kind: &str, account_id: &str, id: &str) -> String {
    format!("{}:{}:{}:{}", ENGINE_PREFIX, kind, account_id, id)
}
