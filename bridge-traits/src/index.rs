//! Semantic Index Abstraction
//!
//! The index is a graph store addressed with SPARQL-style statements. The
//! miners only ever issue the small, fixed set of statements modelled by
//! [`Update`] and [`Query`]; each renders to SPARQL text through `Display`,
//! so a textual backend sends `statement.to_string()` while structured
//! backends (such as the desktop SQLite store) match on the variants.
//!
//! Statements are independent: the index is assumed safe for concurrent
//! callers and no statement spans a transaction with another one.

use async_trait::async_trait;
use std::fmt;

use crate::error::Result;

/// Vocabulary used by the miners.
pub mod vocab {
    pub const RDF_TYPE: &str = "rdf:type";
    pub const RDFS_RESOURCE: &str = "rdfs:Resource";
    pub const NIE_DATA_SOURCE_CLASS: &str = "nie:DataSource";
    pub const NIE_INFORMATION_ELEMENT: &str = "nie:InformationElement";
    pub const NAO_IDENTIFIER: &str = "nao:identifier";
    pub const NIE_ROOT_ELEMENT_OF: &str = "nie:rootElementOf";
    pub const NIE_VERSION: &str = "nie:version";
    pub const NIE_DATA_SOURCE: &str = "nie:dataSource";
    pub const NIE_URL: &str = "nie:url";
    pub const NIE_MIME_TYPE: &str = "nie:mimeType";
    pub const NIE_TITLE: &str = "nie:title";
    pub const NIE_CONTENT_LAST_MODIFIED: &str = "nie:contentLastModified";
    pub const NIE_RELATED_TO: &str = "nie:relatedTo";
    pub const NFO_REMOTE_DATA_OBJECT: &str = "nfo:RemoteDataObject";
    pub const NFO_DOCUMENT: &str = "nfo:Document";
    pub const NMM_PHOTO: &str = "nmm:Photo";
}

/// Object of a triple: either a resource IRI or a plain literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Iri(String),
    Literal(String),
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(value.into())
    }

    /// The raw value without SPARQL quoting.
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(value) | Term::Literal(value) => value,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::Literal(value) => write!(f, "\"{}\"", escape_literal(value)),
        }
    }
}

/// Escapes a string for use inside a double-quoted SPARQL literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Write statements issued by the miners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Insert-or-replace the datasource and its versioned root element.
    EnsureDatasource {
        datasource_urn: String,
        root_element_urn: String,
        miner_identifier: String,
        version: i32,
    },
    /// Insert-or-replace a resource with its classes and identifier.
    InsertResource {
        graph: String,
        urn: String,
        identifier: String,
        classes: Vec<String>,
    },
    /// Attach a resource to its datasource.
    SetDataSource {
        graph: String,
        resource: String,
        datasource_urn: String,
    },
    /// Insert-or-replace one property value of a resource.
    InsertOrReplace {
        graph: String,
        resource: String,
        property: String,
        value: Term,
    },
    /// Delete the given resources entirely.
    DeleteResources { urns: Vec<String> },
    /// Delete every resource attached to any of the given datasources.
    DeleteDatasourceResources { datasource_urns: Vec<String> },
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::EnsureDatasource {
                datasource_urn,
                root_element_urn,
                miner_identifier,
                version,
            } => write!(
                f,
                "INSERT OR REPLACE INTO <{ds}> {{ \
                 <{ds}> a nie:DataSource ; nao:identifier \"{id}\" . \
                 <{root}> a nie:InformationElement ; nie:rootElementOf <{ds}> ; nie:version \"{version}\" }}",
                ds = datasource_urn,
                id = escape_literal(miner_identifier),
                root = root_element_urn,
                version = version,
            ),
            Update::InsertResource {
                graph,
                urn,
                identifier,
                classes,
            } => {
                write!(f, "INSERT OR REPLACE INTO <{}> {{ <{}> a ", graph, urn)?;
                if classes.is_empty() {
                    f.write_str(vocab::RDFS_RESOURCE)?;
                } else {
                    f.write_str(&classes.join(", "))?;
                }
                write!(f, " ; nao:identifier \"{}\" }}", escape_literal(identifier))
            }
            Update::SetDataSource {
                graph,
                resource,
                datasource_urn,
            } => write!(
                f,
                "INSERT OR REPLACE INTO <{}> {{ <{}> nie:dataSource <{}> }}",
                graph, resource, datasource_urn
            ),
            Update::InsertOrReplace {
                graph,
                resource,
                property,
                value,
            } => write!(
                f,
                "INSERT OR REPLACE INTO <{}> {{ <{}> {} {} }}",
                graph, resource, property, value
            ),
            Update::DeleteResources { urns } => {
                f.write_str("DELETE { ")?;
                for urn in urns {
                    write!(f, "<{}> a rdfs:Resource . ", urn)?;
                }
                f.write_str("}")
            }
            Update::DeleteDatasourceResources { datasource_urns } => {
                for (n, urn) in datasource_urns.iter().enumerate() {
                    if n > 0 {
                        f.write_str(" ")?;
                    }
                    write!(
                        f,
                        "DELETE {{ ?u a rdfs:Resource }} WHERE {{ ?u nie:dataSource <{}> }}",
                        urn
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Read statements issued by the miners.
///
/// Column layout of the returned rows is fixed per variant and documented
/// on each one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Every datasource owned by a miner.
    /// Columns: `0` datasource URN, `1` root element version (optional).
    Datasources { miner_identifier: String },
    /// Every resource attached to a datasource.
    /// Columns: `0` resource URN, `1` resource identifier.
    DatasourceResources { datasource_urn: String },
    /// The resource carrying `identifier` inside `graph`.
    /// Columns: `0` resource URN.
    ResourceByIdentifier { graph: String, identifier: String },
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Datasources { miner_identifier } => write!(
                f,
                "SELECT ?datasource nie:version(?root) WHERE {{ \
                 ?datasource a nie:DataSource . \
                 ?datasource nao:identifier \"{}\" . \
                 OPTIONAL {{ ?root nie:rootElementOf ?datasource }} }}",
                escape_literal(miner_identifier)
            ),
            Query::DatasourceResources { datasource_urn } => write!(
                f,
                "SELECT ?urn nao:identifier(?urn) WHERE {{ ?urn nie:dataSource <{}> }}",
                datasource_urn
            ),
            Query::ResourceByIdentifier { graph, identifier } => write!(
                f,
                "SELECT ?urn WHERE {{ GRAPH <{}> {{ ?urn nao:identifier \"{}\" }} }}",
                graph,
                escape_literal(identifier)
            ),
        }
    }
}

/// One result row; unbound columns are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexRow {
    values: Vec<Option<String>>,
}

impl IndexRow {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self { values }
    }

    /// Convenience constructor for rows with every column bound.
    pub fn bound<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(|v| Some(v.into())).collect(),
        }
    }

    pub fn get_string(&self, column: usize) -> Option<&str> {
        self.values.get(column).and_then(|v| v.as_deref())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Cursor over the rows of a query result.
#[derive(Debug, Default)]
pub struct IndexCursor {
    rows: std::vec::IntoIter<IndexRow>,
}

impl IndexCursor {
    pub fn new(rows: Vec<IndexRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for IndexCursor {
    type Item = IndexRow;

    fn next(&mut self) -> Option<IndexRow> {
        self.rows.next()
    }
}

/// Index connection trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::index::{IndexConnection, Query};
///
/// async fn count(index: &dyn IndexConnection, datasource: &str) -> Result<usize> {
///     let cursor = index
///         .query(&Query::DatasourceResources { datasource_urn: datasource.to_string() })
///         .await?;
///     Ok(cursor.count())
/// }
/// ```
#[async_trait]
pub trait IndexConnection: Send + Sync {
    /// Execute a write statement
    async fn update(&self, statement: &Update) -> Result<()>;

    /// Execute a read statement and return its rows
    async fn query(&self, statement: &Query) -> Result<IndexCursor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_literal() {
        assert_eq!(escape_literal("plain"), "plain");
        assert_eq!(escape_literal("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_literal("a\\b\nc"), "a\\\\b\\nc");
    }

    #[test]
    fn test_ensure_datasource_sparql() {
        let update = Update::EnsureDatasource {
            datasource_urn: "gd:goa-account:a1".to_string(),
            root_element_urn: "gd:goa-account:a1:root-element".to_string(),
            miner_identifier: "gd:media-server:miner:x".to_string(),
            version: 2,
        };

        let text = update.to_string();
        assert!(text.starts_with("INSERT OR REPLACE INTO <gd:goa-account:a1>"));
        assert!(text.contains("<gd:goa-account:a1> a nie:DataSource ; nao:identifier \"gd:media-server:miner:x\""));
        assert!(text.contains("nie:rootElementOf <gd:goa-account:a1> ; nie:version \"2\""));
    }

    #[test]
    fn test_delete_resources_sparql() {
        let update = Update::DeleteResources {
            urns: vec!["gd:x:1".to_string(), "gd:x:2".to_string()],
        };

        assert_eq!(
            update.to_string(),
            "DELETE { <gd:x:1> a rdfs:Resource . <gd:x:2> a rdfs:Resource . }"
        );
    }

    #[test]
    fn test_insert_resource_and_property_sparql() {
        let insert = Update::InsertResource {
            graph: "g".to_string(),
            urn: "gd:media-server:p1".to_string(),
            identifier: "media-server:p1".to_string(),
            classes: vec![
                vocab::NFO_REMOTE_DATA_OBJECT.to_string(),
                vocab::NMM_PHOTO.to_string(),
            ],
        };
        assert_eq!(
            insert.to_string(),
            "INSERT OR REPLACE INTO <g> { <gd:media-server:p1> a nfo:RemoteDataObject, nmm:Photo ; nao:identifier \"media-server:p1\" }"
        );

        let property = Update::InsertOrReplace {
            graph: "g".to_string(),
            resource: "r".to_string(),
            property: vocab::NIE_TITLE.to_string(),
            value: Term::literal("Holiday \"2024\""),
        };
        assert_eq!(
            property.to_string(),
            "INSERT OR REPLACE INTO <g> { <r> nie:title \"Holiday \\\"2024\\\"\" }"
        );
    }

    #[test]
    fn test_query_sparql() {
        let query = Query::DatasourceResources {
            datasource_urn: "gd:goa-account:a1".to_string(),
        };
        assert_eq!(
            query.to_string(),
            "SELECT ?urn nao:identifier(?urn) WHERE { ?urn nie:dataSource <gd:goa-account:a1> }"
        );
    }

    #[test]
    fn test_cursor_iterates_rows() {
        let cursor = IndexCursor::new(vec![
            IndexRow::bound(["urn:1", "id:1"]),
            IndexRow::new(vec![Some("urn:2".to_string()), None]),
        ]);

        let rows: Vec<IndexRow> = cursor.collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_string(1), Some("id:1"));
        assert_eq!(rows[1].get_string(1), None);
        assert_eq!(rows[1].get_string(7), None);
    }
}
