//! Semantic Index using SQLite
//!
//! A small triple store that understands the typed statements in
//! [`bridge_traits::index`]. Each statement runs in its own transaction.
//!
//! Predicates are single-valued (insert-or-replace drops the previous
//! object) except `rdf:type`, which accumulates classes. Deleting a
//! resource removes every triple whose subject is that resource.

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    index::{vocab, IndexConnection, IndexCursor, IndexRow, Query, Term, Update},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
    Row, SqliteConnection,
};
use std::path::Path;
use tracing::{debug, trace};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS triples (
        graph TEXT NOT NULL,
        subject TEXT NOT NULL,
        predicate TEXT NOT NULL,
        object TEXT NOT NULL,
        object_is_iri INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (subject, predicate, object)
    );
    CREATE INDEX IF NOT EXISTS idx_triples_predicate_object ON triples (predicate, object);
    CREATE INDEX IF NOT EXISTS idx_triples_graph ON triples (graph);
"#;

/// SQLite-backed index implementation
pub struct SqliteIndex {
    pool: SqlitePool,
}

impl SqliteIndex {
    /// Open (or create) the index database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(BridgeError::Io)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| BridgeError::IndexError(format!("Failed to open index: {}", e)))?;

        let index = Self { pool };
        index.create_schema().await?;

        debug!(path = ?db_path, "Opened index database");
        Ok(index)
    }

    /// Create an in-memory index (for testing)
    ///
    /// Each SQLite in-memory connection is a separate database, so the pool
    /// is pinned to a single connection that never expires.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::IndexError(format!("Failed to open index: {}", e)))?;

        let index = Self { pool };
        index.create_schema().await?;
        Ok(index)
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::IndexError(format!("Failed to create schema: {}", e)))?;
        Ok(())
    }

    /// Whether any triple has `urn` as its subject
    pub async fn contains(&self, urn: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM triples WHERE subject = ? LIMIT 1")
            .bind(urn)
            .fetch_optional(&self.pool)
            .await
            .map_err(read_error)?;
        Ok(row.is_some())
    }

    /// Objects of `subject predicate ?o`, sorted
    pub async fn values(&self, subject: &str, predicate: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT object FROM triples WHERE subject = ? AND predicate = ? ORDER BY object",
        )
        .bind(subject)
        .bind(predicate)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(read_error))
            .collect()
    }

    /// Total number of stored triples
    pub async fn triple_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM triples")
            .fetch_one(&self.pool)
            .await
            .map_err(read_error)?;
        row.try_get::<i64, _>(0).map_err(read_error)
    }

    async fn apply(&self, statement: &Update) -> std::result::Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        match statement {
            Update::EnsureDatasource {
                datasource_urn,
                root_element_urn,
                miner_identifier,
                version,
            } => {
                let graph = datasource_urn.as_str();
                add_type(&mut tx, graph, datasource_urn, vocab::NIE_DATA_SOURCE_CLASS).await?;
                replace(
                    &mut tx,
                    graph,
                    datasource_urn,
                    vocab::NAO_IDENTIFIER,
                    &Term::literal(miner_identifier.as_str()),
                )
                .await?;
                add_type(&mut tx, graph, root_element_urn, vocab::NIE_INFORMATION_ELEMENT).await?;
                replace(
                    &mut tx,
                    graph,
                    root_element_urn,
                    vocab::NIE_ROOT_ELEMENT_OF,
                    &Term::iri(datasource_urn.as_str()),
                )
                .await?;
                replace(
                    &mut tx,
                    graph,
                    root_element_urn,
                    vocab::NIE_VERSION,
                    &Term::literal(version.to_string()),
                )
                .await?;
            }
            Update::InsertResource {
                graph,
                urn,
                identifier,
                classes,
            } => {
                if classes.is_empty() {
                    add_type(&mut tx, graph, urn, vocab::RDFS_RESOURCE).await?;
                }
                for class in classes {
                    add_type(&mut tx, graph, urn, class).await?;
                }
                replace(
                    &mut tx,
                    graph,
                    urn,
                    vocab::NAO_IDENTIFIER,
                    &Term::literal(identifier.as_str()),
                )
                .await?;
            }
            Update::SetDataSource {
                graph,
                resource,
                datasource_urn,
            } => {
                replace(
                    &mut tx,
                    graph,
                    resource,
                    vocab::NIE_DATA_SOURCE,
                    &Term::iri(datasource_urn.as_str()),
                )
                .await?;
            }
            Update::InsertOrReplace {
                graph,
                resource,
                property,
                value,
            } => {
                replace(&mut tx, graph, resource, property, value).await?;
            }
            Update::DeleteResources { urns } => {
                for urn in urns {
                    sqlx::query("DELETE FROM triples WHERE subject = ?")
                        .bind(urn)
                        .execute(&mut *tx)
                        .await?;
                }
            }
            Update::DeleteDatasourceResources { datasource_urns } => {
                for datasource in datasource_urns {
                    sqlx::query(
                        r#"
                        DELETE FROM triples WHERE subject IN (
                            SELECT subject FROM triples WHERE predicate = ? AND object = ?
                        )
                        "#,
                    )
                    .bind(vocab::NIE_DATA_SOURCE)
                    .bind(datasource)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await
    }

    async fn select(&self, statement: &Query) -> std::result::Result<Vec<IndexRow>, sqlx::Error> {
        let rows = match statement {
            Query::Datasources { miner_identifier } => {
                sqlx::query(
                    r#"
                    SELECT ds.subject, version.object
                    FROM triples ds
                    JOIN triples kind
                        ON kind.subject = ds.subject AND kind.predicate = ? AND kind.object = ?
                    LEFT JOIN triples root
                        ON root.predicate = ? AND root.object = ds.subject
                    LEFT JOIN triples version
                        ON version.subject = root.subject AND version.predicate = ?
                    WHERE ds.predicate = ? AND ds.object = ?
                    ORDER BY ds.subject
                    "#,
                )
                .bind(vocab::RDF_TYPE)
                .bind(vocab::NIE_DATA_SOURCE_CLASS)
                .bind(vocab::NIE_ROOT_ELEMENT_OF)
                .bind(vocab::NIE_VERSION)
                .bind(vocab::NAO_IDENTIFIER)
                .bind(miner_identifier)
                .fetch_all(&self.pool)
                .await?
            }
            Query::DatasourceResources { datasource_urn } => {
                sqlx::query(
                    r#"
                    SELECT res.subject, ident.object
                    FROM triples res
                    LEFT JOIN triples ident
                        ON ident.subject = res.subject AND ident.predicate = ?
                    WHERE res.predicate = ? AND res.object = ?
                    ORDER BY res.subject
                    "#,
                )
                .bind(vocab::NAO_IDENTIFIER)
                .bind(vocab::NIE_DATA_SOURCE)
                .bind(datasource_urn)
                .fetch_all(&self.pool)
                .await?
            }
            Query::ResourceByIdentifier { graph, identifier } => {
                sqlx::query(
                    "SELECT subject FROM triples WHERE graph = ? AND predicate = ? AND object = ?",
                )
                .bind(graph)
                .bind(vocab::NAO_IDENTIFIER)
                .bind(identifier)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|column| row.try_get::<Option<String>, _>(column))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map(IndexRow::new)
            })
            .collect()
    }
}

#[async_trait]
impl IndexConnection for SqliteIndex {
    async fn update(&self, statement: &Update) -> Result<()> {
        trace!(statement = %statement, "Index update");
        self.apply(statement)
            .await
            .map_err(|e| BridgeError::IndexError(format!("Update failed: {}", e)))
    }

    async fn query(&self, statement: &Query) -> Result<IndexCursor> {
        trace!(statement = %statement, "Index query");
        let rows = self.select(statement).await.map_err(read_error)?;
        Ok(IndexCursor::new(rows))
    }
}

fn read_error(e: sqlx::Error) -> BridgeError {
    BridgeError::IndexError(format!("Query failed: {}", e))
}

async fn add_type(
    conn: &mut SqliteConnection,
    graph: &str,
    subject: &str,
    class: &str,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO triples (graph, subject, predicate, object, object_is_iri)
        VALUES (?, ?, ?, ?, 1)
        "#,
    )
    .bind(graph)
    .bind(subject)
    .bind(vocab::RDF_TYPE)
    .bind(class)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn replace(
    conn: &mut SqliteConnection,
    graph: &str,
    subject: &str,
    predicate: &str,
    value: &Term,
) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM triples WHERE subject = ? AND predicate = ?")
        .bind(subject)
        .bind(predicate)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO triples (graph, subject, predicate, object, object_is_iri)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(graph)
    .bind(subject)
    .bind(predicate)
    .bind(value.value())
    .bind(matches!(value, Term::Iri(_)))
    .execute(&mut *conn)
    .await?;
    Ok(())
}
