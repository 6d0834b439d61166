//! Index access shared by the job, the sweep and shared-content insertion.
//!
//! Read failures surface as `QueryFailure`, write failures as
//! `UpdateFailure`.

use std::collections::HashMap;

use bridge_traits::index::{vocab, IndexConnection, Query, Term, Update};
use tracing::trace;

use crate::error::{MinerError, Result};
use crate::resource::ResourceRecord;
use crate::urn;

/// Inserts-or-replaces the datasource and its versioned root element.
pub async fn ensure_datasource(
    index: &dyn IndexConnection,
    datasource_urn: &str,
    miner_identifier: &str,
    version: i32,
) -> Result<()> {
    index
        .update(&Update::EnsureDatasource {
            datasource_urn: datasource_urn.to_string(),
            root_element_urn: urn::root_element_urn(datasource_urn),
            miner_identifier: miner_identifier.to_string(),
            version,
        })
        .await
        .map_err(MinerError::update_failure)
}

/// Resources currently attached to `datasource_urn`, keyed by identifier.
///
/// Resources without an identifier are keyed by their URN so a refresh
/// never revisits them and they end up deleted.
pub async fn previous_resources(
    index: &dyn IndexConnection,
    datasource_urn: &str,
) -> Result<HashMap<String, String>> {
    let cursor = index
        .query(&Query::DatasourceResources {
            datasource_urn: datasource_urn.to_string(),
        })
        .await
        .map_err(MinerError::query_failure)?;

    let mut previous = HashMap::new();
    for row in cursor {
        let Some(urn) = row.get_string(0) else {
            continue;
        };
        let key = row.get_string(1).unwrap_or(urn);
        previous.insert(key.to_string(), urn.to_string());
    }
    Ok(previous)
}

/// Outcome of writing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upserted {
    /// URN the record is stored under.
    pub urn: String,
    pub created: bool,
}

/// Writes `record` into the datasource graph of `account_id`.
///
/// The resource is looked up by identifier inside that graph first and only
/// inserted, under a URN scoped to the account, when absent; its datasource
/// link and every property are then replaced.
pub async fn upsert_resource(
    index: &dyn IndexConnection,
    account_id: &str,
    datasource_urn: &str,
    record: &ResourceRecord,
) -> Result<Upserted> {
    let existing = index
        .query(&Query::ResourceByIdentifier {
            graph: datasource_urn.to_string(),
            identifier: record.identifier.clone(),
        })
        .await
        .map_err(MinerError::query_failure)?
        .find_map(|row| row.get_string(0).map(str::to_string));

    let upserted = match existing {
        Some(urn) => Upserted {
            urn,
            created: false,
        },
        None => {
            let urn = record.urn(account_id);
            index
                .update(&Update::InsertResource {
                    graph: datasource_urn.to_string(),
                    urn: urn.clone(),
                    identifier: record.identifier.clone(),
                    classes: record.classes.clone(),
                })
                .await
                .map_err(MinerError::update_failure)?;
            Upserted { urn, created: true }
        }
    };

    index
        .update(&Update::SetDataSource {
            graph: datasource_urn.to_string(),
            resource: upserted.urn.clone(),
            datasource_urn: datasource_urn.to_string(),
        })
        .await
        .map_err(MinerError::update_failure)?;

    for (property, value) in &record.properties {
        set_property(index, datasource_urn, &upserted.urn, property, value.clone()).await?;
    }

    trace!(urn = %upserted.urn, created = upserted.created, "Resource written");
    Ok(upserted)
}

pub async fn set_property(
    index: &dyn IndexConnection,
    graph: &str,
    resource: &str,
    property: &str,
    value: Term,
) -> Result<()> {
    index
        .update(&Update::InsertOrReplace {
            graph: graph.to_string(),
            resource: resource.to_string(),
            property: property.to_string(),
            value,
        })
        .await
        .map_err(MinerError::update_failure)
}

/// Links `resource` to the item it was shared from.
pub async fn link_related(
    index: &dyn IndexConnection,
    graph: &str,
    resource: &str,
    source_urn: &str,
) -> Result<()> {
    set_property(
        index,
        graph,
        resource,
        vocab::NIE_RELATED_TO,
        Term::iri(source_urn),
    )
    .await
}

/// Deletes `urns` in a single statement; a no-op when empty.
pub async fn delete_resources(index: &dyn IndexConnection, urns: Vec<String>) -> Result<()> {
    if urns.is_empty() {
        return Ok(());
    }
    index
        .update(&Update::DeleteResources { urns })
        .await
        .map_err(MinerError::update_failure)
}
