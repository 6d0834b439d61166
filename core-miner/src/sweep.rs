//! # Stale Datasource Sweep
//!
//! Removes everything indexed for datasources that no longer belong to a
//! configured account, or that were written by an older engine version.
//!
//! A datasource is stale when
//! - its URN matches no configured account of the engine's provider type, or
//! - its root element version is lower than the engine's current version.
//!
//! A missing or unparseable version counts as `1`. All stale datasources are
//! removed with a single delete statement.

use std::collections::BTreeSet;
use std::sync::Arc;

use bridge_traits::index::{IndexConnection, Query, Update};
use tracing::{debug, info, warn};

use crate::error::{MinerError, Result};

/// Version assumed for datasources whose root element carries none.
pub const DEFAULT_DATASOURCE_VERSION: i32 = 1;

/// One sweep pass for one engine.
#[derive(Clone)]
pub struct StaleDatasourceSweep {
    index: Arc<dyn IndexConnection>,
    miner_identifier: String,
    version: i32,
    configured: BTreeSet<String>,
}

impl StaleDatasourceSweep {
    /// `configured` holds the datasource URNs of every configured account
    /// of the engine's provider type.
    pub fn new(
        index: Arc<dyn IndexConnection>,
        miner_identifier: impl Into<String>,
        version: i32,
        configured: BTreeSet<String>,
    ) -> Self {
        Self {
            index,
            miner_identifier: miner_identifier.into(),
            version,
            configured,
        }
    }

    /// Runs the sweep and returns the removed datasource URNs.
    pub async fn run(self) -> Result<Vec<String>> {
        let cursor = self
            .index
            .query(&Query::Datasources {
                miner_identifier: self.miner_identifier.clone(),
            })
            .await
            .map_err(MinerError::query_failure)?;

        let mut stale = BTreeSet::new();
        for row in cursor {
            let Some(datasource) = row.get_string(0) else {
                continue;
            };
            let version = parse_version(datasource, row.get_string(1));

            if !self.configured.contains(datasource) {
                debug!(datasource, "Datasource has no configured account");
                stale.insert(datasource.to_string());
            } else if version < self.version {
                debug!(
                    datasource,
                    version,
                    current = self.version,
                    "Datasource written by an older engine version"
                );
                stale.insert(datasource.to_string());
            }
        }

        if stale.is_empty() {
            return Ok(Vec::new());
        }

        let datasource_urns: Vec<String> = stale.into_iter().collect();
        self.index
            .update(&Update::DeleteDatasourceResources {
                datasource_urns: datasource_urns.clone(),
            })
            .await
            .map_err(MinerError::update_failure)?;

        info!(
            miner = %self.miner_identifier,
            removed = datasource_urns.len(),
            "Removed stale datasources"
        );
        Ok(datasource_urns)
    }
}

fn parse_version(datasource: &str, raw: Option<&str>) -> i32 {
    match raw {
        None => DEFAULT_DATASOURCE_VERSION,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(datasource, version = raw, "Unparseable datasource version");
            DEFAULT_DATASOURCE_VERSION
        }),
    }
}

impl std::fmt::Debug for StaleDatasourceSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaleDatasourceSweep")
            .field("miner_identifier", &self.miner_identifier)
            .field("version", &self.version)
            .field("configured", &self.configured)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mocks::MockIndex;
    use bridge_traits::index::{IndexCursor, IndexRow};
    use bridge_traits::BridgeError;

    fn configured(urns: &[&str]) -> BTreeSet<String> {
        urns.iter().map(|u| u.to_string()).collect()
    }

    #[tokio::test]
    async fn test_orphans_and_old_versions_removed_together() {
        let mut index = MockIndex::new();
        index.expect_query().times(1).returning(|_| {
            Ok(IndexCursor::new(vec![
                IndexRow::bound(["gd:goa-account:current", "3"]),
                IndexRow::bound(["gd:goa-account:old", "2"]),
                IndexRow::new(vec![Some("gd:goa-account:gone".to_string()), None]),
                // Joined twice when a datasource has two root elements.
                IndexRow::bound(["gd:goa-account:gone", "3"]),
            ]))
        });
        index
            .expect_update()
            .withf(|statement| {
                *statement
                    == Update::DeleteDatasourceResources {
                        datasource_urns: vec![
                            "gd:goa-account:gone".to_string(),
                            "gd:goa-account:old".to_string(),
                        ],
                    }
            })
            .times(1)
            .returning(|_| Ok(()));

        let sweep = StaleDatasourceSweep::new(
            Arc::new(index),
            "gd:google:miner",
            3,
            configured(&["gd:goa-account:current", "gd:goa-account:old"]),
        );

        let removed = sweep.run().await.unwrap();
        assert_eq!(removed, vec!["gd:goa-account:gone", "gd:goa-account:old"]);
    }

    #[tokio::test]
    async fn test_missing_and_garbled_versions_count_as_one() {
        let mut index = MockIndex::new();
        index.expect_query().returning(|_| {
            Ok(IndexCursor::new(vec![
                IndexRow::new(vec![Some("gd:goa-account:a".to_string()), None]),
                IndexRow::bound(["gd:goa-account:b", "not-a-number"]),
            ]))
        });

        // Engine version 1: both are current.
        let sweep = StaleDatasourceSweep::new(
            Arc::new(index),
            "gd:media-server:miner",
            1,
            configured(&["gd:goa-account:a", "gd:goa-account:b"]),
        );
        assert!(sweep.run().await.unwrap().is_empty());

        assert_eq!(parse_version("ds", Some("x")), 1);
        assert_eq!(parse_version("ds", Some(" 4 ")), 4);
        assert_eq!(parse_version("ds", None), 1);
    }

    #[tokio::test]
    async fn test_nothing_stale_issues_no_delete() {
        let mut index = MockIndex::new();
        index.expect_query().returning(|_| Ok(IndexCursor::empty()));

        let sweep =
            StaleDatasourceSweep::new(Arc::new(index), "gd:media-server:miner", 1, BTreeSet::new());
        assert!(sweep.run().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_classified() {
        let mut index = MockIndex::new();
        index
            .expect_query()
            .returning(|_| Err(BridgeError::IndexError("locked".to_string())));
        let sweep =
            StaleDatasourceSweep::new(Arc::new(index), "gd:media-server:miner", 1, BTreeSet::new());
        assert!(matches!(
            sweep.run().await,
            Err(MinerError::QueryFailure(_))
        ));

        let mut index = MockIndex::new();
        index
            .expect_query()
            .returning(|_| Ok(IndexCursor::new(vec![IndexRow::bound(["gd:goa-account:x", "1"])])));
        index
            .expect_update()
            .returning(|_| Err(BridgeError::IndexError("locked".to_string())));
        let sweep =
            StaleDatasourceSweep::new(Arc::new(index), "gd:media-server:miner", 1, BTreeSet::new());
        assert!(matches!(
            sweep.run().await,
            Err(MinerError::UpdateFailure(_))
        ));
    }
}
