//! The downstream spatial store: staging tables fed by binary COPY, and the
//! materialized views readers query.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{Span, info, instrument, warn};

use super::synchronizer::SyncError;
use crate::db::map_sqlx_error;

/// Chunks of one COPY stream, trailer last.
pub type ChunkStream<'a> = dyn Iterator<Item = Result<Bytes, SyncError>> + Send + 'a;

/// A staging table and the materialized view built over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableTarget {
    pub staging_table: String,
    pub view: String,
}

impl TableTarget {
    pub fn new(staging_table: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            staging_table: staging_table.into(),
            view: view.into(),
        }
    }

    pub fn truncate_statement(&self) -> String {
        format!("TRUNCATE TABLE {}", self.staging_table)
    }

    pub fn copy_statement(&self, columns: &[&str]) -> String {
        format!(
            "COPY {} ({}) FROM STDIN (FORMAT BINARY)",
            self.staging_table,
            columns.join(", ")
        )
    }

    /// Concurrent refresh keeps the previous contents readable until it
    /// completes. It requires a unique index on the view, and the view must
    /// already be populated (created `WITH DATA`); on a never-populated view
    /// the statement fails and the sync with it.
    pub fn refresh_statement(&self) -> String {
        format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {}", self.view)
    }
}

#[async_trait]
pub trait SpatialStore: Send + Sync {
    /// Replace the staging table's contents with the given COPY stream, in
    /// one transaction. Returns the number of rows loaded.
    ///
    /// An error from the stream aborts the COPY; the table keeps its previous
    /// contents.
    async fn import(
        &self,
        target: &TableTarget,
        columns: &[&str],
        chunks: &mut ChunkStream<'_>,
    ) -> Result<u64, SyncError>;

    /// Rebuild the view from its staging table without blocking readers.
    async fn refresh_view(&self, target: &TableTarget) -> Result<(), SyncError>;
}

/// PostGIS-backed [`SpatialStore`].
///
/// Each call checks out its own pooled connection, so the two address
/// families can export concurrently.
#[derive(Debug, Clone)]
pub struct PostgresSpatialStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PostgresSpatialStore {
    pub fn new(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    fn timeout_statement(&self) -> String {
        format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout.as_millis()
        )
    }
}

#[async_trait]
impl SpatialStore for PostgresSpatialStore {
    #[instrument(skip(self, columns, chunks), fields(table = %target.staging_table, rows), err)]
    async fn import(
        &self,
        target: &TableTarget,
        columns: &[&str],
        chunks: &mut ChunkStream<'_>,
    ) -> Result<u64, SyncError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_import", e))?;

        sqlx::query(&self.timeout_statement())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_statement_timeout", e))?;

        sqlx::query(&target.truncate_statement())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("truncate_staging", e))?;

        let mut copy = tx
            .copy_in_raw(&target.copy_statement(columns))
            .await
            .map_err(|e| map_sqlx_error("copy_in", e))?;

        for chunk in chunks {
            match chunk {
                Ok(bytes) => {
                    copy.send(bytes)
                        .await
                        .map_err(|e| map_sqlx_error("copy_send", e))?;
                }
                Err(err) => {
                    if let Err(abort) = copy.abort(err.to_string()).await {
                        warn!(error = %abort, "failed to abort COPY cleanly");
                    }
                    return Err(err);
                }
            }
        }

        let rows = copy
            .finish()
            .await
            .map_err(|e| map_sqlx_error("copy_finish", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_import", e))?;

        Span::current().record("rows", rows);
        info!(rows, "staging table loaded");
        Ok(rows)
    }

    #[instrument(skip(self), fields(view = %target.view), err)]
    async fn refresh_view(&self, target: &TableTarget) -> Result<(), SyncError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_refresh", e))?;

        sqlx::query(&self.timeout_statement())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("set_statement_timeout", e))?;

        sqlx::query(&target.refresh_statement())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("refresh_view", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_refresh", e))?;

        info!("materialized view refreshed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statements_name_the_configured_tables() {
        let target = TableTarget::new(
            "location.official_access_address_staging",
            "location.official_access_address",
        );

        assert_eq!(
            target.truncate_statement(),
            "TRUNCATE TABLE location.official_access_address_staging"
        );
        assert_eq!(
            target.copy_statement(&["id", "coord", "deleted"]),
            "COPY location.official_access_address_staging (id, coord, deleted) FROM STDIN (FORMAT BINARY)"
        );
        assert_eq!(
            target.refresh_statement(),
            "REFRESH MATERIALIZED VIEW CONCURRENTLY location.official_access_address"
        );
    }
}
