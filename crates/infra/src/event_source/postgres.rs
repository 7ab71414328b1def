//! Event source reading a Postgres event table (`seq_id`, `id`, `stream_id`,
//! `type`, `data`, `timestamp`), paging forward by `seq_id`.

use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{FromRow, PgPool};
use tracing::{Span, debug, instrument};
use uuid::Uuid;

use addrsync_addresses::AddressProjection;
use addrsync_events::ProjectionCursor;

use super::{EventSource, EventSourceError, StoredEvent};
use crate::db::map_sqlx_error;

#[derive(Debug, FromRow)]
struct EventRow {
    seq_id: i64,
    id: Uuid,
    stream_id: Uuid,
    #[sqlx(rename = "type")]
    event_type: String,
    data: JsonValue,
    timestamp: DateTime<Utc>,
}

impl TryFrom<EventRow> for StoredEvent {
    type Error = EventSourceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let seq_id =
            u64::try_from(row.seq_id).map_err(|_| EventSourceError::InvalidPosition(row.seq_id))?;
        Ok(StoredEvent {
            seq_id,
            event_id: row.id,
            stream_id: row.stream_id,
            event_type: canonical_event_type(&row.event_type).into_owned(),
            payload: row.data,
            committed_at: row.timestamp,
        })
    }
}

/// Event type names may be stored as snake_case aliases
/// (`access_address_created`); the vocabulary uses the PascalCase form.
fn canonical_event_type(stored: &str) -> Cow<'_, str> {
    if !stored.contains('_') && stored.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Cow::Borrowed(stored);
    }

    let mut name = String::with_capacity(stored.len());
    for word in stored.split('_').filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.push_str(chars.as_str());
        }
    }
    Cow::Owned(name)
}

/// Reads the event table in `seq_id` order, `batch_size` rows per query.
///
/// The checkpoint is only the in-memory cursor: nothing is persisted, and a
/// new process starts with a full replay.
#[derive(Debug, Clone)]
pub struct PostgresEventSource {
    pool: PgPool,
    select_sql: String,
    batch_size: u32,
    cursor: ProjectionCursor,
}

impl PostgresEventSource {
    /// `event_table` must be a validated identifier (see
    /// [`Settings::validate`](crate::config::Settings::validate)); it is
    /// interpolated into the query text.
    pub fn new(pool: PgPool, event_table: &str, batch_size: u32) -> Self {
        let select_sql = format!(
            r#"
            SELECT seq_id, id, stream_id, type, data, timestamp
            FROM {event_table}
            WHERE seq_id > $1
            ORDER BY seq_id ASC
            LIMIT $2
            "#
        );

        Self {
            pool,
            select_sql,
            batch_size: batch_size.max(1),
            cursor: ProjectionCursor::new(),
        }
    }

    async fn fetch_page(&self, after: u64) -> Result<Vec<StoredEvent>, EventSourceError> {
        let after = i64::try_from(after).map_err(|_| EventSourceError::InvalidPosition(i64::MAX))?;
        let rows: Vec<EventRow> = sqlx::query_as(&self.select_sql)
            .bind(after)
            .bind(i64::from(self.batch_size))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_events", e))?;

        rows.into_iter().map(StoredEvent::try_from).collect()
    }

    /// Page forward from the cursor until a short page, applying as we go.
    async fn drain(&mut self, projection: &mut AddressProjection) -> Result<u64, EventSourceError> {
        let mut applied = 0u64;
        loop {
            let page = self.fetch_page(self.cursor.last_position().unwrap_or(0)).await?;
            let page_len = page.len();

            for record in &page {
                let envelope = record.decode()?;
                self.cursor.apply(projection, &envelope)?;
            }
            applied += page_len as u64;

            debug!(
                page = page_len,
                checkpoint = ?self.cursor.last_position(),
                "applied event page"
            );

            if page_len < self.batch_size as usize {
                return Ok(applied);
            }
        }
    }
}

#[async_trait]
impl EventSource for PostgresEventSource {
    #[instrument(skip_all, fields(applied), err)]
    async fn replay_all(
        &mut self,
        projection: &mut AddressProjection,
    ) -> Result<u64, EventSourceError> {
        self.cursor = ProjectionCursor::new();
        let applied = self.drain(projection).await?;
        Span::current().record("applied", applied);
        Ok(applied)
    }

    #[instrument(skip_all, fields(after = ?self.cursor.last_position(), applied), err)]
    async fn catch_up(
        &mut self,
        projection: &mut AddressProjection,
    ) -> Result<u64, EventSourceError> {
        let applied = self.drain(projection).await?;
        Span::current().record("applied", applied);
        Ok(applied)
    }

    fn checkpoint(&self) -> Option<u64> {
        self.cursor.last_position()
    }
}
