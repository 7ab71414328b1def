use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use addrsync_addresses::{AddressEvent, AddressProjection};
use addrsync_events::{Event, ProjectionCursor};

use super::{EventSource, EventSourceError, StoredEvent};

/// Append-only in-memory event log.
///
/// Cloning yields another handle to the same log, so a test can keep
/// appending while a source reads from it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    inner: Arc<Mutex<Vec<StoredEvent>>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, Vec<StoredEvent>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a typed event payload, stored as its type name plus JSON.
    ///
    /// Returns the assigned position.
    pub fn append<P>(
        &self,
        stream_id: Uuid,
        payload: P,
        committed_at: DateTime<Utc>,
    ) -> Result<u64, serde_json::Error>
    where
        P: Serialize + Into<AddressEvent>,
    {
        let json = serde_json::to_value(&payload)?;
        let event: AddressEvent = payload.into();
        let event_type = event.event_type();
        Ok(self.append_raw(stream_id, event_type, json, committed_at))
    }

    /// Append a record exactly as given; nothing is validated until it is read.
    pub fn append_raw(
        &self,
        stream_id: Uuid,
        event_type: impl Into<String>,
        payload: serde_json::Value,
        committed_at: DateTime<Utc>,
    ) -> u64 {
        let mut records = self.records();
        let seq_id = records.len() as u64 + 1;
        records.push(StoredEvent {
            seq_id,
            event_id: Uuid::now_v7(),
            stream_id,
            event_type: event_type.into(),
            payload,
            committed_at,
        });
        seq_id
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Records with a position greater than `after`.
    fn read_after(&self, after: Option<u64>) -> Vec<StoredEvent> {
        let after = after.unwrap_or(0);
        self.records()
            .iter()
            .filter(|r| r.seq_id > after)
            .cloned()
            .collect()
    }
}

/// [`EventSource`] over an [`InMemoryEventLog`].
#[derive(Debug, Clone)]
pub struct InMemoryEventSource {
    log: InMemoryEventLog,
    cursor: ProjectionCursor,
}

impl InMemoryEventSource {
    pub fn new(log: InMemoryEventLog) -> Self {
        Self {
            log,
            cursor: ProjectionCursor::new(),
        }
    }

    fn deliver(&mut self, projection: &mut AddressProjection) -> Result<u64, EventSourceError> {
        let mut applied = 0;
        for record in self.log.read_after(self.cursor.last_position()) {
            let envelope = record.decode()?;
            self.cursor.apply(projection, &envelope)?;
            applied += 1;
        }
        Ok(applied)
    }
}

#[async_trait]
impl EventSource for InMemoryEventSource {
    async fn replay_all(
        &mut self,
        projection: &mut AddressProjection,
    ) -> Result<u64, EventSourceError> {
        self.cursor = ProjectionCursor::new();
        let applied = self.deliver(projection)?;
        debug!(applied, "replayed in-memory log");
        Ok(applied)
    }

    async fn catch_up(
        &mut self,
        projection: &mut AddressProjection,
    ) -> Result<u64, EventSourceError> {
        self.deliver(projection)
    }

    fn checkpoint(&self) -> Option<u64> {
        self.cursor.last_position()
    }
}
