//! Event sources: where the projection's events come from.
//!
//! A source owns the read position in the log and drives
//! [`AddressProjection::apply`](addrsync_events::Projection::apply) for every
//! event it delivers, strictly in commit order. The position lives in memory
//! only; a restarted process replays from the beginning.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use addrsync_addresses::{AddressEvent, AddressProjection, DecodeError};
use addrsync_core::IntegrityError;
use addrsync_events::{EventEnvelope, ProjectionError};

use crate::db::DatabaseError;

mod in_memory;
mod postgres;

pub use in_memory::{InMemoryEventLog, InMemoryEventSource};
pub use postgres::PostgresEventSource;

/// Errors raised while reading and applying the event log.
#[derive(Debug, Error)]
pub enum EventSourceError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("cannot decode event at position {position}: {source}")]
    Decode {
        position: u64,
        #[source]
        source: DecodeError,
    },

    #[error("invalid log position {0}")]
    InvalidPosition(i64),

    #[error(transparent)]
    Projection(#[from] ProjectionError<IntegrityError>),
}

impl EventSourceError {
    /// Whether the log itself is inconsistent, as opposed to an I/O failure.
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::Decode { source, .. } => matches!(source, DecodeError::Unknown(_)),
            Self::Projection(ProjectionError::Apply { .. }) => true,
            Self::Projection(ProjectionError::NonMonotonicPosition { .. }) => true,
            Self::Database(_) | Self::InvalidPosition(_) => false,
        }
    }
}

/// A raw record as the log stores it, before decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEvent {
    /// Log-wide commit order.
    pub seq_id: u64,
    pub event_id: Uuid,
    pub stream_id: Uuid,
    pub event_type: String,
    pub payload: JsonValue,
    pub committed_at: DateTime<Utc>,
}

impl StoredEvent {
    pub fn decode(&self) -> Result<EventEnvelope<AddressEvent>, EventSourceError> {
        let event = AddressEvent::decode(&self.event_type, &self.payload).map_err(|source| {
            EventSourceError::Decode {
                position: self.seq_id,
                source,
            }
        })?;

        Ok(EventEnvelope::new(
            self.event_id,
            self.stream_id,
            self.seq_id,
            self.event_type.clone(),
            self.committed_at,
            event,
        ))
    }
}

/// Delivers events from the log into the projection.
#[async_trait]
pub trait EventSource: Send {
    /// Apply the whole history, from the first event, to a fresh projection.
    ///
    /// Returns the number of events applied.
    async fn replay_all(
        &mut self,
        projection: &mut AddressProjection,
    ) -> Result<u64, EventSourceError>;

    /// Apply events committed since the last delivered one.
    ///
    /// Returns the number of events applied; `0` means nothing new.
    async fn catch_up(
        &mut self,
        projection: &mut AddressProjection,
    ) -> Result<u64, EventSourceError>;

    /// Position of the last applied event, if any.
    fn checkpoint(&self) -> Option<u64>;
}
