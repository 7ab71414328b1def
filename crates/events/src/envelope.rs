use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope for an event read from the log, containing stream metadata.
///
/// Notes:
/// - `global_position` is the log-wide commit order; projections must see
///   envelopes in strictly increasing position.
/// - `committed_at` is the time the log accepted the event. It is one of the two
///   candidate sources for a record's `updated_at`.
/// - `payload` is the decoded domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    stream_id: Uuid,

    /// Monotonically increasing position in the whole log.
    global_position: u64,

    event_type: String,
    committed_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        event_id: Uuid,
        stream_id: Uuid,
        global_position: u64,
        event_type: impl Into<String>,
        committed_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            stream_id,
            global_position,
            event_type: event_type.into(),
            committed_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn global_position(&self) -> u64 {
        self.global_position
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn committed_at(&self) -> DateTime<Utc> {
        self.committed_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
