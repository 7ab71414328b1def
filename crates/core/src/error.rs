//! Integrity error model.

use thiserror::Error;
use uuid::Uuid;

use crate::entity::EntityKind;

/// Result type used by the projection and the exporter.
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// A violation of the event log's referential or ordering guarantees.
///
/// Every variant is fatal: the process must stop rather than export a store
/// that no longer follows from the log. Each variant carries the entity family,
/// the offending id and (where one exists) the event type, so the log line is
/// enough to find the event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// A `*Created` event for an id that is already in its map.
    #[error("duplicate key: {entity} {id} already exists (event {event_type})")]
    DuplicateKey {
        entity: EntityKind,
        id: Uuid,
        event_type: &'static str,
    },

    /// A `*Changed`, `*Updated` or `*Deleted` event for an id that was never created.
    #[error("missing key: {entity} {id} does not exist (event {event_type})")]
    MissingKey {
        entity: EntityKind,
        id: Uuid,
        event_type: &'static str,
    },

    /// A record references an entity that is not in its map at export time.
    #[error("dangling reference: {from} {from_id} references missing {to} {to_id}")]
    DanglingReference {
        from: EntityKind,
        from_id: Uuid,
        to: EntityKind,
        to_id: Uuid,
    },

    /// The log contains an event type outside the known vocabulary.
    #[error("unknown event type '{event_type}'")]
    UnknownEvent { event_type: String },
}

impl IntegrityError {
    pub fn duplicate(entity: EntityKind, id: impl Into<Uuid>, event_type: &'static str) -> Self {
        Self::DuplicateKey {
            entity,
            id: id.into(),
            event_type,
        }
    }

    pub fn missing(entity: EntityKind, id: impl Into<Uuid>, event_type: &'static str) -> Self {
        Self::MissingKey {
            entity,
            id: id.into(),
            event_type,
        }
    }

    pub fn dangling(
        from: EntityKind,
        from_id: impl Into<Uuid>,
        to: EntityKind,
        to_id: impl Into<Uuid>,
    ) -> Self {
        Self::DanglingReference {
            from,
            from_id: from_id.into(),
            to,
            to_id: to_id.into(),
        }
    }

    pub fn unknown_event(event_type: impl Into<String>) -> Self {
        Self::UnknownEvent {
            event_type: event_type.into(),
        }
    }

    /// Entity family the error is about, if it names one.
    pub fn entity(&self) -> Option<EntityKind> {
        match self {
            Self::DuplicateKey { entity, .. } | Self::MissingKey { entity, .. } => Some(*entity),
            Self::DanglingReference { from, .. } => Some(*from),
            Self::UnknownEvent { .. } => None,
        }
    }
}
