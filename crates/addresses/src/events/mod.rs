//! The closed vocabulary of address registry events.
//!
//! The log stores each event as a type name plus a JSON payload. Every name
//! maps to exactly one payload struct, grouped into one enum per entity
//! family; [`AddressEvent::decode`] is the only way in. Both event-log
//! generations are covered: fine-grained `*Changed` events and the older
//! wholesale `*Updated` events.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;

use addrsync_core::{EntityKind, IntegrityError};
use addrsync_events::Event;

/// Declares a family enum over its payload structs and derives the name
/// table, `event_type()`, decoding, and `From` conversions from one list.
macro_rules! event_family {
    (
        $(#[$meta:meta])*
        $family:ident { $($variant:ident($payload:ident)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        pub enum $family {
            $($variant($payload),)+
        }

        impl $family {
            /// Every event type name in this family, as written in the log.
            pub const EVENT_TYPES: &'static [&'static str] = &[$(stringify!($payload)),+];

            pub fn event_type(&self) -> &'static str {
                match self {
                    $(Self::$variant(_) => stringify!($payload),)+
                }
            }

            /// `None` when the name belongs to another family.
            pub(crate) fn decode(
                event_type: &str,
                payload: &serde_json::Value,
            ) -> Option<Result<Self, serde_json::Error>> {
                $(
                    if event_type == stringify!($payload) {
                        return Some(
                            <$payload as serde::Deserialize>::deserialize(payload).map(Self::$variant),
                        );
                    }
                )+
                None
            }
        }

        $(
            impl From<$payload> for $family {
                fn from(event: $payload) -> Self {
                    Self::$variant(event)
                }
            }

            impl From<$payload> for $crate::events::AddressEvent {
                fn from(event: $payload) -> Self {
                    $family::$variant(event).into()
                }
            }
        )+
    };
}

mod access_address;
mod post_code;
mod road;
mod unit_address;

pub use access_address::*;
pub use post_code::*;
pub use road::*;
pub use unit_address::*;

#[derive(Debug, Error)]
pub enum DecodeError {
    /// The type name is not part of the vocabulary.
    #[error(transparent)]
    Unknown(#[from] IntegrityError),

    #[error("malformed {event_type} payload: {source}")]
    Malformed {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Any event the projection understands, tagged by target entity.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressEvent {
    PostCode(PostCodeEvent),
    Road(RoadEvent),
    AccessAddress(AccessAddressEvent),
    UnitAddress(UnitAddressEvent),
}

impl AddressEvent {
    /// Decode a log record into its event.
    ///
    /// An unknown type name is an integrity error, never skipped.
    pub fn decode(event_type: &str, payload: &JsonValue) -> Result<Self, DecodeError> {
        let decoded = PostCodeEvent::decode(event_type, payload)
            .map(|r| r.map(Self::PostCode))
            .or_else(|| RoadEvent::decode(event_type, payload).map(|r| r.map(Self::Road)))
            .or_else(|| {
                AccessAddressEvent::decode(event_type, payload).map(|r| r.map(Self::AccessAddress))
            })
            .or_else(|| {
                UnitAddressEvent::decode(event_type, payload).map(|r| r.map(Self::UnitAddress))
            });

        match decoded {
            Some(Ok(event)) => Ok(event),
            Some(Err(source)) => Err(DecodeError::Malformed {
                event_type: event_type.to_string(),
                source,
            }),
            None => Err(IntegrityError::unknown_event(event_type).into()),
        }
    }

    /// Entity family this event mutates.
    pub fn entity(&self) -> EntityKind {
        match self {
            AddressEvent::PostCode(_) => EntityKind::PostCode,
            AddressEvent::Road(_) => EntityKind::Road,
            AddressEvent::AccessAddress(_) => EntityKind::AccessAddress,
            AddressEvent::UnitAddress(_) => EntityKind::UnitAddress,
        }
    }

    /// All type names across every family.
    pub fn event_types() -> impl Iterator<Item = &'static str> {
        PostCodeEvent::EVENT_TYPES
            .iter()
            .chain(RoadEvent::EVENT_TYPES)
            .chain(AccessAddressEvent::EVENT_TYPES)
            .chain(UnitAddressEvent::EVENT_TYPES)
            .copied()
    }
}

impl Event for AddressEvent {
    fn event_type(&self) -> &'static str {
        match self {
            AddressEvent::PostCode(e) => e.event_type(),
            AddressEvent::Road(e) => e.event_type(),
            AddressEvent::AccessAddress(e) => e.event_type(),
            AddressEvent::UnitAddress(e) => e.event_type(),
        }
    }

    fn external_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            AddressEvent::PostCode(_) | AddressEvent::Road(_) => None,
            AddressEvent::AccessAddress(e) => e.external_timestamp(),
            AddressEvent::UnitAddress(e) => e.external_timestamp(),
        }
    }
}

macro_rules! impl_into_address_event {
    ($($family:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$family> for AddressEvent {
                fn from(event: $family) -> Self {
                    AddressEvent::$variant(event)
                }
            }
        )+
    };
}

impl_into_address_event!(
    PostCodeEvent => PostCode,
    RoadEvent => Road,
    AccessAddressEvent => AccessAddress,
    UnitAddressEvent => UnitAddress,
);
