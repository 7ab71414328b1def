//! Address registry domain (event-sourced).
//!
//! Entity records, the closed vocabulary of registry events, and the
//! projection that folds them into four id-keyed maps. Pure, deterministic
//! logic only: no IO, no async, no storage.

pub mod entity;
pub mod events;
pub mod projection;

pub use entity::{AccessAddress, AddressStatus, PostCode, Road, UnitAddress};
pub use events::{
    AccessAddressEvent, AddressEvent, DecodeError, PostCodeEvent, RoadEvent, UnitAddressEvent,
};
pub use projection::{AddressProjection, ProjectionOptions, TimestampSource};
