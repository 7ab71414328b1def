//! `addrsync-core` — identifiers and the integrity error model shared by every
//! other crate in the workspace.
//!
//! This crate is pure: no I/O, no async, no logging.

pub mod entity;
pub mod error;
pub mod id;

pub use entity::EntityKind;
pub use error::{IntegrityError, IntegrityResult};
pub use id::{AccessAddressId, InvalidId, PostCodeId, RoadId, UnitAddressId};
