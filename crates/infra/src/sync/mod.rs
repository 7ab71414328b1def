//! Bulk synchronizer: republishes the projection into the spatial store.

pub mod copy;
pub mod rows;
pub mod store;
pub mod synchronizer;
pub mod wkb;

#[cfg(test)]
pub(crate) mod testing;

pub use copy::{BinaryCopyWriter, EncodeError};
pub use rows::{AccessAddressRow, EncodeRow, UnitAddressRow};
pub use store::{PostgresSpatialStore, SpatialStore, TableTarget};
pub use synchronizer::{BulkSynchronizer, FamilyFailure, SyncError, SyncReport};
pub use wkb::{Point, SOURCE_SRID};
