//! Infrastructure for the address projector.
//!
//! Event sources that feed the projection, the bulk synchronizer that
//! republishes it into PostGIS, the catch-up driver tying the two together,
//! and settings loading.

pub mod config;
pub mod db;
pub mod driver;
pub mod event_source;
pub mod sync;

pub use config::{ConfigError, Settings};
pub use driver::{CatchUpDriver, DriverError, DriverHandle, DriverState, DriverSummary};
pub use event_source::{EventSource, EventSourceError, InMemoryEventLog, InMemoryEventSource, PostgresEventSource};
pub use sync::{BulkSynchronizer, PostgresSpatialStore, SpatialStore, SyncError, SyncReport, TableTarget};
