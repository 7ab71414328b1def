//! Event plumbing shared by the domain and the infrastructure layer.
//!
//! Nothing here knows about addresses: this crate defines what an event, an
//! envelope and a projection are, and how envelopes are folded in log order.

pub mod envelope;
pub mod event;
pub mod projection;
pub mod runner;

pub use envelope::EventEnvelope;
pub use event::Event;
pub use projection::Projection;
pub use runner::{ProjectionCursor, ProjectionError, rebuild_from_scratch};
