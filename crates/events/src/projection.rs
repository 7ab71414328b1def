use crate::{Event, EventEnvelope};

/// A projection builds a read model by folding an ordered event stream.
///
/// ## Determinism
///
/// Replaying the same ordered sequence into a fresh instance must always give
/// the same state. Re-applying a single event twice is *not* required to be
/// safe: the log is delivered exactly once and in commit order, and a second
/// `*Created` for the same id is an integrity violation.
///
/// ## Errors
///
/// `apply` returns an error instead of skipping events it cannot fold. The
/// caller stops at the first error; nothing is ignored silently.
///
/// ## Disposability
///
/// The read model holds no state that cannot be rebuilt from the log, so a
/// crashed process recovers by replaying from position zero.
pub trait Projection {
    type Ev: Event;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Apply a single event to the projection, updating the read model.
    fn apply(&mut self, envelope: &EventEnvelope<Self::Ev>) -> Result<(), Self::Error>;
}
