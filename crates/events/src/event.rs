use chrono::{DateTime, Utc};

/// A domain event as stored in the append-only log.
///
/// Events are immutable facts. The log records them with a type name; the
/// payload type maps that name back to exactly one variant.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event type name as written in the log (e.g. "RoadCreated").
    fn event_type(&self) -> &'static str;

    /// Change time supplied by the upstream registry, when the event carries one.
    fn external_timestamp(&self) -> Option<DateTime<Utc>>;
}
