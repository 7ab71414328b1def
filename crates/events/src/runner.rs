//! Ordered replay of envelopes into a projection.
//!
//! The cursor remembers the last log position folded into a projection so an
//! event source can resume from it and so out-of-order delivery is caught
//! before it reaches the read model.

use thiserror::Error;

use crate::{EventEnvelope, Projection};

#[derive(Debug, Error)]
pub enum ProjectionError<E>
where
    E: std::error::Error + 'static,
{
    #[error("non-monotonic log position (last={last}, found={found})")]
    NonMonotonicPosition { last: u64, found: u64 },

    #[error("failed to apply {event_type} at position {position}: {source}")]
    Apply {
        position: u64,
        event_type: String,
        #[source]
        source: E,
    },
}

/// Tracks how far a projection has been folded.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ProjectionCursor {
    last_position: Option<u64>,
    applied: u64,
}

impl ProjectionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last position folded, `None` before the first event.
    pub fn last_position(&self) -> Option<u64> {
        self.last_position
    }

    /// Number of envelopes applied through this cursor.
    pub fn applied(&self) -> u64 {
        self.applied
    }

    /// Apply a single envelope, enforcing strictly increasing positions.
    ///
    /// The cursor only advances when the projection accepted the event.
    pub fn apply<P>(
        &mut self,
        projection: &mut P,
        envelope: &EventEnvelope<P::Ev>,
    ) -> Result<(), ProjectionError<P::Error>>
    where
        P: Projection,
    {
        let found = envelope.global_position();
        if let Some(last) = self.last_position {
            if found <= last {
                return Err(ProjectionError::NonMonotonicPosition { last, found });
            }
        }

        projection
            .apply(envelope)
            .map_err(|source| ProjectionError::Apply {
                position: found,
                event_type: envelope.event_type().to_string(),
                source,
            })?;

        self.last_position = Some(found);
        self.applied += 1;
        Ok(())
    }

    /// Apply many envelopes in order, returning how many were applied.
    pub fn run<'a, P>(
        &mut self,
        projection: &mut P,
        envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
    ) -> Result<u64, ProjectionError<P::Error>>
    where
        P: Projection,
        P::Ev: 'a,
    {
        let before = self.applied;
        for env in envelopes {
            self.apply(projection, env)?;
        }
        Ok(self.applied - before)
    }
}

/// Rebuild a projection from scratch by replaying the full event history.
///
/// The factory is used to create a fresh projection instance.
pub fn rebuild_from_scratch<'a, P>(
    factory: impl FnOnce() -> P,
    envelopes: impl IntoIterator<Item = &'a EventEnvelope<P::Ev>>,
) -> Result<(P, ProjectionCursor), ProjectionError<P::Error>>
where
    P: Projection,
    P::Ev: 'a,
{
    let mut projection = factory();
    let mut cursor = ProjectionCursor::new();
    cursor.run(&mut projection, envelopes)?;
    Ok((projection, cursor))
}
