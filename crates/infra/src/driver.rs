//! The catch-up driver: rehydrate, publish, then poll and republish.
//!
//! ```text
//! Rehydrating ──► Syncing ──► Idle ──(events > 0)──► Syncing ──► Idle ...
//!                               │
//!                        shutdown signal
//!                               ▼
//!                          ShuttingDown
//! ```
//!
//! The driver is the projection's only writer, and it only writes between
//! syncs, so every sync reads a causally closed snapshot.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use addrsync_addresses::AddressProjection;

use crate::event_source::{EventSource, EventSourceError};
use crate::sync::{BulkSynchronizer, SpatialStore, SyncError, SyncReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Rehydrating,
    Idle,
    Syncing,
    ShuttingDown,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("rehydration failed: {0}")]
    Rehydrate(#[source] EventSourceError),

    #[error("catch-up failed: {0}")]
    CatchUp(#[source] EventSourceError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("driver task ended abnormally: {0}")]
    Task(String),
}

impl DriverError {
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::Rehydrate(e) | Self::CatchUp(e) => e.is_integrity(),
            Self::Sync(e) => e.is_integrity(),
            Self::Task(_) => false,
        }
    }
}

/// What a driver did before it stopped cleanly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverSummary {
    /// Events applied during rehydration.
    pub replayed: u64,
    /// Events applied by catch-up polls.
    pub caught_up: u64,
    pub syncs: u64,
    pub last_sync: Option<SyncReport>,
}

pub struct CatchUpDriver<E, S> {
    source: E,
    synchronizer: BulkSynchronizer<S>,
    projection: AddressProjection,
    poll_interval: Duration,
    state: watch::Sender<DriverState>,
}

impl<E, S> CatchUpDriver<E, S>
where
    E: EventSource + 'static,
    S: SpatialStore + 'static,
{
    /// `projection` should be empty; rehydration replays the whole log into it.
    pub fn new(
        source: E,
        synchronizer: BulkSynchronizer<S>,
        projection: AddressProjection,
        poll_interval: Duration,
    ) -> Self {
        let (state, _) = watch::channel(DriverState::Rehydrating);
        Self {
            source,
            synchronizer,
            projection,
            poll_interval,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<DriverState> {
        self.state.subscribe()
    }

    fn enter(&self, state: DriverState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "driver state");
        }
    }

    /// Run until `shutdown` turns `true` (or its sender is dropped) while idle,
    /// or until a fatal error.
    ///
    /// A sync that has started always finishes before the driver looks at the
    /// shutdown signal again.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<DriverSummary, DriverError> {
        let mut summary = DriverSummary::default();

        self.enter(DriverState::Rehydrating);
        summary.replayed = self
            .source
            .replay_all(&mut self.projection)
            .await
            .map_err(DriverError::Rehydrate)?;
        let (post_codes, roads, access_addresses, unit_addresses) = self.projection.sizes();
        info!(
            replayed = summary.replayed,
            checkpoint = ?self.source.checkpoint(),
            post_codes,
            roads,
            access_addresses,
            unit_addresses,
            "projection rehydrated"
        );

        self.sync(&mut summary).await?;

        loop {
            self.enter(DriverState::Idle);

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            let applied = match self.source.catch_up(&mut self.projection).await {
                Ok(applied) => applied,
                Err(err) if stopping(&shutdown) && !err.is_integrity() => {
                    warn!(error = %err, "catch-up failed during shutdown; stopping");
                    break;
                }
                Err(err) => return Err(DriverError::CatchUp(err)),
            };

            if applied == 0 {
                debug!(checkpoint = ?self.source.checkpoint(), "no new events");
                continue;
            }

            summary.caught_up += applied;
            info!(
                applied,
                applied_events = self.projection.applied_events(),
                checkpoint = ?self.source.checkpoint(),
                "caught up"
            );

            match self.sync(&mut summary).await {
                Ok(()) => {}
                Err(DriverError::Sync(err)) if stopping(&shutdown) && !err.is_integrity() => {
                    warn!(error = %err, "sync failed during shutdown; stopping");
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        self.enter(DriverState::ShuttingDown);
        info!(
            syncs = summary.syncs,
            applied_events = self.projection.applied_events(),
            "driver stopped"
        );
        Ok(summary)
    }

    async fn sync(&mut self, summary: &mut DriverSummary) -> Result<(), DriverError> {
        self.enter(DriverState::Syncing);

        let report = self.synchronizer.sync(&self.projection).await.map_err(|err| {
            error!(error = %err, integrity = err.is_integrity(), "sync failed");
            err
        })?;

        summary.syncs += 1;
        summary.last_sync = Some(report);
        info!(
            access_addresses = report.access_addresses,
            unit_addresses = report.unit_addresses,
            "sync complete"
        );
        Ok(())
    }

    /// Run on a tokio task, controlled through the returned handle.
    pub fn spawn(self) -> DriverHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let state = self.state();
        let join = tokio::spawn(self.run(shutdown_rx));
        DriverHandle {
            shutdown,
            state,
            join,
        }
    }
}

fn stopping(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Resolves once shutdown is requested or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

#[derive(Debug)]
pub struct DriverHandle {
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<DriverState>,
    join: JoinHandle<Result<DriverSummary, DriverError>>,
}

impl DriverHandle {
    /// Ask the driver to stop at its next idle point.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn state(&self) -> DriverState {
        *self.state.borrow()
    }

    /// Wait until the driver reaches `state`.
    ///
    /// Fails if the driver exits first, which makes
    /// `wait_for(DriverState::ShuttingDown)` resolve on any exit.
    pub async fn wait_for(&mut self, state: DriverState) -> Result<(), DriverError> {
        self.state
            .wait_for(|s| *s == state)
            .await
            .map(|_| ())
            .map_err(|_| DriverError::Task("driver exited before reaching state".into()))
    }

    pub async fn join(self) -> Result<DriverSummary, DriverError> {
        self.join
            .await
            .map_err(|e| DriverError::Task(e.to_string()))?
    }
}
