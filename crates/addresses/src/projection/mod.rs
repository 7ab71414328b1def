//! The address projection: four id-keyed maps folded from the event log.
//!
//! One handler per event family lives in its own module; this module owns
//! the maps, the dispatch and the timestamp policy.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use addrsync_core::{
    AccessAddressId, IntegrityError, PostCodeId, RoadId, UnitAddressId,
};
use addrsync_events::{Event, EventEnvelope, Projection};

use crate::entity::{AccessAddress, PostCode, Road, UnitAddress};
use crate::events::AddressEvent;

mod access_address;
mod post_code;
mod road;
mod unit_address;

/// Where a record's `created_at` / `updated_at` comes from.
///
/// Pick one per deployment; mixing the two changes what the timestamps mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampSource {
    /// The log's commit time for the event.
    #[default]
    CommitTime,
    /// The change date the registry put on the event. Events that carry none
    /// fall back to their commit time.
    ExternalAttribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectionOptions {
    pub timestamp_source: TimestampSource,
    /// Whether a `*Deleted` event also advances `updated_at`.
    pub touch_updated_at_on_delete: bool,
}

impl Default for ProjectionOptions {
    fn default() -> Self {
        Self {
            timestamp_source: TimestampSource::CommitTime,
            touch_updated_at_on_delete: true,
        }
    }
}

/// In-memory read model of the whole address registry.
///
/// Only the catch-up driver holds a mutable reference; exports read it between
/// catch-up ticks, so a sync always sees a causally closed state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressProjection {
    options: ProjectionOptions,
    applied_events: u64,
    post_codes: HashMap<PostCodeId, PostCode>,
    roads: HashMap<RoadId, Road>,
    access_addresses: HashMap<AccessAddressId, AccessAddress>,
    unit_addresses: HashMap<UnitAddressId, UnitAddress>,
}

impl AddressProjection {
    pub fn new(options: ProjectionOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> ProjectionOptions {
        self.options
    }

    /// Events folded so far. Observability only.
    pub fn applied_events(&self) -> u64 {
        self.applied_events
    }

    pub fn post_codes(&self) -> &HashMap<PostCodeId, PostCode> {
        &self.post_codes
    }

    pub fn roads(&self) -> &HashMap<RoadId, Road> {
        &self.roads
    }

    pub fn access_addresses(&self) -> &HashMap<AccessAddressId, AccessAddress> {
        &self.access_addresses
    }

    pub fn unit_addresses(&self) -> &HashMap<UnitAddressId, UnitAddress> {
        &self.unit_addresses
    }

    pub fn post_code(&self, id: &PostCodeId) -> Option<&PostCode> {
        self.post_codes.get(id)
    }

    pub fn road(&self, id: &RoadId) -> Option<&Road> {
        self.roads.get(id)
    }

    pub fn access_address(&self, id: &AccessAddressId) -> Option<&AccessAddress> {
        self.access_addresses.get(id)
    }

    pub fn unit_address(&self, id: &UnitAddressId) -> Option<&UnitAddress> {
        self.unit_addresses.get(id)
    }

    /// Number of records per map, in `(post codes, roads, access, unit)` order.
    pub fn sizes(&self) -> (usize, usize, usize, usize) {
        (
            self.post_codes.len(),
            self.roads.len(),
            self.access_addresses.len(),
            self.unit_addresses.len(),
        )
    }

    fn effective_time(&self, envelope: &EventEnvelope<AddressEvent>) -> DateTime<Utc> {
        match self.options.timestamp_source {
            TimestampSource::CommitTime => envelope.committed_at(),
            TimestampSource::ExternalAttribute => envelope
                .payload()
                .external_timestamp()
                .unwrap_or_else(|| envelope.committed_at()),
        }
    }

    /// `Some(at)` when a delete should advance `updated_at`.
    fn delete_time(&self, at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.options.touch_updated_at_on_delete.then_some(at)
    }
}

impl Projection for AddressProjection {
    type Ev = AddressEvent;
    type Error = IntegrityError;

    fn apply(&mut self, envelope: &EventEnvelope<AddressEvent>) -> Result<(), IntegrityError> {
        let at = self.effective_time(envelope);

        match envelope.payload() {
            AddressEvent::PostCode(event) => self.apply_post_code(event),
            AddressEvent::Road(event) => self.apply_road(event),
            AddressEvent::AccessAddress(event) => self.apply_access_address(event, at),
            AddressEvent::UnitAddress(event) => self.apply_unit_address(event, at),
        }?;

        self.applied_events += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
