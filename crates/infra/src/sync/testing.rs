//! Test doubles for the sync pipeline: a COPY parser and a store that
//! records what it was sent.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Buf;
use chrono::{TimeZone, Utc};
use uuid::Uuid;

use addrsync_addresses::events::{AccessAddressCreated, PostCodeCreated, RoadCreated};
use addrsync_addresses::{AddressEvent, AddressProjection, AddressStatus};
use addrsync_core::{AccessAddressId, PostCodeId, RoadId};
use addrsync_events::{Event, EventEnvelope, Projection};

use super::copy::SIGNATURE;
use super::store::{ChunkStream, SpatialStore, TableTarget};
use super::synchronizer::SyncError;
use crate::db::DatabaseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Null,
    Value(Vec<u8>),
}

impl Field {
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Field::Null => None,
            Field::Value(v) => Some(v),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.value().and_then(|v| std::str::from_utf8(v).ok())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }
}

/// Parse a complete binary COPY stream. Panics on malformed input.
pub fn parse_copy(mut data: &[u8]) -> Vec<Vec<Field>> {
    assert_eq!(&data[..SIGNATURE.len()], SIGNATURE, "signature");
    data.advance(SIGNATURE.len());
    assert_eq!(data.get_i32(), 0, "flags");
    let extension = data.get_i32();
    data.advance(extension as usize);

    let mut rows = Vec::new();
    loop {
        let count = data.get_i16();
        if count == -1 {
            assert!(data.is_empty(), "bytes after trailer");
            return rows;
        }

        let mut fields = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let len = data.get_i32();
            if len < 0 {
                fields.push(Field::Null);
            } else {
                fields.push(Field::Value(data[..len as usize].to_vec()));
                data.advance(len as usize);
            }
        }
        rows.push(fields);
    }
}

pub fn access_target() -> TableTarget {
    TableTarget::new(
        "location.official_access_address_staging",
        "location.official_access_address",
    )
}

pub fn unit_target() -> TableTarget {
    TableTarget::new(
        "location.official_unit_address_staging",
        "location.official_unit_address",
    )
}

pub struct FixtureIds {
    pub post: PostCodeId,
    pub road: RoadId,
    pub access: AccessAddressId,
}

/// One post code, one road and one active access address at (1.0, 2.0).
pub fn fixture_events() -> (Vec<AddressEvent>, FixtureIds) {
    let ids = FixtureIds {
        post: PostCodeId::new(),
        road: RoadId::new(),
        access: AccessAddressId::new(),
    };

    let events = vec![
        addrsync_addresses::PostCodeEvent::from(PostCodeCreated {
            id: ids.post,
            code: "8000".into(),
            name: "Aarhus".into(),
        })
        .into(),
        addrsync_addresses::RoadEvent::from(RoadCreated {
            id: ids.road,
            external_id: "R-1".into(),
            name: "Main St".into(),
        })
        .into(),
        addrsync_addresses::AccessAddressEvent::from(AccessAddressCreated {
            id: ids.access,
            external_id: Some("AA-1".into()),
            municipal_code: "0751".into(),
            status: AddressStatus::Active,
            road_code: "0042".into(),
            house_number: "12".into(),
            east_coordinate: 1.0,
            north_coordinate: 2.0,
            town_name: None,
            plot_id: None,
            road_id: ids.road,
            post_code_id: ids.post,
            external_created_date: None,
            external_updated_date: None,
        })
        .into(),
    ];

    (events, ids)
}

pub fn fixture() -> (AddressProjection, FixtureIds) {
    let (events, ids) = fixture_events();
    let mut projection = AddressProjection::default();
    for (i, event) in events.into_iter().enumerate() {
        let position = i as u64 + 1;
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            Uuid::nil(),
            position,
            event.event_type(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, position as u32).unwrap(),
            event,
        );
        projection.apply(&envelope).unwrap();
    }
    (projection, ids)
}

#[derive(Debug, Default)]
struct Recorded {
    tables: HashMap<String, Vec<u8>>,
    refreshed: Vec<String>,
    imports: usize,
    fail_on: Option<String>,
}

/// [`SpatialStore`] that keeps the last committed COPY stream per table.
///
/// Clones share state, so a test can keep a handle after moving one into a
/// synchronizer.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    state: Arc<Mutex<Recorded>>,
}

impl RecordingStore {
    /// Fail the import into `target` after its first chunk.
    pub fn failing_on(self, target: &TableTarget) -> Self {
        self.fail_imports_into(target);
        self
    }

    /// Same as [`RecordingStore::failing_on`], for a store already handed
    /// to a synchronizer. Affects every clone.
    pub fn fail_imports_into(&self, target: &TableTarget) {
        self.state.lock().unwrap().fail_on = Some(target.staging_table.clone());
    }

    pub fn rows(&self, target: &TableTarget) -> Vec<Vec<Field>> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .get(&target.staging_table)
            .map(|bytes| parse_copy(bytes))
            .unwrap_or_default()
    }

    pub fn imports(&self) -> usize {
        self.state.lock().unwrap().imports
    }

    pub fn refreshes(&self) -> usize {
        self.state.lock().unwrap().refreshed.len()
    }

    pub fn refreshed(&self, target: &TableTarget) -> bool {
        self.state.lock().unwrap().refreshed.contains(&target.view)
    }
}

#[async_trait]
impl SpatialStore for RecordingStore {
    async fn import(
        &self,
        target: &TableTarget,
        _columns: &[&str],
        chunks: &mut ChunkStream<'_>,
    ) -> Result<u64, SyncError> {
        let fail = {
            let mut state = self.state.lock().unwrap();
            state.imports += 1;
            state.fail_on.as_deref() == Some(target.staging_table.as_str())
        };

        let mut stream = Vec::new();
        for chunk in chunks {
            stream.extend_from_slice(&chunk?);
            if fail {
                return Err(DatabaseError::new("copy_send", "connection reset by peer").into());
            }
        }

        let rows = parse_copy(&stream).len() as u64;
        self.state
            .lock()
            .unwrap()
            .tables
            .insert(target.staging_table.clone(), stream);
        Ok(rows)
    }

    async fn refresh_view(&self, target: &TableTarget) -> Result<(), SyncError> {
        self.state.lock().unwrap().refreshed.push(target.view.clone());
        Ok(())
    }
}
