use std::fmt;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, instrument};

use addrsync_addresses::AddressProjection;
use addrsync_core::{EntityKind, IntegrityError};

use super::copy::EncodeError;
use super::rows::{
    AccessAddressRow, DEFAULT_CHUNK_SIZE, EncodeRow, UnitAddressRow, access_address_chunks,
    unit_address_chunks,
};
use super::store::{ChunkStream, SpatialStore, TableTarget};
use crate::db::DatabaseError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// One or both families did not publish; the others may have.
    #[error("sync failed: {}", display_failures(.0))]
    Failed(Vec<FamilyFailure>),
}

impl SyncError {
    /// Whether the failure came from the projection's contents rather than I/O.
    pub fn is_integrity(&self) -> bool {
        match self {
            Self::Integrity(_) => true,
            Self::Failed(failures) => failures.iter().any(|f| f.error.is_integrity()),
            Self::Database(_) | Self::Encode(_) => false,
        }
    }

    /// A database statement ran past its timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Database(e) => e.is_timeout(),
            Self::Failed(failures) => failures.iter().any(|f| f.error.is_timeout()),
            Self::Integrity(_) | Self::Encode(_) => false,
        }
    }
}

/// Why one family's export did not reach its view.
#[derive(Debug)]
pub struct FamilyFailure {
    pub entity: EntityKind,
    pub error: SyncError,
}

impl fmt::Display for FamilyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.error)
    }
}

fn display_failures(failures: &[FamilyFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Rows published per family by one sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub access_addresses: u64,
    pub unit_addresses: u64,
}

/// Exports the projection into staging tables and refreshes the views.
///
/// Each family goes through import then refresh on its own connection; the
/// two run concurrently and never share a transaction. A family whose import
/// fails leaves its view untouched.
#[derive(Debug, Clone)]
pub struct BulkSynchronizer<S> {
    store: S,
    access_address: TableTarget,
    unit_address: TableTarget,
    chunk_size: usize,
}

impl<S: SpatialStore> BulkSynchronizer<S> {
    pub fn new(store: S, access_address: TableTarget, unit_address: TableTarget) -> Self {
        Self {
            store,
            access_address,
            unit_address,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Publish the projection as it is now.
    ///
    /// The caller must not mutate the projection until this returns; the
    /// borrow enforces it.
    #[instrument(skip_all, fields(applied_events = projection.applied_events()), err)]
    pub async fn sync(&self, projection: &AddressProjection) -> Result<SyncReport, SyncError> {
        let mut access_chunks = access_address_chunks(projection, self.chunk_size);
        let mut unit_chunks = unit_address_chunks(projection, self.chunk_size);

        let (access, unit) = tokio::join!(
            self.publish(
                EntityKind::AccessAddress,
                &self.access_address,
                AccessAddressRow::COLUMNS,
                &mut access_chunks,
            ),
            self.publish(
                EntityKind::UnitAddress,
                &self.unit_address,
                UnitAddressRow::COLUMNS,
                &mut unit_chunks,
            ),
        );

        match (access, unit) {
            (Ok(access_addresses), Ok(unit_addresses)) => Ok(SyncReport {
                access_addresses,
                unit_addresses,
            }),
            (access, unit) => {
                let failures = [
                    (EntityKind::AccessAddress, access.err()),
                    (EntityKind::UnitAddress, unit.err()),
                ]
                .into_iter()
                .filter_map(|(entity, error)| error.map(|error| FamilyFailure { entity, error }))
                .collect();
                Err(SyncError::Failed(failures))
            }
        }
    }

    async fn publish(
        &self,
        entity: EntityKind,
        target: &TableTarget,
        columns: &[&str],
        chunks: &mut ChunkStream<'_>,
    ) -> Result<u64, SyncError> {
        let started = Instant::now();

        let rows = match self.store.import(target, columns, chunks).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(
                    entity = %entity,
                    table = %target.staging_table,
                    error = %err,
                    timeout = err.is_timeout(),
                    "import failed; view keeps its previous snapshot"
                );
                return Err(err);
            }
        };

        self.store.refresh_view(target).await?;

        info!(
            entity = %entity,
            view = %target.view,
            rows,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "published"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{RecordingStore, access_target, fixture, unit_target};
    use crate::sync::wkb::Point;
    use addrsync_addresses::events::{AccessAddressDeleted, UnitAddressCreated};
    use addrsync_addresses::{AddressEvent, AddressStatus, UnitAddressEvent};
    use addrsync_core::{AccessAddressId, UnitAddressId};
    use addrsync_events::{Event, EventEnvelope, Projection};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn synchronizer(store: RecordingStore) -> BulkSynchronizer<RecordingStore> {
        BulkSynchronizer::new(store, access_target(), unit_target())
    }

    fn apply(projection: &mut AddressProjection, position: u64, event: impl Into<AddressEvent>) {
        let event = event.into();
        let envelope = EventEnvelope::new(
            Uuid::now_v7(),
            Uuid::nil(),
            position,
            event.event_type(),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, position as u32).unwrap(),
            event,
        );
        projection.apply(&envelope).unwrap();
    }

    #[tokio::test]
    async fn full_cycle_exports_tombstones() {
        let (mut projection, ids) = fixture();
        let sync = synchronizer(RecordingStore::default());

        let report = sync.sync(&projection).await.unwrap();
        assert_eq!(report, SyncReport { access_addresses: 1, unit_addresses: 0 });

        let rows = sync.store().rows(&access_target());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].value(), Some(ids.access.as_uuid().as_bytes().as_slice()));
        assert_eq!(rows[0][2].text(), Some("Active"));
        assert_eq!(
            Point::from_ewkb(rows[0][1].value().unwrap()).unwrap(),
            Point::source(1.0, 2.0)
        );
        assert_eq!(rows[0][15].value(), Some([0u8].as_slice()));

        apply(
            &mut projection,
            10,
            AccessAddressDeleted {
                id: ids.access,
                external_updated_date: None,
            },
        );
        sync.sync(&projection).await.unwrap();

        let rows = sync.store().rows(&access_target());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].value(), Some(ids.access.as_uuid().as_bytes().as_slice()));
        assert_eq!(rows[0][15].value(), Some([1u8].as_slice()));
        assert_eq!(sync.store().refreshes(), 4);
    }

    #[tokio::test]
    async fn unit_rows_carry_parent_external_id() {
        let (mut projection, ids) = fixture();
        let unit = UnitAddressId::new();
        apply(
            &mut projection,
            10,
            UnitAddressEvent::from(UnitAddressCreated {
                id: unit,
                external_id: None,
                access_address_id: ids.access,
                status: AddressStatus::Pending,
                floor_name: Some("st".into()),
                suite_name: None,
                external_created_date: None,
                external_updated_date: None,
            }),
        );

        let sync = synchronizer(RecordingStore::default());
        sync.sync(&projection).await.unwrap();

        let rows = sync.store().rows(&unit_target());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1].value(), Some(ids.access.as_uuid().as_bytes().as_slice()));
        assert_eq!(rows[0][3].text(), Some("st"));
        assert!(rows[0][4].is_null());
        assert_eq!(rows[0][6].text(), Some("AA-1"));
    }

    #[tokio::test]
    async fn failed_import_skips_only_its_own_refresh() {
        let (projection, _) = fixture();
        let store = RecordingStore::default().failing_on(&access_target());
        let sync = synchronizer(store);

        let err = sync.sync(&projection).await.unwrap_err();

        let SyncError::Failed(failures) = &err else {
            panic!("expected per-family failure, got {err:?}");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].entity, EntityKind::AccessAddress);
        assert!(!err.is_integrity());

        assert!(!sync.store().refreshed(&access_target()));
        assert!(sync.store().refreshed(&unit_target()));
    }

    #[tokio::test]
    async fn failed_import_leaves_previous_snapshot_in_place() {
        let (mut projection, ids) = fixture();
        let sync = synchronizer(RecordingStore::default());
        sync.sync(&projection).await.unwrap();
        let before = sync.store().rows(&access_target());
        assert_eq!(before[0][15].value(), Some([0u8].as_slice()));

        apply(
            &mut projection,
            10,
            AccessAddressDeleted {
                id: ids.access,
                external_updated_date: None,
            },
        );
        sync.store().fail_imports_into(&access_target());
        let err = sync.sync(&projection).await.unwrap_err();
        assert!(matches!(err, SyncError::Failed(_)));

        assert_eq!(sync.store().rows(&access_target()), before);
        // Two refreshes from the first sync, only the unit view from the second.
        assert_eq!(sync.store().refreshes(), 3);
    }

    #[test]
    fn timeouts_are_visible_through_family_failures() {
        let timed_out = DatabaseError {
            code: Some("57014".to_string()),
            ..DatabaseError::new("copy_finish", "canceling statement due to statement timeout")
        };
        let err = SyncError::Failed(vec![FamilyFailure {
            entity: EntityKind::UnitAddress,
            error: timed_out.into(),
        }]);

        assert!(err.is_timeout());
        assert!(!err.is_integrity());
        assert!(!SyncError::from(DatabaseError::new("copy_send", "reset")).is_timeout());
    }

    #[tokio::test]
    async fn dangling_parent_is_fatal_for_unit_export() {
        let (mut projection, _) = fixture();
        let orphan_parent = AccessAddressId::new();
        let unit = UnitAddressId::new();

        // The fold does not check references; only the export does.
        apply(
            &mut projection,
            10,
            UnitAddressEvent::from(UnitAddressCreated {
                id: unit,
                external_id: None,
                access_address_id: orphan_parent,
                status: AddressStatus::Active,
                floor_name: None,
                suite_name: None,
                external_created_date: None,
                external_updated_date: None,
            }),
        );

        let sync = synchronizer(RecordingStore::default());
        let err = sync.sync(&projection).await.unwrap_err();

        assert!(err.is_integrity());
        let SyncError::Failed(failures) = err else {
            unreachable!()
        };
        assert!(matches!(
            &failures[0],
            FamilyFailure {
                entity: EntityKind::UnitAddress,
                error: SyncError::Integrity(IntegrityError::DanglingReference { .. }),
            }
        ));
        assert!(!sync.store().refreshed(&unit_target()));
        assert!(sync.store().refreshed(&access_target()));
    }
}
