//! Projection records as staging-table rows.
//!
//! Rows are resolved against the projection at export time: access addresses
//! pick up their road and post district, unit addresses their parent's
//! external id. A reference that does not resolve is an integrity error.

use bytes::Bytes;

use addrsync_addresses::{AccessAddress, AddressProjection, PostCode, Road, UnitAddress};
use addrsync_core::{AccessAddressId, EntityKind, IntegrityError, IntegrityResult, UnitAddressId};

use super::copy::{BinaryCopyWriter, EncodeError};
use super::synchronizer::SyncError;
use super::wkb::Point;

/// Default size of each chunk handed to the store.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// A row that knows its staging columns and how to encode itself.
pub trait EncodeRow {
    const COLUMNS: &'static [&'static str];

    fn encode(&self, writer: &mut BinaryCopyWriter) -> Result<(), EncodeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccessAddressRow<'a> {
    pub id: AccessAddressId,
    pub address: &'a AccessAddress,
    pub road: &'a Road,
    pub post_code: &'a PostCode,
}

impl<'a> AccessAddressRow<'a> {
    pub fn resolve(
        projection: &'a AddressProjection,
        id: AccessAddressId,
        address: &'a AccessAddress,
    ) -> IntegrityResult<Self> {
        let road = projection.road(&address.road_id).ok_or_else(|| {
            IntegrityError::dangling(EntityKind::AccessAddress, id, EntityKind::Road, address.road_id)
        })?;
        let post_code = projection.post_code(&address.post_code_id).ok_or_else(|| {
            IntegrityError::dangling(
                EntityKind::AccessAddress,
                id,
                EntityKind::PostCode,
                address.post_code_id,
            )
        })?;

        Ok(Self {
            id,
            address,
            road,
            post_code,
        })
    }

    /// The address position, east as `x` and north as `y`.
    pub fn geometry(&self) -> Point {
        Point::source(self.address.east_coordinate, self.address.north_coordinate)
    }
}

impl EncodeRow for AccessAddressRow<'_> {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "coord",
        "status",
        "house_number",
        "road_code",
        "road_name",
        "town_name",
        "post_district_code",
        "post_district_name",
        "municipal_code",
        "access_address_external_id",
        "road_external_id",
        "plot_external_id",
        "created",
        "updated",
        "deleted",
    ];

    fn encode(&self, w: &mut BinaryCopyWriter) -> Result<(), EncodeError> {
        let a = self.address;
        w.start_row(Self::COLUMNS.len())?;
        w.uuid(*self.id.as_uuid());
        w.bytes(&self.geometry().to_ewkb())?;
        w.text(a.status.as_str())?;
        w.text(&a.house_number)?;
        w.text(&a.road_code)?;
        w.text(&self.road.name)?;
        w.nullable_text(a.town_name.as_deref())?;
        w.text(&self.post_code.code)?;
        w.text(&self.post_code.name)?;
        w.text(&a.municipal_code)?;
        w.nullable_text(a.external_id.as_deref())?;
        w.text(&self.road.external_id)?;
        w.nullable_text(a.plot_id.as_deref())?;
        w.timestamptz(a.created_at);
        w.nullable_timestamptz(a.updated_at);
        w.bool(a.deleted);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitAddressRow<'a> {
    pub id: UnitAddressId,
    pub unit: &'a UnitAddress,
    /// The parent access address's external id, copied onto the row.
    pub access_address_external_id: Option<&'a str>,
}

impl<'a> UnitAddressRow<'a> {
    pub fn resolve(
        projection: &'a AddressProjection,
        id: UnitAddressId,
        unit: &'a UnitAddress,
    ) -> IntegrityResult<Self> {
        let parent = projection
            .access_address(&unit.access_address_id)
            .ok_or_else(|| {
                IntegrityError::dangling(
                    EntityKind::UnitAddress,
                    id,
                    EntityKind::AccessAddress,
                    unit.access_address_id,
                )
            })?;

        Ok(Self {
            id,
            unit,
            access_address_external_id: parent.external_id.as_deref(),
        })
    }
}

impl EncodeRow for UnitAddressRow<'_> {
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "access_address_id",
        "status",
        "floor_name",
        "suite_name",
        "unit_address_external_id",
        "access_address_external_id",
        "created",
        "updated",
        "deleted",
    ];

    fn encode(&self, w: &mut BinaryCopyWriter) -> Result<(), EncodeError> {
        let u = self.unit;
        w.start_row(Self::COLUMNS.len())?;
        w.uuid(*self.id.as_uuid());
        w.uuid(*u.access_address_id.as_uuid());
        w.text(u.status.as_str())?;
        w.nullable_text(u.floor_name.as_deref())?;
        w.nullable_text(u.suite_name.as_deref())?;
        w.nullable_text(u.external_id.as_deref())?;
        w.nullable_text(self.access_address_external_id)?;
        w.timestamptz(u.created_at);
        w.nullable_timestamptz(u.updated_at);
        w.bool(u.deleted);
        Ok(())
    }
}

/// Lazily encodes resolved rows into COPY chunks of roughly `chunk_size`
/// bytes, ending with the trailer.
///
/// The first resolution or encoding error is yielded once and ends the
/// stream; no trailer follows it.
#[derive(Debug)]
pub struct CopyChunks<I> {
    rows: I,
    writer: Option<BinaryCopyWriter>,
    chunk_size: usize,
}

impl<I> CopyChunks<I> {
    pub fn new(rows: I, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            rows,
            writer: Some(BinaryCopyWriter::with_capacity(chunk_size + 1024)),
            chunk_size,
        }
    }
}

impl<I, R> Iterator for CopyChunks<I>
where
    I: Iterator<Item = IntegrityResult<R>>,
    R: EncodeRow,
{
    type Item = Result<Bytes, SyncError>;

    fn next(&mut self) -> Option<Self::Item> {
        let writer = self.writer.as_mut()?;

        while writer.len() < self.chunk_size {
            let encoded = match self.rows.next() {
                Some(Ok(row)) => row.encode(writer).map_err(SyncError::from),
                Some(Err(err)) => Err(SyncError::from(err)),
                None => {
                    let writer = self.writer.take()?;
                    return Some(Ok(writer.finish()));
                }
            };

            if let Err(err) = encoded {
                self.writer = None;
                return Some(Err(err));
            }
        }

        Some(Ok(writer.take_chunk()))
    }
}

/// Every access address, tombstones included, in id order.
pub fn access_address_chunks(
    projection: &AddressProjection,
    chunk_size: usize,
) -> CopyChunks<impl Iterator<Item = IntegrityResult<AccessAddressRow<'_>>> + Send> {
    let mut records: Vec<_> = projection.access_addresses().iter().collect();
    records.sort_unstable_by_key(|(id, _)| **id);

    let rows = records
        .into_iter()
        .map(move |(id, address)| AccessAddressRow::resolve(projection, *id, address));
    CopyChunks::new(rows, chunk_size)
}

/// Every unit address, tombstones included, in id order.
pub fn unit_address_chunks(
    projection: &AddressProjection,
    chunk_size: usize,
) -> CopyChunks<impl Iterator<Item = IntegrityResult<UnitAddressRow<'_>>> + Send> {
    let mut records: Vec<_> = projection.unit_addresses().iter().collect();
    records.sort_unstable_by_key(|(id, _)| **id);

    let rows = records
        .into_iter()
        .map(move |(id, unit)| UnitAddressRow::resolve(projection, *id, unit));
    CopyChunks::new(rows, chunk_size)
}
