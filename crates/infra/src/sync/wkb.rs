//! Extended well-known-binary (EWKB) points, as PostGIS stores them.
//!
//! Only 2D points are needed: byte order, geometry type with the SRID flag
//! set, the SRID, then `x` and `y` as `f64`.

use bytes::{Buf, BufMut};
use thiserror::Error;

/// ETRS89 / UTM zone 32N, the reference system of the registry coordinates.
pub const SOURCE_SRID: u32 = 25832;

const WKB_POINT: u32 = 1;
const EWKB_SRID_FLAG: u32 = 0x2000_0000;
const LITTLE_ENDIAN: u8 = 1;
const BIG_ENDIAN: u8 = 0;

/// Encoded length of a 2D point with SRID.
pub const EWKB_POINT_LEN: usize = 1 + 4 + 4 + 8 + 8;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WkbError {
    #[error("EWKB point needs {EWKB_POINT_LEN} bytes, got {0}")]
    Length(usize),

    #[error("unknown byte order marker {0}")]
    ByteOrder(u8),

    #[error("geometry type {0:#x} is not a point with SRID")]
    GeometryType(u32),
}

/// A point in a projected reference system, `x` = east, `y` = north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub east: f64,
    pub north: f64,
    pub srid: u32,
}

impl Point {
    pub fn new(east: f64, north: f64, srid: u32) -> Self {
        Self { east, north, srid }
    }

    /// Point in the registry's own reference system.
    pub fn source(east: f64, north: f64) -> Self {
        Self::new(east, north, SOURCE_SRID)
    }

    /// Little-endian EWKB.
    pub fn to_ewkb(&self) -> [u8; EWKB_POINT_LEN] {
        let mut out = [0u8; EWKB_POINT_LEN];
        let mut buf = &mut out[..];
        buf.put_u8(LITTLE_ENDIAN);
        buf.put_u32_le(WKB_POINT | EWKB_SRID_FLAG);
        buf.put_u32_le(self.srid);
        buf.put_f64_le(self.east);
        buf.put_f64_le(self.north);
        out
    }

    /// Decode a 2D EWKB point in either byte order.
    pub fn from_ewkb(data: &[u8]) -> Result<Self, WkbError> {
        if data.len() != EWKB_POINT_LEN {
            return Err(WkbError::Length(data.len()));
        }

        let mut buf = data;
        let little = match buf.get_u8() {
            LITTLE_ENDIAN => true,
            BIG_ENDIAN => false,
            other => return Err(WkbError::ByteOrder(other)),
        };

        let geometry_type = if little { buf.get_u32_le() } else { buf.get_u32() };
        if geometry_type != WKB_POINT | EWKB_SRID_FLAG {
            return Err(WkbError::GeometryType(geometry_type));
        }

        let (srid, east, north) = if little {
            (buf.get_u32_le(), buf.get_f64_le(), buf.get_f64_le())
        } else {
            (buf.get_u32(), buf.get_f64(), buf.get_f64())
        };

        Ok(Self { east, north, srid })
    }
}
