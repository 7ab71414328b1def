//! Writer for the Postgres binary COPY format.
//!
//! Layout: an 11-byte signature, an `i32` flags field and an `i32` header
//! extension length, then one tuple per row (`i16` field count followed by
//! `i32` length + bytes per field, `-1` length for NULL), then an `i16` `-1`
//! trailer. All integers are big-endian.

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

pub const SIGNATURE: &[u8; 11] = b"PGCOPY\n\xff\r\n\0";

/// Microseconds between the Unix epoch and the Postgres epoch (2000-01-01).
const POSTGRES_EPOCH_OFFSET_MICROS: i64 = 946_684_800_000_000;

const NULL_LENGTH: i32 = -1;
const TRAILER: i16 = -1;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("field of {0} bytes does not fit a COPY length prefix")]
    FieldTooLarge(usize),

    #[error("row has {0} fields, more than a COPY tuple can hold")]
    TooManyFields(usize),
}

/// Streams rows into a buffer that can be drained in chunks.
///
/// Callers write one `start_row` followed by exactly that many fields; the
/// writer does not check the count.
#[derive(Debug)]
pub struct BinaryCopyWriter {
    buf: BytesMut,
    rows: u64,
}

impl BinaryCopyWriter {
    pub fn new() -> Self {
        Self::with_capacity(8 * 1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut buf = BytesMut::with_capacity(capacity.max(SIGNATURE.len() + 8));
        buf.put_slice(SIGNATURE);
        buf.put_i32(0);
        buf.put_i32(0);
        Self { buf, rows: 0 }
    }

    pub fn start_row(&mut self, fields: usize) -> Result<(), EncodeError> {
        let count = i16::try_from(fields).map_err(|_| EncodeError::TooManyFields(fields))?;
        self.buf.put_i16(count);
        self.rows += 1;
        Ok(())
    }

    pub fn null(&mut self) {
        self.buf.put_i32(NULL_LENGTH);
    }

    pub fn bytes(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        let len = i32::try_from(data.len()).map_err(|_| EncodeError::FieldTooLarge(data.len()))?;
        self.buf.put_i32(len);
        self.buf.put_slice(data);
        Ok(())
    }

    pub fn text(&mut self, value: &str) -> Result<(), EncodeError> {
        self.bytes(value.as_bytes())
    }

    /// Absent values become NULL, never an empty string.
    pub fn nullable_text(&mut self, value: Option<&str>) -> Result<(), EncodeError> {
        match value {
            Some(value) => self.text(value),
            None => {
                self.null();
                Ok(())
            }
        }
    }

    pub fn uuid(&mut self, value: Uuid) {
        self.buf.put_i32(16);
        self.buf.put_slice(value.as_bytes());
    }

    pub fn bool(&mut self, value: bool) {
        self.buf.put_i32(1);
        self.buf.put_u8(u8::from(value));
    }

    pub fn timestamptz(&mut self, value: DateTime<Utc>) {
        self.buf.put_i32(8);
        self.buf
            .put_i64(value.timestamp_micros() - POSTGRES_EPOCH_OFFSET_MICROS);
    }

    pub fn nullable_timestamptz(&mut self, value: Option<DateTime<Utc>>) {
        match value {
            Some(value) => self.timestamptz(value),
            None => self.null(),
        }
    }

    /// Rows started so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Bytes buffered and not yet taken.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take everything buffered so far, leaving the writer ready for more rows.
    pub fn take_chunk(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Append the trailer and return the remaining bytes.
    pub fn finish(mut self) -> Bytes {
        self.buf.put_i16(TRAILER);
        self.buf.freeze()
    }
}

impl Default for BinaryCopyWriter {
    fn default() -> Self {
        Self::new()
    }
}
