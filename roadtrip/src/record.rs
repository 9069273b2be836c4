//! Binary trace record decoding.
//!
//! Trace logs are a bare concatenation of fixed 48-byte little-endian
//! records with no header or framing:
//!
//! | offset | type | field     |
//! |--------|------|-----------|
//! | 0      | i16  | year      |
//! | 2      | i16  | month     |
//! | 4      | i16  | day       |
//! | 6      | i16  | hour      |
//! | 8      | i16  | minute    |
//! | 10     | i16  | second    |
//! | 12     | f32  | (unused)  |
//! | 16     | f32  | hdop      |
//! | 20     | f32  | (unused)  |
//! | 24     | f32  | latitude  |
//! | 28     | f32  | longitude |
//! | 32     | f32  | altitude  |
//! | 36     | f32  | (unused)  |
//! | 40     | f32  | speed     |
//! | 44     | f32  | bearing   |
//!
//! A trailing partial record (stream length not a multiple of 48) is
//! dropped silently.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Size of one on-disk trace record in bytes.
pub const RECORD_SIZE: usize = 48;

/// One decoded trace record.
///
/// Timestamp components are kept as raw signed integers rather than a
/// realized datetime: no-fix sentinel records carry unrealizable dates
/// (year 9999 and the like) and must still be representable. Use
/// [`RawPoint::datetime`] once a record has passed the sentinel check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub year: i16,
    pub month: i16,
    pub day: i16,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
    pub bearing: f64,
}

impl RawPoint {
    /// Decodes one record from its fixed little-endian layout.
    pub fn decode(buf: &[u8; RECORD_SIZE]) -> Self {
        let i16_at = |off: usize| i16::from_le_bytes([buf[off], buf[off + 1]]);
        let f32_at =
            |off: usize| f32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);
        RawPoint {
            year: i16_at(0),
            month: i16_at(2),
            day: i16_at(4),
            hour: i16_at(6),
            minute: i16_at(8),
            second: i16_at(10),
            latitude: f64::from(f32_at(24)),
            longitude: f64::from(f32_at(28)),
            altitude: f64::from(f32_at(32)),
            speed: f64::from(f32_at(40)),
            bearing: f64::from(f32_at(44)),
        }
    }

    /// Realizes the timestamp components as a calendar datetime, or `None`
    /// when they do not name a valid instant.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let month = u32::try_from(self.month).ok()?;
        let day = u32::try_from(self.day).ok()?;
        let hour = u32::try_from(self.hour).ok()?;
        let minute = u32::try_from(self.minute).ok()?;
        let second = u32::try_from(self.second).ok()?;
        NaiveDate::from_ymd_opt(i32::from(self.year), month, day)?
            .and_hms_opt(hour, minute, second)
    }
}

/// Streaming reader over the records of one trace log.
///
/// Yields `floor(len / 48)` records; the iterator ends cleanly on a
/// truncated final record and surfaces only genuine I/O failures.
pub struct TraceReader<R> {
    inner: R,
    done: bool,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(TraceReader::new(BufReader::new(file)))
    }
}

impl<R: Read> TraceReader<R> {
    pub fn new(inner: R) -> Self {
        TraceReader { inner, done: false }
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<RawPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = [0u8; RECORD_SIZE];
        match fill_record(&mut self.inner, &mut buf) {
            Ok(true) => Some(Ok(RawPoint::decode(&buf))),
            Ok(false) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.into()))
            }
        }
    }
}

/// Reads exactly one record, returning `Ok(false)` on end of stream.
/// A partial trailing record also ends the stream.
fn fill_record<R: Read>(reader: &mut R, buf: &mut [u8; RECORD_SIZE]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < RECORD_SIZE {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(false),
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(true)
}
