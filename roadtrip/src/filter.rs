//! Fix acceptance: no-fix sentinels and implausible jumps.

use chrono::NaiveDateTime;

use crate::record::RawPoint;
use crate::{Result, TraceError};

/// What the filter decided about one record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FilterOutcome {
    /// No-signal sentinel. Dropped, and the baseline is cleared so the
    /// next accepted fix starts a fresh segment.
    NoFix,
    /// Displacement from the baseline was implausible for the elapsed
    /// time. Dropped; the baseline stands and a break is now pending.
    Jump,
    /// Accepted at exactly the baseline coordinates. Contributes to
    /// segment speed statistics only.
    Duplicate { datetime: NaiveDateTime },
    /// Accepted fix.
    Accept {
        datetime: NaiveDateTime,
        /// First fix of the trace, or first after signal loss.
        first_fix: bool,
        /// A jump was rejected since the last accepted fix.
        forced_break: bool,
    },
}

/// Last accepted fix, the reference for jump and duplicate checks.
#[derive(Clone, Copy, Debug)]
struct Baseline {
    latitude: f64,
    longitude: f64,
    datetime: NaiveDateTime,
}

/// Stateful per-record filter. Feed records in file order through
/// [`RecordFilter::step`].
#[derive(Debug)]
pub struct RecordFilter {
    lat_variance: f64,
    lon_variance: f64,
    baseline: Option<Baseline>,
    break_pending: bool,
}

impl RecordFilter {
    pub fn new(lat_variance: f64, lon_variance: f64) -> Self {
        RecordFilter {
            lat_variance,
            lon_variance,
            baseline: None,
            break_pending: false,
        }
    }

    /// True for the no-signal sentinel shape: a zero coordinate or a year
    /// outside any plausible range.
    pub fn is_no_fix(point: &RawPoint) -> bool {
        point.latitude == 0.0 || point.longitude == 0.0 || point.year < 0 || point.year > 5000
    }

    /// Classifies one record. `index` is its position in the trace, used
    /// only for error reporting.
    pub fn step(&mut self, index: u64, point: &RawPoint) -> Result<FilterOutcome> {
        if Self::is_no_fix(point) {
            self.baseline = None;
            return Ok(FilterOutcome::NoFix);
        }

        // Sentinels are screened on the raw components above, so a date
        // that still fails to realize here is corrupt data.
        let datetime = point.datetime().ok_or(TraceError::InvalidTimestamp {
            index,
            year: point.year,
            month: point.month,
            day: point.day,
            hour: point.hour,
            minute: point.minute,
            second: point.second,
        })?;

        let Some(base) = self.baseline else {
            self.baseline = Some(Baseline {
                latitude: point.latitude,
                longitude: point.longitude,
                datetime,
            });
            self.break_pending = false;
            return Ok(FilterOutcome::Accept {
                datetime,
                first_fix: true,
                forced_break: false,
            });
        };

        let mut elapsed = (datetime - base.datetime).num_seconds();
        if elapsed == 0 {
            // sub-second samples still allow one second of drift
            elapsed = 1;
        }
        let implausible = elapsed < 0
            || (point.latitude - base.latitude).abs() > self.lat_variance * elapsed as f64
            || (point.longitude - base.longitude).abs() > self.lon_variance * elapsed as f64;
        if implausible {
            self.break_pending = true;
            return Ok(FilterOutcome::Jump);
        }

        let duplicate =
            point.latitude == base.latitude && point.longitude == base.longitude;
        self.baseline = Some(Baseline {
            latitude: point.latitude,
            longitude: point.longitude,
            datetime,
        });
        if duplicate {
            return Ok(FilterOutcome::Duplicate { datetime });
        }

        let forced_break = self.break_pending;
        self.break_pending = false;
        Ok(FilterOutcome::Accept {
            datetime,
            first_fix: false,
            forced_break,
        })
    }
}
