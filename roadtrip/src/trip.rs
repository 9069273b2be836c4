//! Whole-trip statistics folded from closed segments.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::segment::Segment;
use crate::{Result, TraceError};

/// Totals for one converted trace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    /// Timestamp of the first accepted fix.
    pub start: NaiveDateTime,
    /// Timestamp of the last accepted fix, duplicates included.
    pub end: NaiveDateTime,
    pub top_speed: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    pub speed_sum: f64,
    pub point_count: u64,
}

impl TripSummary {
    pub fn average_speed(&self) -> f64 {
        self.speed_sum / self.point_count as f64
    }

    /// Wall-clock trip duration in whole seconds.
    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64
    }
}

#[derive(Clone, Copy, Debug)]
struct Extremes {
    top_speed: f64,
    min_altitude: f64,
    max_altitude: f64,
}

/// Accumulates trip statistics across segments.
///
/// Time per band is counted against the band each segment opened in, so
/// the per-band totals always sum to the total time spent in segments.
#[derive(Debug)]
pub struct TripAggregator {
    band_seconds: Vec<f64>,
    first_time: Option<NaiveDateTime>,
    last_time: Option<NaiveDateTime>,
    extremes: Option<Extremes>,
    speed_sum: f64,
    point_count: u64,
}

impl TripAggregator {
    pub fn new(band_count: usize) -> Self {
        TripAggregator {
            band_seconds: vec![0.0; band_count],
            first_time: None,
            last_time: None,
            extremes: None,
            speed_sum: 0.0,
            point_count: 0,
        }
    }

    /// Records the timestamp of an accepted fix. Duplicates count too, so
    /// a trace ending in repeated coordinates still ends at its true time.
    pub fn observe_point(&mut self, datetime: NaiveDateTime) {
        self.first_time.get_or_insert(datetime);
        self.last_time = Some(datetime);
    }

    /// Folds one closed segment into the trip totals.
    pub fn fold_segment(&mut self, segment: &Segment) {
        if let Some(seconds) = self.band_seconds.get_mut(segment.category) {
            *seconds += segment.duration_seconds();
        }
        self.speed_sum += segment.speed_sum;
        self.point_count += segment.point_count;
        match &mut self.extremes {
            Some(extremes) => {
                extremes.top_speed = extremes.top_speed.max(segment.max_speed);
                extremes.min_altitude = extremes.min_altitude.min(segment.min_altitude);
                extremes.max_altitude = extremes.max_altitude.max(segment.max_altitude);
            }
            None => {
                self.extremes = Some(Extremes {
                    top_speed: segment.max_speed,
                    min_altitude: segment.min_altitude,
                    max_altitude: segment.max_altitude,
                });
            }
        }
    }

    /// Finishes the trip. Fails with [`TraceError::EmptyTrace`] when no
    /// fix was ever accepted, rather than reporting undefined averages.
    pub fn finish(self) -> Result<(TripSummary, Vec<f64>)> {
        let (Some(start), Some(end), Some(extremes)) =
            (self.first_time, self.last_time, self.extremes)
        else {
            return Err(TraceError::EmptyTrace);
        };
        if self.point_count == 0 {
            return Err(TraceError::EmptyTrace);
        }
        let summary = TripSummary {
            start,
            end,
            top_speed: extremes.top_speed,
            min_altitude: extremes.min_altitude,
            max_altitude: extremes.max_altitude,
            speed_sum: self.speed_sum,
            point_count: self.point_count,
        };
        Ok((summary, self.band_seconds))
    }
}
