//! Route segments: contiguous runs of accepted fixes in one speed band.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::record::RawPoint;

/// Statistics for one closed or in-progress segment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Band index fixed when the segment opened.
    pub category: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub min_speed: f64,
    pub max_speed: f64,
    pub min_altitude: f64,
    pub max_altitude: f64,
    /// Sum over every accepted fix in the segment, duplicates included.
    pub speed_sum: f64,
    /// Accepted fixes in the segment, duplicates included.
    pub point_count: u64,
}

impl Segment {
    fn open(category: usize, point: &RawPoint, datetime: NaiveDateTime) -> Self {
        Segment {
            category,
            start: datetime,
            end: datetime,
            min_speed: point.speed,
            max_speed: point.speed,
            min_altitude: point.altitude,
            max_altitude: point.altitude,
            speed_sum: point.speed,
            point_count: 1,
        }
    }

    fn extend(&mut self, point: &RawPoint, datetime: NaiveDateTime) {
        self.end = datetime;
        self.min_speed = self.min_speed.min(point.speed);
        self.max_speed = self.max_speed.max(point.speed);
        self.min_altitude = self.min_altitude.min(point.altitude);
        self.max_altitude = self.max_altitude.max(point.altitude);
        self.speed_sum += point.speed;
        self.point_count += 1;
    }

    /// Folds in a duplicate fix: speed statistics move, extremes and the
    /// end time do not.
    fn absorb_duplicate(&mut self, speed: f64) {
        self.speed_sum += speed;
        self.point_count += 1;
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64
    }

    pub fn average_speed(&self) -> f64 {
        self.speed_sum / self.point_count as f64
    }
}

/// What one accepted fix did to the segment state.
#[derive(Debug, Default)]
pub struct SegmentStep {
    /// Segment closed by this fix, if a boundary fired.
    pub closed: Option<Segment>,
    /// True when this fix opened a new segment.
    pub opened: bool,
    /// Previous fix to re-emit as the first vertex of the new segment,
    /// keeping the drawn route visually continuous across a band change.
    pub join_previous: Option<RawPoint>,
}

/// Groups accepted fixes into contiguous same-band segments.
///
/// A segment boundary fires when a fix is the first of the trace, the
/// first after signal loss, classified into a different band than the
/// previous accepted fix, or arrives with a pending break after a
/// rejected jump.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    current: Option<Segment>,
    /// Last accepted non-duplicate fix, the joining vertex candidate.
    prev_point: Option<RawPoint>,
    /// Band of the last accepted fix, duplicates included.
    prev_category: Option<usize>,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        SegmentBuilder::default()
    }

    /// Applies one accepted, non-duplicate fix.
    pub fn accept(
        &mut self,
        point: &RawPoint,
        datetime: NaiveDateTime,
        category: usize,
        first_fix: bool,
        forced_break: bool,
    ) -> SegmentStep {
        let band_change = self.prev_category.is_some_and(|prev| prev != category);
        let boundary =
            self.current.is_none() || first_fix || forced_break || band_change;

        let mut step = SegmentStep::default();
        if boundary {
            step.closed = self.current.take();
            // Only a plain band change joins the routes; after signal
            // loss or a rejected jump the gap is real and stays visible.
            if step.closed.is_some() && !first_fix && !forced_break {
                step.join_previous = self.prev_point;
            }
            self.current = Some(Segment::open(category, point, datetime));
            step.opened = true;
        } else if let Some(segment) = &mut self.current {
            segment.extend(point, datetime);
        }

        self.prev_point = Some(*point);
        self.prev_category = Some(category);
        step
    }

    /// Applies one duplicate fix to the open segment.
    pub fn absorb_duplicate(&mut self, speed: f64, category: usize) {
        if let Some(segment) = &mut self.current {
            segment.absorb_duplicate(speed);
        }
        self.prev_category = Some(category);
    }

    /// Closes and returns the in-progress segment at end of input.
    pub fn take_current(&mut self) -> Option<Segment> {
        self.current.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            + Duration::seconds(i64::from(second))
    }

    fn fix(lat: f64, speed: f64, altitude: f64) -> RawPoint {
        RawPoint {
            year: 2009,
            month: 6,
            day: 1,
            hour: 12,
            minute: 0,
            second: 0,
            latitude: lat,
            longitude: 20.0,
            altitude,
            speed,
            bearing: 0.0,
        }
    }

    #[test]
    fn first_fix_opens_without_closing() {
        let mut builder = SegmentBuilder::new();
        let step = builder.accept(&fix(10.0, 5.0, 100.0), at(0), 1, true, false);
        assert!(step.closed.is_none());
        assert!(step.opened);
        assert!(step.join_previous.is_none());
    }

    #[test]
    fn same_band_extends_the_open_segment() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 5.0, 100.0), at(0), 1, true, false);
        let step = builder.accept(&fix(10.0001, 7.0, 120.0), at(3), 1, false, false);
        assert!(step.closed.is_none());
        assert!(!step.opened);

        let segment = builder.take_current().unwrap();
        assert_eq!(segment.point_count, 2);
        assert_eq!(segment.min_speed, 5.0);
        assert_eq!(segment.max_speed, 7.0);
        assert_eq!(segment.min_altitude, 100.0);
        assert_eq!(segment.max_altitude, 120.0);
        assert_eq!(segment.speed_sum, 12.0);
        assert_eq!(segment.duration_seconds(), 3.0);
        assert_eq!(segment.average_speed(), 6.0);
    }

    #[test]
    fn band_change_closes_and_joins() {
        let mut builder = SegmentBuilder::new();
        let prev = fix(10.0, 5.0, 100.0);
        builder.accept(&prev, at(0), 0, true, false);
        let step = builder.accept(&fix(10.0001, 40.0, 100.0), at(1), 1, false, false);

        let closed = step.closed.unwrap();
        assert_eq!(closed.category, 0);
        assert_eq!(closed.point_count, 1);
        assert!(step.opened);
        assert_eq!(step.join_previous.unwrap().latitude, prev.latitude);
    }

    #[test]
    fn forced_break_closes_without_joining() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 5.0, 100.0), at(0), 0, true, false);
        let step = builder.accept(&fix(10.0001, 6.0, 100.0), at(5), 0, false, true);
        assert!(step.closed.is_some());
        assert!(step.opened);
        assert!(step.join_previous.is_none());
    }

    #[test]
    fn fresh_fix_after_signal_loss_closes_without_joining() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 5.0, 100.0), at(0), 0, true, false);
        // same band, but first after a sentinel
        let step = builder.accept(&fix(11.0, 5.0, 100.0), at(60), 0, true, false);
        let closed = step.closed.unwrap();
        assert_eq!(closed.end, at(0));
        assert!(step.join_previous.is_none());
    }

    #[test]
    fn single_fix_segment_has_equal_start_and_end() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 5.0, 100.0), at(7), 2, true, false);
        let segment = builder.take_current().unwrap();
        assert_eq!(segment.start, segment.end);
        assert_eq!(segment.duration_seconds(), 0.0);
        assert_eq!(segment.average_speed(), 5.0);
    }

    #[test]
    fn duplicates_move_averages_but_not_extremes() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 10.0, 100.0), at(0), 1, true, false);
        builder.absorb_duplicate(50.0, 2);
        let segment = builder.take_current().unwrap();
        assert_eq!(segment.point_count, 2);
        assert_eq!(segment.speed_sum, 60.0);
        assert_eq!(segment.max_speed, 10.0);
        assert_eq!(segment.end, at(0));
    }

    #[test]
    fn duplicate_band_counts_for_the_next_boundary() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 10.0, 100.0), at(0), 1, true, false);
        // the duplicate's band 2 becomes the comparison point, so a
        // return to band 1 is a change even though the segment is band 1
        builder.absorb_duplicate(50.0, 2);
        let step = builder.accept(&fix(10.0001, 10.0, 100.0), at(2), 1, false, false);
        let closed = step.closed.expect("band 1 segment should close");
        assert_eq!(closed.category, 1);
        assert!(step.opened);
    }

    #[test]
    fn fix_matching_the_duplicate_band_extends_the_segment() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 10.0, 100.0), at(0), 1, true, false);
        builder.absorb_duplicate(50.0, 2);
        // band 2 matches the duplicate, so the open segment carries on
        let step = builder.accept(&fix(10.0001, 50.0, 100.0), at(2), 2, false, false);
        assert!(step.closed.is_none());
        assert!(!step.opened);
        assert_eq!(builder.take_current().unwrap().category, 1);
    }

    #[test]
    fn category_is_fixed_at_open_time() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 10.0, 100.0), at(0), 1, true, false);
        // a faster duplicate does not re-band the open segment
        builder.absorb_duplicate(50.0, 2);
        assert_eq!(builder.take_current().unwrap().category, 1);
    }

    #[test]
    fn take_current_drains_the_builder() {
        let mut builder = SegmentBuilder::new();
        builder.accept(&fix(10.0, 5.0, 100.0), at(0), 0, true, false);
        assert!(builder.take_current().is_some());
        assert!(builder.take_current().is_none());
    }
}
