//! The conversion pipeline: records in, sink events and trip totals out.

use crate::bands::speed_category;
use crate::config::RunConfig;
use crate::filter::{FilterOutcome, RecordFilter};
use crate::record::RawPoint;
use crate::segment::{Segment, SegmentBuilder};
use crate::trip::{TripAggregator, TripSummary};
use crate::Result;

/// Receiver for the ordered event stream of one conversion run.
///
/// For every run the pipeline emits `on_run_start`, then per segment
/// `on_segment_start`, one `on_point` per plotted vertex, `on_segment_end`,
/// and finally `on_run_end`. The fix handed to `on_segment_start` is
/// header information for the segment; the same fix arrives separately
/// through `on_point`.
pub trait TraceSink {
    fn on_run_start(&mut self) -> Result<()>;
    fn on_segment_start(&mut self, category: usize, point: &RawPoint) -> Result<()>;
    fn on_point(&mut self, point: &RawPoint) -> Result<()>;
    fn on_segment_end(&mut self, segment: &Segment) -> Result<()>;
    fn on_run_end(&mut self, summary: &TripSummary, band_seconds: &[f64]) -> Result<()>;
}

/// Single-pass conversion state. Records go in through [`Pipeline::step`]
/// in file order; [`Pipeline::finish`] closes the last segment and
/// delivers the trip totals.
pub struct Pipeline<'a> {
    config: &'a RunConfig,
    filter: RecordFilter,
    builder: SegmentBuilder,
    trip: TripAggregator,
    records: u64,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Pipeline {
            config,
            filter: RecordFilter::new(config.lat_variance, config.lon_variance),
            builder: SegmentBuilder::new(),
            trip: TripAggregator::new(config.bands.len()),
            records: 0,
        }
    }

    /// Number of records seen so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn step(&mut self, point: &RawPoint, sinks: &mut [&mut dyn TraceSink]) -> Result<()> {
        let index = self.records;
        self.records += 1;

        match self.filter.step(index, point)? {
            FilterOutcome::NoFix | FilterOutcome::Jump => Ok(()),
            FilterOutcome::Duplicate { datetime } => {
                let category = speed_category(point.speed, &self.config.bands);
                self.trip.observe_point(datetime);
                self.builder.absorb_duplicate(point.speed, category);
                Ok(())
            }
            FilterOutcome::Accept {
                datetime,
                first_fix,
                forced_break,
            } => {
                let category = speed_category(point.speed, &self.config.bands);
                self.trip.observe_point(datetime);
                let step = self
                    .builder
                    .accept(point, datetime, category, first_fix, forced_break);
                if let Some(closed) = &step.closed {
                    self.trip.fold_segment(closed);
                    for sink in sinks.iter_mut() {
                        sink.on_segment_end(closed)?;
                    }
                }
                if step.opened {
                    for sink in sinks.iter_mut() {
                        sink.on_segment_start(category, point)?;
                    }
                    if let Some(previous) = &step.join_previous {
                        for sink in sinks.iter_mut() {
                            sink.on_point(previous)?;
                        }
                    }
                }
                for sink in sinks.iter_mut() {
                    sink.on_point(point)?;
                }
                Ok(())
            }
        }
    }

    pub fn finish(mut self, sinks: &mut [&mut dyn TraceSink]) -> Result<(TripSummary, Vec<f64>)> {
        if let Some(closed) = self.builder.take_current() {
            self.trip.fold_segment(&closed);
            for sink in sinks.iter_mut() {
                sink.on_segment_end(&closed)?;
            }
        }
        let (summary, band_seconds) = self.trip.finish()?;
        for sink in sinks.iter_mut() {
            sink.on_run_end(&summary, &band_seconds)?;
        }
        Ok((summary, band_seconds))
    }
}

/// Drives a whole record stream through the pipeline and every sink.
pub fn process<I>(
    records: I,
    config: &RunConfig,
    sinks: &mut [&mut dyn TraceSink],
) -> Result<(TripSummary, Vec<f64>)>
where
    I: IntoIterator<Item = Result<RawPoint>>,
{
    let mut pipeline = Pipeline::new(config);
    for sink in sinks.iter_mut() {
        sink.on_run_start()?;
    }
    for record in records {
        let point = record?;
        pipeline.step(&point, sinks)?;
    }
    pipeline.finish(sinks)
}
