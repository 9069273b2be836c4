//! Core GPS trace conversion library: decodes fixed-layout binary trace
//! records, filters no-fix sentinels and implausible jumps, classifies fixes
//! into speed bands, and folds the survivors into route segments and trip
//! statistics delivered through a sink event contract.

pub mod bands;
pub mod config;
pub mod filter;
pub mod pipeline;
pub mod record;
pub mod segment;
pub mod trip;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("failed to read trace: {0}")]
    Io(#[from] std::io::Error),
    #[error(
        "record {index}: {year}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02} is not a valid timestamp"
    )]
    InvalidTimestamp {
        index: u64,
        year: i16,
        month: i16,
        day: i16,
        hour: i16,
        minute: i16,
        second: i16,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("no accepted fixes in trace")]
    EmptyTrace,
}

pub type Result<T> = std::result::Result<T, TraceError>;

pub use bands::{default_bands, speed_category, SpeedBand};
pub use config::RunConfig;
pub use filter::{FilterOutcome, RecordFilter};
pub use pipeline::{process, Pipeline, TraceSink};
pub use record::{RawPoint, TraceReader, RECORD_SIZE};
pub use segment::{Segment, SegmentBuilder};
pub use trip::{TripAggregator, TripSummary};
