mod gpx;
mod kml;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use roadtrip::{config, pipeline, RunConfig, TraceReader, TraceSink, TripSummary, RECORD_SIZE};

use crate::gpx::GpxWriter;
use crate::kml::KmlWriter;

const TRIP_TIME_FORMAT: &str = "%d-%m-%Y %H:%M:%S";
const OUTPUT_PREFIX: &str = "RoadTrip_";

#[derive(Parser, Debug)]
#[command(author, version, about = "Convert PSP-290 GPS trace logs to KML and GPX", long_about = None)]
struct Cli {
    /// GPS trace files to convert (defaults to gps.txt)
    #[arg(value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Speed band and jump variance configuration file
    #[arg(long, default_value = "roadtrip.ini", value_hint = ValueHint::FilePath)]
    config: PathBuf,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let inputs = if cli.inputs.is_empty() {
        vec![PathBuf::from("gps.txt")]
    } else {
        cli.inputs.clone()
    };

    let config = config::load_or_default(&cli.config);
    debug!(
        "using {} speed bands, variance lat {} lon {}",
        config.bands.len(),
        config.lat_variance,
        config.lon_variance
    );

    let mut converted = 0usize;
    for input in &inputs {
        match convert_file(input, &config) {
            Ok(report) => {
                converted += 1;
                print_report(input, &cli.config, &config, &report);
            }
            Err(err) => {
                error!("skipping {}: {:#}", input.display(), err);
            }
        }
    }

    if converted == 0 {
        return Err(anyhow!("no input files converted"));
    }
    Ok(())
}

struct FileReport {
    records: u64,
    track_points: u64,
    segments: u64,
    kml_path: PathBuf,
    gpx_path: PathBuf,
    summary: TripSummary,
    band_seconds: Vec<f64>,
}

fn convert_file(input: &Path, config: &RunConfig) -> Result<FileReport> {
    let reader = TraceReader::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let records = fs::metadata(input)
        .map(|meta| meta.len() / RECORD_SIZE as u64)
        .unwrap_or(0);

    let kml_path = output_path(input, "kml");
    let gpx_path = output_path(input, "gpx");
    let document_name = kml_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("RoadTrip.kml")
        .to_string();

    let mut kml = KmlWriter::create(&kml_path, config.bands.clone(), document_name)
        .with_context(|| format!("failed to create {}", kml_path.display()))?;
    let mut gpx = GpxWriter::create(&gpx_path)
        .with_context(|| format!("failed to create {}", gpx_path.display()))?;

    let outcome = {
        let mut sinks: [&mut dyn TraceSink; 2] = [&mut kml, &mut gpx];
        pipeline::process(reader, config, &mut sinks)
    };
    match outcome {
        Ok((summary, band_seconds)) => {
            let track_points = gpx.points();
            let segments = kml.segments();
            info!("Wrote route overview: {}", kml_path.display());
            info!("Wrote waypoint track: {}", gpx_path.display());
            Ok(FileReport {
                records,
                track_points,
                segments,
                kml_path,
                gpx_path,
                summary,
                band_seconds,
            })
        }
        Err(err) => {
            // close and discard the half-written documents
            drop(kml);
            drop(gpx);
            let _ = fs::remove_file(&kml_path);
            let _ = fs::remove_file(&gpx_path);
            Err(err).with_context(|| format!("failed to convert {}", input.display()))
        }
    }
}

/// `dir/trace.bin` becomes `dir/RoadTrip_trace.kml` (or `.gpx`).
fn output_path(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("trace");
    input.with_file_name(format!("{OUTPUT_PREFIX}{stem}.{extension}"))
}

fn print_report(input: &Path, config_path: &Path, config: &RunConfig, report: &FileReport) {
    let summary = &report.summary;
    println!();
    println!("RoadTrip");
    println!("========");
    println!("Input file name:        {}", input.display());
    println!("Input location points:  {}", report.records);
    println!("Output file names:      {}", report.kml_path.display());
    println!("                        {}", report.gpx_path.display());
    println!("Output track points:    {}", report.track_points);
    println!("Accepted points:        {}", summary.point_count);
    println!("Route segments:         {}", report.segments);
    println!("Config file name:       {}", config_path.display());
    println!("Trip start time:        {}", summary.start.format(TRIP_TIME_FORMAT));
    println!("Trip end time:          {}", summary.end.format(TRIP_TIME_FORMAT));
    println!("Top Speed:              {:.2}", summary.top_speed);
    println!("Average Speed:          {:.2}", summary.average_speed());
    println!("Highest Altitude:       {:.1}", summary.max_altitude);
    println!("Lowest Altitude:        {:.1}", summary.min_altitude);
    println!();
    println!("Speed Category              Time (mins)   % of Trip");
    let trip_seconds = summary.duration_seconds();
    for (band, &seconds) in config.bands.iter().zip(&report.band_seconds) {
        let share = if trip_seconds > 0.0 {
            seconds / trip_seconds * 100.0
        } else {
            0.0
        };
        println!(
            "   {:<28} {:>8.1}    {:>7.1}%",
            band.description,
            seconds / 60.0,
            share
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_names_keep_directory_and_swap_extension() {
        let kml = output_path(Path::new("/data/logs/gps.txt"), "kml");
        assert_eq!(kml, PathBuf::from("/data/logs/RoadTrip_gps.kml"));
        let gpx = output_path(Path::new("trip1.bin"), "gpx");
        assert_eq!(gpx, PathBuf::from("RoadTrip_trip1.gpx"));
    }

    #[test]
    fn extensionless_input_still_derives_names() {
        let kml = output_path(Path::new("gpslog"), "kml");
        assert_eq!(kml, PathBuf::from("RoadTrip_gpslog.kml"));
    }
}
