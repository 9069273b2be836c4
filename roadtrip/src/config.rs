//! Run configuration, read from a line-oriented `key=value` file.
//!
//! Recognized keys (matched case-insensitively) are `longitudevariance`,
//! `latitudevariance`, `numbands` and `speedband`. Every other line,
//! section headers and `:` comments included, is ignored. A missing file
//! is created with documented defaults; an unreadable or inconsistent
//! file falls back to the built-in defaults rather than aborting the run.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bands::{bands_are_ordered, default_bands, SpeedBand};
use crate::{Result, TraceError};

const KEY_LON_VARIANCE: &str = "longitudevariance";
const KEY_LAT_VARIANCE: &str = "latitudevariance";
const KEY_NUM_BANDS: &str = "numbands";
const KEY_SPEED_BAND: &str = "speedband";

const DEFAULT_VARIANCE: f64 = 0.0004;

/// Settings for one conversion run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum plausible latitude change, in degrees per second.
    pub lat_variance: f64,
    /// Maximum plausible longitude change, in degrees per second.
    pub lon_variance: f64,
    /// Speed bands, ascending by bound, last one the catch-all.
    pub bands: Vec<SpeedBand>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            lat_variance: DEFAULT_VARIANCE,
            lon_variance: DEFAULT_VARIANCE,
            bands: default_bands(),
        }
    }
}

/// Loads the configuration file, creating it with default contents when
/// absent. Any failure to read or parse falls back to [`RunConfig::default`].
pub fn load_or_default(path: &Path) -> RunConfig {
    if !path.exists() {
        info!("configuration file {} does not exist, creating it", path.display());
        if let Err(err) = write_default_file(path) {
            warn!("could not create {}: {err}", path.display());
        }
    }
    let parsed = fs::read_to_string(path)
        .map_err(TraceError::from)
        .and_then(|text| parse_config(&text));
    match parsed {
        Ok(config) => config,
        Err(err) => {
            warn!("error processing configuration file {}: {err}; using default values", path.display());
            RunConfig::default()
        }
    }
}

/// Parses configuration text. `numbands` declares how many `speedband`
/// lines are honored; lines beyond the declared count, or ahead of the
/// declaration, are ignored.
pub fn parse_config(text: &str) -> Result<RunConfig> {
    let mut config = RunConfig::default();
    let mut declared: Option<usize> = None;
    let mut bands: Vec<SpeedBand> = Vec::new();

    for line in text.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        match key.to_lowercase().as_str() {
            KEY_LON_VARIANCE => config.lon_variance = parse_number(key, value)?,
            KEY_LAT_VARIANCE => config.lat_variance = parse_number(key, value)?,
            KEY_NUM_BANDS => {
                let count = value.trim().parse::<usize>().map_err(|_| {
                    TraceError::Config(format!("{key}: {value:?} is not a count"))
                })?;
                declared = Some(count);
            }
            KEY_SPEED_BAND => {
                if bands.len() < declared.unwrap_or(0) {
                    bands.push(parse_band(value)?);
                }
            }
            _ => {}
        }
    }

    if let Some(count) = declared {
        if bands.len() != count {
            return Err(TraceError::Config(format!(
                "{} speed bands declared but {} defined",
                count,
                bands.len()
            )));
        }
    }
    if !bands_are_ordered(&bands) {
        return Err(TraceError::Config(
            "speed bands must be at least two, sorted ascending by bound".into(),
        ));
    }
    config.bands = bands;
    Ok(config)
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| TraceError::Config(format!("{key}: {value:?} is not a number")))
}

/// One `speedband` value: `bound,label,description,lineColor[,fontColor]`.
/// The font color defaults to black; fields past the fifth are ignored.
fn parse_band(value: &str) -> Result<SpeedBand> {
    let fields: Vec<&str> = value.split(',').collect();
    if fields.len() < 4 {
        return Err(TraceError::Config(format!(
            "speedband {value:?} needs bound, label, description and line color"
        )));
    }
    let bound = fields[0].trim().parse::<f64>().map_err(|_| {
        TraceError::Config(format!("speedband bound {:?} is not a number", fields[0]))
    })?;
    let font_color = fields.get(4).copied().unwrap_or("000000");
    Ok(SpeedBand::new(bound, fields[1], fields[2], fields[3], font_color))
}

/// Contents written when the configuration file does not exist yet.
const DEFAULT_FILE: &str = "\
[Comments]
: LongitudeVariance - Degrees per second. Used to ignore longitude jumps greater than this variance
: LatitudeVariance - Degrees per second. Used to ignore latitude jumps greater than this variance
: Note: 1 (degree) latitude = 111.12 kilometers or 69.047 miles
:       so .00027 (degrees per second) = 112ish km/hr
: Speedband=[Speed],[Label],[Description],[Colour],[Font Colour]
: Speed -       Speedbands must be sorted in order of speed. The last band is the catch-all.
: Label -       Providing a label makes reading the KML file easier only
: Description - The description for the speedband is displayed in GoogleEarth
: Colour -      The colour of the speed band line, as an aabbggrr KML colour code
: FontColour -  HTML colour code for the band description in the KML file.
:               If no colour code is provided the font colour defaults to black

[Processing]
LONGITUDEVARIANCE=0.0004
LATITUDEVARIANCE=0.0004

[LineStyle]
NUMBANDS=6
SPEEDBAND=3,STOP,Stopped - 3km/hr or less,00ffffff,000000
SPEEDBAND=25,JAM,Traffic Jam - 25km/hr or less,ff000000,000000
SPEEDBAND=55,SLOW,Slow - 55km/hr or less,ff006f38,336600
SPEEDBAND=85,RESTRICTED,Restricted - 85km/hr or less,a6ffaa55,6699ff
SPEEDBAND=105,FAST,Fast - 105km/hr or less,a67f0000,000066
SPEEDBAND=999,SPEED,Speeding - Greater than 105km/hr,a60000ff,ff0000
";

pub fn write_default_file(path: &Path) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_FILE.as_bytes())
}
