//! Speed bands and fix classification.

use serde::{Deserialize, Serialize};

/// One speed band: an exclusive upper bound on speed plus the styling
/// attached to route segments driven in that band.
///
/// The bound of the final band is never consulted; it catches everything
/// the earlier bands did not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpeedBand {
    pub bound: f64,
    pub label: String,
    pub description: String,
    pub line_color: String,
    pub font_color: String,
}

impl SpeedBand {
    pub fn new(
        bound: f64,
        label: &str,
        description: &str,
        line_color: &str,
        font_color: &str,
    ) -> Self {
        SpeedBand {
            bound,
            label: label.to_string(),
            description: description.to_string(),
            line_color: line_color.to_string(),
            font_color: font_color.to_string(),
        }
    }
}

/// Classifies a speed into its band index: the smallest `i` with
/// `speed < bands[i].bound`, or the last band when no bound matches.
pub fn speed_category(speed: f64, bands: &[SpeedBand]) -> usize {
    debug_assert!(!bands.is_empty());
    let last = bands.len().saturating_sub(1);
    bands[..last]
        .iter()
        .position(|band| speed < band.bound)
        .unwrap_or(last)
}

/// Returns true when the band list can drive classification: at least two
/// bands, with strictly ascending bounds on every band but the catch-all.
pub fn bands_are_ordered(bands: &[SpeedBand]) -> bool {
    if bands.len() < 2 {
        return false;
    }
    bands[..bands.len() - 1]
        .windows(2)
        .all(|pair| pair[0].bound < pair[1].bound)
}

/// The built-in band set used when no configuration file can be read.
pub fn default_bands() -> Vec<SpeedBand> {
    vec![
        SpeedBand::new(3.0, "STOP", "Stopped - 3km/hr or less", "00ffffff", "000000"),
        SpeedBand::new(25.0, "JAM", "Traffic Jam - 25km/hr or less", "ff000000", "000000"),
        SpeedBand::new(55.0, "SLOW", "Slow - 55km/hr or less", "ff006f38", "336600"),
        SpeedBand::new(85.0, "RESTRICTED", "Restricted - 85km/hr or less", "a6ffaa55", "6699ff"),
        SpeedBand::new(105.0, "FAST", "Fast - 105km/hr or less", "a67f0000", "000066"),
        SpeedBand::new(999.0, "SPEED", "Speeding - Greater than 105km/hr", "a60000ff", "ff0000"),
    ]
}
