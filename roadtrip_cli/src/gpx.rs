//! GPX waypoint track writer.
//!
//! One `trk`/`trkseg` pair per route segment, each vertex a timestamped
//! `trkpt`, with the covered bounding box appended at the end.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use roadtrip::{RawPoint, Result, Segment, TraceSink, TripSummary};

const UTC_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Clone, Copy, Debug)]
struct Bounds {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl Bounds {
    fn seed(point: &RawPoint) -> Self {
        Bounds {
            min_lat: point.latitude,
            max_lat: point.latitude,
            min_lon: point.longitude,
            max_lon: point.longitude,
        }
    }

    fn grow(&mut self, point: &RawPoint) {
        self.min_lat = self.min_lat.min(point.latitude);
        self.max_lat = self.max_lat.max(point.latitude);
        self.min_lon = self.min_lon.min(point.longitude);
        self.max_lon = self.max_lon.max(point.longitude);
    }
}

pub struct GpxWriter<W: Write> {
    out: W,
    bounds: Option<Bounds>,
    points: u64,
}

impl GpxWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(GpxWriter::new(BufWriter::new(file)))
    }
}

impl<W: Write> GpxWriter<W> {
    pub fn new(out: W) -> Self {
        GpxWriter {
            out,
            bounds: None,
            points: 0,
        }
    }

    /// Track points written so far.
    pub fn points(&self) -> u64 {
        self.points
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for GpxWriter<W> {
    fn on_run_start(&mut self) -> Result<()> {
        writeln!(self.out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(self.out, "<gpx")?;
        writeln!(self.out, "   version=\"1.0\"")?;
        writeln!(self.out, "   creator=\"RoadTrip\"")?;
        writeln!(self.out, "   xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"")?;
        writeln!(self.out, "   xmlns=\"http://www.topografix.com/GPX/1/0\"")?;
        writeln!(
            self.out,
            "   xsi:schemaLocation=\"http://www.topografix.com/GPX/1/0 http://www.topografix.com/GPX/1/0/gpx.xsd\">"
        )?;
        Ok(())
    }

    fn on_segment_start(&mut self, _category: usize, _point: &RawPoint) -> Result<()> {
        writeln!(self.out, "   <trk>")?;
        writeln!(self.out, "      <trkseg>")?;
        Ok(())
    }

    fn on_point(&mut self, point: &RawPoint) -> Result<()> {
        match &mut self.bounds {
            Some(bounds) => bounds.grow(point),
            None => self.bounds = Some(Bounds::seed(point)),
        }
        self.points += 1;

        writeln!(
            self.out,
            "         <trkpt lat=\"{:.6}\" lon=\"{:.6}\">",
            point.latitude, point.longitude
        )?;
        if let Some(time) = point.datetime() {
            writeln!(self.out, "            <time>{}</time>", time.format(UTC_TIME_FORMAT))?;
        }
        writeln!(self.out, "            <speed>{:.2}</speed>", point.speed)?;
        writeln!(self.out, "            <ele>{:.1}</ele>", point.altitude)?;
        writeln!(self.out, "         </trkpt>")?;
        Ok(())
    }

    fn on_segment_end(&mut self, _segment: &Segment) -> Result<()> {
        writeln!(self.out, "      </trkseg>")?;
        writeln!(self.out, "   </trk>")?;
        Ok(())
    }

    fn on_run_end(&mut self, _summary: &TripSummary, _band_seconds: &[f64]) -> Result<()> {
        if let Some(bounds) = self.bounds {
            writeln!(
                self.out,
                "   <bounds minlat=\"{:.6}\" minlon=\"{:.6}\" maxlat=\"{:.6}\" maxlon=\"{:.6}\"/>",
                bounds.min_lat, bounds.min_lon, bounds.max_lat, bounds.max_lon
            )?;
        }
        writeln!(self.out, "</gpx>")?;
        self.out.flush()?;
        Ok(())
    }
}
