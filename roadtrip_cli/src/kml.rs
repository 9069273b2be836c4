//! KML route overview writer.
//!
//! One `Placemark` per segment, styled by its speed band, with a trip
//! statistics table in the closing document description.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use roadtrip::{RawPoint, Result, Segment, SpeedBand, TraceSink, TripSummary};

const SEGMENT_TIME_FORMAT: &str = "%H:%M:%S";
const DOC_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S";

pub struct KmlWriter<W: Write> {
    out: W,
    bands: Vec<SpeedBand>,
    document_name: String,
    segments: u64,
}

impl KmlWriter<BufWriter<File>> {
    pub fn create(path: &Path, bands: Vec<SpeedBand>, document_name: String) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(KmlWriter::new(BufWriter::new(file), bands, document_name))
    }
}

impl<W: Write> KmlWriter<W> {
    pub fn new(out: W, bands: Vec<SpeedBand>, document_name: String) -> Self {
        KmlWriter {
            out,
            bands,
            document_name,
            segments: 0,
        }
    }

    /// Placemarks written so far.
    pub fn segments(&self) -> u64 {
        self.segments
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }

    fn band(&self, category: usize) -> &SpeedBand {
        &self.bands[category]
    }
}

impl<W: Write> TraceSink for KmlWriter<W> {
    fn on_run_start(&mut self) -> Result<()> {
        writeln!(self.out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
        writeln!(
            self.out,
            "<kml creator=\"RoadTrip\" xmlns=\"http://earth.google.com/kml/2.0\">"
        )?;
        writeln!(self.out, "  <Document>")?;
        writeln!(self.out, "    <name>{}</name>", self.document_name)?;
        for band in &self.bands {
            writeln!(self.out, "    <Style id=\"{}\">", band.label)?;
            writeln!(self.out, "      <LineStyle>")?;
            writeln!(self.out, "        <color>{}</color>", band.line_color)?;
            writeln!(self.out, "        <width>4</width>")?;
            writeln!(self.out, "      </LineStyle>")?;
            writeln!(self.out, "    </Style>")?;
        }
        Ok(())
    }

    fn on_segment_start(&mut self, category: usize, _point: &RawPoint) -> Result<()> {
        let band = &self.bands[category];
        writeln!(self.out, "    <Placemark>")?;
        writeln!(
            self.out,
            "      <name><![CDATA[<span style=\"color:#{}\">{}</span>]]></name>",
            band.font_color, band.description
        )?;
        writeln!(self.out, "      <styleUrl>#{}</styleUrl>", band.label)?;
        writeln!(self.out, "      <MultiGeometry>")?;
        writeln!(self.out, "      <LineString>")?;
        writeln!(self.out, "        <extrude>0</extrude>")?;
        writeln!(self.out, "        <tessellate>1</tessellate>")?;
        writeln!(self.out, "        <altitudeMode>clampedToGround</altitudeMode>")?;
        writeln!(self.out, "        <coordinates>")?;
        Ok(())
    }

    fn on_point(&mut self, point: &RawPoint) -> Result<()> {
        writeln!(
            self.out,
            "         {:.6},{:.6},{:.1}",
            point.longitude, point.latitude, point.altitude
        )?;
        Ok(())
    }

    fn on_segment_end(&mut self, segment: &Segment) -> Result<()> {
        self.segments += 1;
        writeln!(self.out, "        </coordinates>")?;
        writeln!(self.out, "      </LineString>")?;
        writeln!(self.out, "      </MultiGeometry>")?;
        writeln!(self.out, "      <description><![CDATA[")?;
        writeln!(
            self.out,
            "Time:       {} - {}",
            segment.start.format(SEGMENT_TIME_FORMAT),
            segment.end.format(SEGMENT_TIME_FORMAT)
        )?;
        writeln!(
            self.out,
            "<BR>Traveling Time:    {} seconds",
            segment.duration_seconds()
        )?;
        writeln!(
            self.out,
            "<BR>Speed:       {:.2} - {:.2}",
            segment.min_speed, segment.max_speed
        )?;
        writeln!(self.out, "<BR>Average Speed:       {:.2}", segment.average_speed())?;
        writeln!(
            self.out,
            "<BR>Altitude:       {:.1} - {:.1}",
            segment.min_altitude, segment.max_altitude
        )?;
        writeln!(self.out, "      ]]></description>")?;
        writeln!(self.out, "    </Placemark>")?;
        Ok(())
    }

    fn on_run_end(&mut self, summary: &TripSummary, band_seconds: &[f64]) -> Result<()> {
        let trip_seconds = summary.duration_seconds();
        writeln!(self.out, "    <description>")?;
        writeln!(self.out, "    <![CDATA[")?;
        writeln!(self.out, "    GPS trace converted by RoadTrip.")?;
        writeln!(self.out, "<TABLE cellspacing=0 cellpadding=0>")?;
        writeln!(
            self.out,
            "<TR><TD>Trip start time:</TD><TD align=right colspan=\"2\">{}</TD></TR>",
            summary.start.format(DOC_TIME_FORMAT)
        )?;
        writeln!(
            self.out,
            "<TR><TD>Trip end time:</TD><TD align=right colspan=\"2\">{}</TD></TR>",
            summary.end.format(DOC_TIME_FORMAT)
        )?;
        writeln!(
            self.out,
            "<TR><TD>Traveling time:</TD><TD align=right colspan=\"2\">{:.0} minutes</TD></TR>",
            trip_seconds / 60.0
        )?;
        writeln!(self.out, "<TR><TD></TD><TD colspan=\"2\"></TD></TR>")?;
        writeln!(
            self.out,
            "<TR><TD>Speed Category</TD><TD align=right>Traveling Time (mins)</TD><TD align=right>% of Trip</TD></TR>"
        )?;
        for (band, &seconds) in self.bands.iter().zip(band_seconds) {
            let share = if trip_seconds > 0.0 {
                seconds / trip_seconds * 100.0
            } else {
                0.0
            };
            writeln!(
                self.out,
                "<TR><TD>&nbsp;&nbsp;&nbsp;{}</TD><TD align=right>{:.1}</TD><TD align=right>{:.1}%</TD></TR>",
                band.description,
                seconds / 60.0,
                share
            )?;
        }
        writeln!(
            self.out,
            "<TR><TD>&nbsp;&nbsp;&nbsp;Signal Loss</TD><TD></TD><TD></TD></TR>"
        )?;
        writeln!(self.out, "<TR><TD></TD><TD colspan=\"2\"></TD></TR>")?;
        writeln!(
            self.out,
            "<TR><TD>Top Speed:</TD><TD align=right colspan=\"2\">{:.2}</TD></TR>",
            summary.top_speed
        )?;
        writeln!(
            self.out,
            "<TR><TD>Average Speed:</TD><TD align=right colspan=\"2\">{:.2}</TD></TR>",
            summary.average_speed()
        )?;
        writeln!(self.out, "<TR><TD></TD><TD colspan=\"2\"></TD></TR>")?;
        writeln!(
            self.out,
            "<TR><TD>Highest Altitude:</TD><TD align=right colspan=\"2\">{:.1}</TD></TR>",
            summary.max_altitude
        )?;
        writeln!(
            self.out,
            "<TR><TD>Lowest Altitude:</TD><TD align=right colspan=\"2\">{:.1}</TD></TR>",
            summary.min_altitude
        )?;
        writeln!(self.out, "</TABLE>")?;
        writeln!(self.out, "    ]]>")?;
        writeln!(self.out, "  </description>")?;
        writeln!(self.out, "  </Document>")?;
        writeln!(self.out, "</kml>")?;
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, second)
            .unwrap()
    }

    fn bands() -> Vec<SpeedBand> {
        vec![
            SpeedBand::new(3.0, "STOP", "Stopped", "00ffffff", "000000"),
            SpeedBand::new(999.0, "GO", "Going", "ff000000", "6699ff"),
        ]
    }

    fn point() -> RawPoint {
        RawPoint {
            year: 2009,
            month: 6,
            day: 1,
            hour: 12,
            minute: 0,
            second: 0,
            latitude: 10.0001,
            longitude: 20.0002,
            altitude: 70.0,
            speed: 45.0,
            bearing: 0.0,
        }
    }

    fn segment() -> Segment {
        Segment {
            category: 1,
            start: at(0),
            end: at(30),
            min_speed: 40.0,
            max_speed: 50.0,
            min_altitude: 65.0,
            max_altitude: 80.0,
            speed_sum: 90.0,
            point_count: 2,
        }
    }

    fn summary() -> TripSummary {
        TripSummary {
            start: at(0),
            end: at(40),
            top_speed: 50.0,
            min_altitude: 65.0,
            max_altitude: 80.0,
            speed_sum: 90.0,
            point_count: 2,
        }
    }

    fn render() -> String {
        let mut writer = KmlWriter::new(Vec::new(), bands(), "RoadTrip_gps.kml".to_string());
        writer.on_run_start().unwrap();
        writer.on_segment_start(1, &point()).unwrap();
        writer.on_point(&point()).unwrap();
        writer.on_segment_end(&segment()).unwrap();
        writer.on_run_end(&summary(), &[10.0, 30.0]).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn document_brackets_are_balanced() {
        let text = render();
        assert!(text.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(text.ends_with("</kml>\n"));
        assert_eq!(text.matches("<Placemark>").count(), 1);
        assert_eq!(text.matches("</Placemark>").count(), 1);
        assert_eq!(text.matches("<coordinates>").count(), 1);
        assert_eq!(text.matches("</coordinates>").count(), 1);
        assert_eq!(text.matches("<Document>").count(), 1);
    }

    #[test]
    fn every_band_gets_a_style() {
        let text = render();
        assert!(text.contains("<Style id=\"STOP\">"));
        assert!(text.contains("<Style id=\"GO\">"));
        assert!(text.contains("<color>ff000000</color>"));
        assert!(text.contains("<width>4</width>"));
    }

    #[test]
    fn placemark_carries_band_styling() {
        let text = render();
        assert!(text.contains("<styleUrl>#GO</styleUrl>"));
        assert!(text.contains("<span style=\"color:#6699ff\">Going</span>"));
        assert!(text.contains("<altitudeMode>clampedToGround</altitudeMode>"));
    }

    #[test]
    fn coordinates_are_lon_lat_alt() {
        let text = render();
        assert!(text.contains("         20.000200,10.000100,70.0"));
    }

    #[test]
    fn segment_description_reports_statistics() {
        let text = render();
        assert!(text.contains("Time:       12:00:00 - 12:00:30"));
        assert!(text.contains("<BR>Traveling Time:    30 seconds"));
        assert!(text.contains("<BR>Speed:       40.00 - 50.00"));
        assert!(text.contains("<BR>Average Speed:       45.00"));
        assert!(text.contains("<BR>Altitude:       65.0 - 80.0"));
    }

    #[test]
    fn trip_table_reports_band_shares() {
        let text = render();
        // 10 of 40 seconds in STOP, 30 of 40 in GO
        assert!(text.contains("&nbsp;&nbsp;&nbsp;Stopped</TD><TD align=right>0.2</TD><TD align=right>25.0%"));
        assert!(text.contains("&nbsp;&nbsp;&nbsp;Going</TD><TD align=right>0.5</TD><TD align=right>75.0%"));
        assert!(text.contains("<TR><TD>Top Speed:</TD><TD align=right colspan=\"2\">50.00</TD></TR>"));
        assert!(text.contains("<TR><TD>Average Speed:</TD><TD align=right colspan=\"2\">45.00</TD></TR>"));
    }

    #[test]
    fn segment_count_tracks_closed_placemarks() {
        let mut writer = KmlWriter::new(Vec::new(), bands(), "RoadTrip_gps.kml".to_string());
        writer.on_run_start().unwrap();
        writer.on_segment_start(1, &point()).unwrap();
        writer.on_point(&point()).unwrap();
        writer.on_segment_end(&segment()).unwrap();
        assert_eq!(writer.segments(), 1);
    }

    #[test]
    fn zero_length_trip_has_no_percentages_blowup() {
        let mut writer = KmlWriter::new(Vec::new(), bands(), "RoadTrip_one.kml".to_string());
        writer.on_run_start().unwrap();
        writer.on_segment_start(0, &point()).unwrap();
        writer.on_point(&point()).unwrap();
        let mut segment = segment();
        segment.end = segment.start;
        writer.on_segment_end(&segment).unwrap();
        let mut summary = summary();
        summary.end = summary.start;
        writer.on_run_end(&summary, &[0.0, 0.0]).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        assert!(text.contains("0.0%"));
        assert!(!text.contains("NaN"));
    }
}
