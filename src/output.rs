//! Terminal rendering of the filtered view.
//!
//! Supports human-readable (with colors), JSON, and NDJSON formats.

use std::io::{self, Write};

use chrono::Local;

use crate::bands::MagnitudeBand;
use crate::client::TimeRange;
use crate::filters::DerivedStats;
use crate::models::SeismicEvent;
use crate::view::{format_event_time, format_magnitude, format_thousands};

// ANSI color codes
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const ICON_QUAKE: &str = "🌍";

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// Human-readable terminal output (default)
    #[default]
    Human,
    /// JSON array
    Json,
    /// Newline-delimited JSON (one object per line)
    Ndjson,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err(format!("unknown format: {s} (expected: human, json, ndjson)")),
        }
    }
}

/// Write the stats header shown above human output.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_summary<W: Write>(
    writer: &mut W,
    range: TimeRange,
    min_magnitude: f64,
    stats: &DerivedStats,
) -> io::Result<()> {
    writeln!(
        writer,
        "{BOLD}{ICON_QUAKE} {} earthquakes{RESET} {DIM}│ {} │ M{min_magnitude:.1}+ │ max {:.1} │ avg {:.2}{RESET}",
        format_thousands(stats.count),
        range.label(),
        stats.max_magnitude,
        stats.average_magnitude,
    )?;
    writeln!(
        writer,
        "{DIM}─────────────────────────────────────────────────────────────────────{RESET}"
    )
}

/// Write events in human-readable format, color-coded by magnitude band.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human<W: Write>(writer: &mut W, events: &[&SeismicEvent]) -> io::Result<()> {
    for event in events {
        let band = MagnitudeBand::for_magnitude(event.magnitude);
        let color = band.ansi();
        let label = band.severity();
        let mag = format_magnitude(event.magnitude);
        let depth = event
            .depth_km
            .map_or_else(|| "    ?".into(), |d| format!("{d:>5.0}"));
        let time = format_event_time(event, &Local);
        let place = if event.place.is_empty() {
            "Unknown location"
        } else {
            event.place.as_str()
        };

        writeln!(
            writer,
            "{color}{BOLD}M{mag:<4}{RESET} │ \
             {color}{label:8}{RESET} │ \
             {DIM}{depth}km{RESET} │ \
             {time} │ \
             {place}"
        )?;
    }
    Ok(())
}

/// Write events as a JSON array.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write>(writer: &mut W, events: &[&SeismicEvent]) -> io::Result<()> {
    let json = serde_json::to_string_pretty(events)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{json}")
}

/// Write events as newline-delimited JSON.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_ndjson<W: Write>(writer: &mut W, events: &[&SeismicEvent]) -> io::Result<()> {
    for event in events {
        let json = serde_json::to_string(event)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    Ok(())
}

/// Write events in the specified format.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_events<W: Write>(
    writer: &mut W,
    events: &[&SeismicEvent],
    format: Format,
) -> io::Result<()> {
    match format {
        Format::Human => write_human(writer, events),
        Format::Json => write_json(writer, events),
        Format::Ndjson => write_ndjson(writer, events),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn event(id: &str, magnitude: Option<f64>) -> SeismicEvent {
        SeismicEvent {
            id: id.into(),
            magnitude,
            place: "Off the coast".into(),
            time_millis: 1_760_745_600_000,
            depth_km: Some(35.0),
            coordinates: Coordinates {
                latitude: -33.4,
                longitude: -71.6,
            },
            details_url: String::new(),
        }
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("human".parse::<Format>().unwrap(), Format::Human);
        assert_eq!("json".parse::<Format>().unwrap(), Format::Json);
        assert_eq!("ndjson".parse::<Format>().unwrap(), Format::Ndjson);
        assert!("invalid".parse::<Format>().is_err());
    }

    #[test]
    fn test_ndjson_one_line_per_event() {
        let a = event("a", Some(6.1));
        let b = event("b", None);
        let mut out = Vec::new();
        write_events(&mut out, &[&a, &b], Format::Ndjson).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["id"], "a");
        assert_eq!(first["coordinates"]["latitude"], -33.4);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert!(second["magnitude"].is_null());
    }

    #[test]
    fn test_human_uses_band_color() {
        let a = event("a", Some(6.1));
        let mut out = Vec::new();
        write_human(&mut out, &[&a]).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains(MagnitudeBand::Major.ansi()));
        assert!(text.contains("M6.1"));
        assert!(text.contains("MAJOR"));
        assert!(text.contains("Off the coast"));
    }

    #[test]
    fn test_summary_line() {
        let stats = DerivedStats {
            count: 1234,
            max_magnitude: 5.2,
            average_magnitude: 2.4333,
        };
        let mut out = Vec::new();
        write_summary(&mut out, TimeRange::Week, 2.5, &stats).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("1,234 earthquakes"));
        assert!(text.contains("Past week"));
        assert!(text.contains("M2.5+"));
        assert!(text.contains("max 5.2"));
        assert!(text.contains("avg 2.43"));
    }
}
