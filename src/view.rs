//! HTML fragments and marker data for the map page.
//!
//! The page shell lives in `server.rs`; everything here is rendered from an
//! [`EventStore`] and swapped in by HTMX or fed to Leaflet as JSON.

use std::fmt::{Display, Write as _};

use chrono::TimeZone;
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;

use crate::bands::{MagnitudeBand, marker_radius};
use crate::client::TimeRange;
use crate::filters::{MIN_MAGNITUDE_CEILING, MIN_MAGNITUDE_FLOOR};
use crate::models::SeismicEvent;
use crate::store::EventStore;

/// Group an integer with comma thousands separators.
#[must_use]
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// One decimal place, or `?` when unknown.
#[must_use]
pub fn format_magnitude(mag: Option<f64>) -> String {
    mag.map_or_else(|| "?".into(), |m| format!("{m:.1}"))
}

/// Event time in the given zone, or "Unknown time".
#[must_use]
pub fn format_event_time<Tz>(event: &SeismicEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    event.time().map_or_else(
        || "Unknown time".into(),
        |t| {
            t.with_timezone(tz)
                .format("%Y-%m-%d %H:%M:%S %Z")
                .to_string()
        },
    )
}

/// A circle marker as consumed by the page script.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub color: &'static str,
    pub popup: String,
}

impl Marker {
    pub fn new<Tz>(event: &SeismicEvent, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            id: event.id.clone(),
            latitude: event.coordinates.latitude,
            longitude: event.coordinates.longitude,
            radius: marker_radius(event.magnitude),
            color: MagnitudeBand::for_magnitude(event.magnitude).color(),
            popup: render_popup(event, tz),
        }
    }
}

/// Markers for the currently visible events.
pub fn markers<Tz>(store: &EventStore, tz: &Tz) -> Vec<Marker>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    store
        .filtered()
        .into_iter()
        .map(|event| Marker::new(event, tz))
        .collect()
}

/// Popup body for one event.
pub fn render_popup<Tz>(event: &SeismicEvent, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let color = MagnitudeBand::for_magnitude(event.magnitude).color();
    let place = if event.place.is_empty() {
        "Unknown location"
    } else {
        event.place.as_str()
    };
    let depth = event
        .depth_km
        .map_or_else(|| "unknown".into(), |d| format!("{d:.1} km"));

    let mut html = format!(
        r#"<div class="popup">
  <div class="popup-mag" style="color: {color}">M {mag}</div>
  <div class="popup-place">{place}</div>
  <div class="popup-row">Depth: {depth}</div>
  <div class="popup-row">{time}</div>"#,
        mag = format_magnitude(event.magnitude),
        place = encode_text(place),
        time = encode_text(&format_event_time(event, tz)),
    );

    if !event.details_url.is_empty() {
        let _ = write!(
            html,
            r#"
  <a class="popup-link" href="{}" target="_blank" rel="noopener">Details</a>"#,
            encode_double_quoted_attribute(&event.details_url)
        );
    }

    html.push_str("\n</div>");
    html
}

/// Header statistics fragment.
#[must_use]
pub fn render_header(store: &EventStore) -> String {
    let stats = store.stats();
    format!(
        r#"<div class="stat">
  <span class="stat-value">{count}</span>
  <span class="stat-label">earthquakes</span>
</div>
<div class="stat">
  <span class="stat-value">{max:.1}</span>
  <span class="stat-label">max magnitude</span>
</div>
<div class="stat">
  <span class="stat-value">{avg:.2}</span>
  <span class="stat-label">avg magnitude</span>
</div>
<div class="stat">
  <span class="stat-value">{range}</span>
  <span class="stat-label">window</span>
</div>"#,
        count = format_thousands(stats.count),
        max = stats.max_magnitude,
        avg = stats.average_magnitude,
        range = store.view().time_range.label(),
    )
}

/// Sidebar controls: time range, magnitude slider, reset and refresh.
#[must_use]
pub fn render_controls(store: &EventStore) -> String {
    let view = store.view();

    let options: String = TimeRange::ALL
        .iter()
        .map(|range| {
            let selected = if *range == view.time_range {
                " selected"
            } else {
                ""
            };
            format!(
                r#"<option value="{}"{selected}>{}</option>"#,
                range.as_str(),
                range.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n      ");

    format!(
        r##"<form id="controls" class="controls" onsubmit="return false">
  <label class="control-label" for="range">Time range</label>
  <select id="range" name="range" class="control-select"
          hx-post="/controls/range" hx-trigger="change" hx-swap="none">
      {options}
  </select>

  <label class="control-label" for="min-magnitude">
    Minimum magnitude <output id="min-magnitude-value">{min:.1}</output>
  </label>
  <input type="range" id="min-magnitude" name="min_magnitude"
         min="{floor}" max="{ceiling}" step="0.1" value="{min:.1}"
         hx-post="/controls/min-magnitude" hx-trigger="input changed delay:100ms" hx-swap="none"
         oninput="document.getElementById('min-magnitude-value').value = Number(this.value).toFixed(1)">

  <div class="control-actions">
    <button type="button" class="btn btn-ghost"
            hx-post="/controls/reset" hx-target="#controls" hx-swap="outerHTML">Reset</button>
    <button type="button" class="btn btn-primary"
            hx-post="/controls/refresh" hx-swap="none">Refresh</button>
  </div>
</form>"##,
        min = view.min_magnitude,
        floor = MIN_MAGNITUDE_FLOOR,
        ceiling = MIN_MAGNITUDE_CEILING,
    )
}

/// Loading and error banners. Empty when idle and healthy.
#[must_use]
pub fn render_status(store: &EventStore) -> String {
    let mut html = String::new();
    if store.loading() {
        html.push_str(
            r#"<div class="banner banner-loading"><span class="status-dot"></span>Loading earthquakes...</div>"#,
        );
    }
    if let Some(error) = store.error() {
        let _ = write!(
            html,
            r#"<div class="banner banner-error" role="alert">{}</div>"#,
            encode_text(error)
        );
    }
    html
}

/// Static legend of magnitude bands.
#[must_use]
pub fn render_legend() -> String {
    let rows: Vec<String> = MagnitudeBand::ALL
        .iter()
        .map(|band| {
            format!(
                r#"<li class="legend-row"><span class="legend-swatch" style="background: {}"></span>{}</li>"#,
                band.color(),
                encode_text(band.range_label())
            )
        })
        .collect();
    format!(
        "<ul class=\"legend\">\n  {}\n</ul>",
        rows.join("\n  ")
    )
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, Utc};

    use super::*;
    use crate::models::Coordinates;

    fn event(id: &str, magnitude: Option<f64>) -> SeismicEvent {
        SeismicEvent {
            id: id.into(),
            magnitude,
            place: "10 km N of Somewhere".into(),
            time_millis: 1_760_745_600_000,
            depth_km: Some(12.34),
            coordinates: Coordinates {
                latitude: 23.61,
                longitude: 121.42,
            },
            details_url: "https://earthquake.usgs.gov/earthquakes/eventpage/x".into(),
        }
    }

    fn loaded(events: Vec<SeismicEvent>) -> EventStore {
        let mut store = EventStore::default();
        let ticket = store.begin_load(TimeRange::Day);
        store.commit(ticket, Ok(events));
        store
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(12_345), "12,345");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn test_format_magnitude() {
        assert_eq!(format_magnitude(Some(5.24)), "5.2");
        assert_eq!(format_magnitude(Some(3.0)), "3.0");
        assert_eq!(format_magnitude(None), "?");
    }

    #[test]
    fn test_event_time_in_zone() {
        let e = event("a", Some(1.0));
        assert_eq!(format_event_time(&e, &Utc), "2025-10-18 00:00:00 UTC");

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(format_event_time(&e, &tokyo), "2025-10-18 09:00:00 +09:00");
    }

    #[test]
    fn test_marker_from_event() {
        let marker = Marker::new(&event("a", Some(5.2)), &Utc);
        assert_eq!(marker.id, "a");
        assert!((marker.latitude - 23.61).abs() < 1e-9);
        assert!((marker.longitude - 121.42).abs() < 1e-9);
        assert!((marker.radius - 15.6).abs() < 1e-9);
        assert_eq!(marker.color, "#f97316");
    }

    #[test]
    fn test_popup_contents() {
        let popup = render_popup(&event("a", Some(4.4)), &Utc);
        assert!(popup.contains("M 4.4"));
        assert!(popup.contains("10 km N of Somewhere"));
        assert!(popup.contains("Depth: 12.3 km"));
        assert!(popup.contains("2025-10-18 00:00:00 UTC"));
        assert!(popup.contains(r#"href="https://earthquake.usgs.gov/earthquakes/eventpage/x""#));
    }

    #[test]
    fn test_popup_escapes_place_and_handles_gaps() {
        let mut e = event("a", None);
        e.place = "<script>alert(1)</script>".into();
        e.depth_km = None;
        e.details_url = String::new();

        let popup = render_popup(&e, &Utc);
        assert!(!popup.contains("<script>"));
        assert!(popup.contains("&lt;script&gt;"));
        assert!(popup.contains("M ?"));
        assert!(popup.contains("Depth: unknown"));
        assert!(!popup.contains("href="));
    }

    #[test]
    fn test_markers_follow_threshold() {
        let mut store = loaded(vec![event("a", Some(5.2)), event("b", None), event("c", Some(2.1))]);
        assert_eq!(markers(&store, &Utc).len(), 3);

        store.set_min_magnitude(3.0).unwrap();
        let visible = markers(&store, &Utc);
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, "a");
    }

    #[test]
    fn test_header_shows_stats() {
        let store = loaded(vec![event("a", Some(5.2)), event("b", None), event("c", Some(2.1))]);
        let header = render_header(&store);
        assert!(header.contains(r#"<span class="stat-value">3</span>"#));
        assert!(header.contains(r#"<span class="stat-value">5.2</span>"#));
        assert!(header.contains(r#"<span class="stat-value">2.43</span>"#));
        assert!(header.contains("Past day"));
    }

    #[test]
    fn test_header_empty_is_zero() {
        let header = render_header(&EventStore::default());
        assert!(header.contains(r#"<span class="stat-value">0</span>"#));
        assert!(header.contains(r#"<span class="stat-value">0.0</span>"#));
    }

    #[test]
    fn test_controls_reflect_view() {
        let mut store = EventStore::default();
        store.begin_load(TimeRange::Week);
        store.set_min_magnitude(2.5).unwrap();

        let controls = render_controls(&store);
        assert!(controls.contains(r#"<option value="week" selected>Past week</option>"#));
        assert!(controls.contains(r#"<option value="hour">Past hour</option>"#));
        assert!(controls.contains(r#"value="2.5""#));
        assert!(controls.contains(r#"min="0" max="7" step="0.1""#));
    }

    #[test]
    fn test_reset_button_swaps_controls() {
        let controls = render_controls(&EventStore::default());
        assert!(controls.starts_with(r#"<form id="controls""#));
        assert!(controls.contains(
            r##"hx-post="/controls/reset" hx-target="#controls" hx-swap="outerHTML">Reset</button>"##
        ));
        assert!(controls.contains(r#"hx-post="/controls/refresh" hx-swap="none">Refresh</button>"#));
        assert!(controls.trim_end().ends_with("</form>"));
    }

    #[test]
    fn test_status_banners() {
        let mut store = EventStore::default();
        assert!(render_status(&store).is_empty());

        let ticket = store.begin_load(TimeRange::Day);
        assert!(render_status(&store).contains("Loading"));

        store.commit(
            ticket,
            Err(crate::errors::FetchError::Status {
                status: 500,
                message: String::new(),
            }),
        );
        let status = render_status(&store);
        assert!(!status.contains("Loading"));
        assert!(status.contains("Could not load earthquakes"));
    }

    #[test]
    fn test_legend_lists_every_band() {
        let legend = render_legend();
        for band in MagnitudeBand::ALL {
            assert!(legend.contains(band.color()));
            assert!(legend.contains(&*encode_text(band.range_label())));
        }
    }
}
