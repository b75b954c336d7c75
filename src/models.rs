//! Data models for GeoJSON earthquake feeds.
//!
//! The wire structures mirror the USGS summary feed format. Every optional
//! field is read leniently: a missing or malformed value becomes `None`
//! instead of failing the whole collection.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::FetchError;

/// Deserialize any JSON value into `T`, mapping type mismatches to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// Top-level GeoJSON response.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCollection {
    /// Always "FeatureCollection"
    #[serde(rename = "type")]
    pub type_: String,

    /// Feed metadata
    #[serde(default, deserialize_with = "lenient")]
    pub metadata: Option<Metadata>,

    /// Earthquake events
    #[serde(default)]
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Validate the response structure.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.type_ != "FeatureCollection" {
            return Err(FetchError::InvalidResponse(format!(
                "expected type 'FeatureCollection', got '{}'",
                self.type_
            )));
        }
        Ok(())
    }

    /// Convert into a batch of renderable events.
    ///
    /// Features without an id or without usable coordinates are skipped, as
    /// are later repeats of an id already in the batch.
    #[must_use]
    pub fn into_events(self) -> Vec<SeismicEvent> {
        let mut seen = HashSet::with_capacity(self.features.len());
        let mut events = Vec::with_capacity(self.features.len());

        for feature in self.features {
            match SeismicEvent::try_from(feature) {
                Ok(event) => {
                    if seen.insert(event.id.clone()) {
                        events.push(event);
                    } else {
                        debug!(id = %event.id, "dropping duplicate event id");
                    }
                }
                Err(reason) => warn!("skipping feature: {reason}"),
            }
        }

        events
    }
}

/// Metadata about the feed response.
#[derive(Debug, Clone, Deserialize)]
pub struct Metadata {
    /// Human-readable title
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,

    /// Number of events in response
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<usize>,
}

/// A single feature as it appears on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct Feature {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub geometry: Option<Geometry>,

    #[serde(default, deserialize_with = "lenient")]
    pub properties: Option<Properties>,
}

/// Point geometry for an event.
#[derive(Debug, Clone, Deserialize)]
pub struct Geometry {
    /// Coordinates: [longitude, latitude, depth_km]
    #[serde(default)]
    pub coordinates: Vec<Value>,
}

impl Geometry {
    fn component(&self, index: usize) -> Option<f64> {
        self.coordinates
            .get(index)
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
    }
}

/// The subset of feed properties the map uses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Properties {
    #[serde(default, deserialize_with = "lenient")]
    pub mag: Option<f64>,

    #[serde(default, deserialize_with = "lenient")]
    pub place: Option<String>,

    /// Event time (ms since epoch)
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<i64>,

    /// Event page URL
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

/// Geographic position in map order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A normalized earthquake record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeismicEvent {
    pub id: String,
    pub magnitude: Option<f64>,
    pub place: String,
    pub time_millis: i64,
    pub depth_km: Option<f64>,
    pub coordinates: Coordinates,
    pub details_url: String,
}

impl SeismicEvent {
    /// Get the event time as a `DateTime<Utc>`.
    #[must_use]
    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.time_millis).single()
    }
}

impl TryFrom<Feature> for SeismicEvent {
    type Error = String;

    fn try_from(feature: Feature) -> Result<Self, Self::Error> {
        let id = feature
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "missing event id".to_string())?;

        let geometry = feature
            .geometry
            .ok_or_else(|| format!("{id}: missing geometry"))?;
        let (Some(longitude), Some(latitude)) = (geometry.component(0), geometry.component(1))
        else {
            return Err(format!("{id}: unusable coordinates"));
        };

        let properties = feature.properties.unwrap_or_default();

        Ok(Self {
            magnitude: properties.mag.filter(|m| m.is_finite()),
            place: properties.place.unwrap_or_default(),
            time_millis: properties.time.unwrap_or_default(),
            depth_km: geometry.component(2),
            coordinates: Coordinates {
                latitude,
                longitude,
            },
            details_url: properties.url.unwrap_or_default(),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../fixtures/sample_day.geojson");

    fn parse(json: &str) -> FeatureCollection {
        serde_json::from_str(json).expect("failed to parse collection")
    }

    #[test]
    fn test_parse_sample_feed() {
        let feed = parse(SAMPLE);
        feed.validate().expect("invalid feed");

        let events = feed.into_events();
        assert_eq!(events.len(), 3);

        let first = &events[0];
        assert_eq!(first.id, "us7000abcd");
        assert_eq!(first.magnitude, Some(5.2));
        assert_eq!(first.place, "45 km SSW of Hualien City, Taiwan");
        assert_eq!(first.time_millis, 1_760_745_600_000);
        assert_eq!(first.depth_km, Some(10.0));
        assert!(first.details_url.starts_with("https://"));

        assert_eq!(events[1].magnitude, None);
    }

    #[test]
    fn test_coordinates_are_swapped() {
        let events = parse(SAMPLE).into_events();
        let c = events[0].coordinates;
        assert!((c.latitude - 23.61).abs() < 1e-9);
        assert!((c.longitude - 121.42).abs() < 1e-9);
    }

    #[test]
    fn test_every_event_has_finite_coordinates() {
        for event in parse(SAMPLE).into_events() {
            assert!(event.coordinates.latitude.is_finite());
            assert!(event.coordinates.longitude.is_finite());
        }
    }

    #[test]
    fn test_malformed_optional_fields_are_tolerated() {
        let json = r#"{
            "type": "FeatureCollection",
            "metadata": "not an object",
            "features": [{
                "type": "Feature",
                "id": "ak1",
                "properties": {"mag": "big", "place": 42, "time": "noon", "url": null},
                "geometry": {"type": "Point", "coordinates": [-150.1, 61.2]}
            }]
        }"#;
        let feed = parse(json);
        assert!(feed.metadata.is_none());

        let events = feed.into_events();
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.magnitude, None);
        assert_eq!(event.place, "");
        assert_eq!(event.time_millis, 0);
        assert_eq!(event.depth_km, None);
        assert_eq!(event.details_url, "");
    }

    #[test]
    fn test_unrenderable_features_do_not_fail_batch() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"id": "a", "properties": {"mag": 1.0}, "geometry": null},
                {"id": "b", "properties": {"mag": 1.0}, "geometry": {"coordinates": ["x", 3.0, 1.0]}},
                {"properties": {"mag": 1.0}, "geometry": {"coordinates": [1.0, 2.0, 3.0]}},
                {"id": "c", "properties": null, "geometry": {"coordinates": [1.0, 2.0, 3.0]}}
            ]
        }"#;
        let events = parse(json).into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "c");
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let json = r#"{
            "type": "FeatureCollection",
            "features": [
                {"id": "dup", "properties": {"mag": 1.5}, "geometry": {"coordinates": [1.0, 2.0, 3.0]}},
                {"id": "dup", "properties": {"mag": 4.5}, "geometry": {"coordinates": [1.0, 2.0, 3.0]}}
            ]
        }"#;
        let events = parse(json).into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].magnitude, Some(1.5));
    }

    #[test]
    fn test_wrong_collection_type_rejected() {
        let feed = parse(r#"{"type": "Feature", "features": []}"#);
        assert!(matches!(
            feed.validate(),
            Err(FetchError::InvalidResponse(_))
        ));
    }
}
