//! Magnitude filtering and aggregate statistics.
//!
//! Everything here is a pure function of `(events, min_magnitude)` and is
//! recomputed on every read rather than maintained incrementally.

use serde::Serialize;

use crate::models::SeismicEvent;

/// Lowest selectable threshold.
pub const MIN_MAGNITUDE_FLOOR: f64 = 0.0;

/// Highest selectable threshold.
pub const MIN_MAGNITUDE_CEILING: f64 = 7.0;

/// Sort key for filtering and max-finding; absent magnitude never passes a
/// raised threshold and never wins a max.
fn ranking_magnitude(event: &SeismicEvent) -> f64 {
    event.magnitude.unwrap_or(f64::NEG_INFINITY)
}

/// Whether an event passes the threshold.
///
/// A threshold at or below the floor disables filtering, so events without
/// a magnitude stay visible until the slider is raised.
#[must_use]
pub fn passes(event: &SeismicEvent, min_magnitude: f64) -> bool {
    min_magnitude <= MIN_MAGNITUDE_FLOOR || ranking_magnitude(event) >= min_magnitude
}

/// Events at or above the threshold, in feed order.
#[must_use]
pub fn filter_events(events: &[SeismicEvent], min_magnitude: f64) -> Vec<&SeismicEvent> {
    events.iter().filter(|e| passes(e, min_magnitude)).collect()
}

/// Aggregate statistics for the filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DerivedStats {
    pub count: usize,
    pub max_magnitude: f64,
    pub average_magnitude: f64,
}

impl DerivedStats {
    /// Compute statistics over an already filtered set.
    ///
    /// Absent magnitudes are excluded from the max but count as 0 in the
    /// average. Both figures are 0 for an empty set.
    #[must_use]
    pub fn from_filtered(filtered: &[&SeismicEvent]) -> Self {
        let count = filtered.len();
        if count == 0 {
            return Self::default();
        }

        let max = filtered
            .iter()
            .map(|e| ranking_magnitude(e))
            .fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = filtered.iter().map(|e| e.magnitude.unwrap_or(0.0)).sum();

        #[allow(clippy::cast_precision_loss)]
        let average = sum / count as f64;

        Self {
            count,
            max_magnitude: if max.is_finite() { max } else { 0.0 },
            average_magnitude: average,
        }
    }

    /// Filter and compute in one step.
    #[must_use]
    pub fn compute(events: &[SeismicEvent], min_magnitude: f64) -> Self {
        Self::from_filtered(&filter_events(events, min_magnitude))
    }
}

/// Clamp a requested threshold into the slider range.
///
/// Returns `None` for NaN.
#[must_use]
pub fn clamp_min_magnitude(value: f64) -> Option<f64> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(MIN_MAGNITUDE_FLOOR, MIN_MAGNITUDE_CEILING))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinates;

    fn event(id: &str, magnitude: Option<f64>) -> SeismicEvent {
        SeismicEvent {
            id: id.into(),
            magnitude,
            place: String::new(),
            time_millis: 0,
            depth_km: None,
            coordinates: Coordinates {
                latitude: 0.0,
                longitude: 0.0,
            },
            details_url: String::new(),
        }
    }

    fn scenario() -> Vec<SeismicEvent> {
        vec![
            event("a", Some(5.2)),
            event("b", None),
            event("c", Some(2.1)),
        ]
    }

    #[test]
    fn test_scenario_at_zero() {
        let stats = DerivedStats::compute(&scenario(), 0.0);
        assert_eq!(stats.count, 3);
        assert!((stats.max_magnitude - 5.2).abs() < 1e-9);
        assert!((stats.average_magnitude - (5.2 + 0.0 + 2.1) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_scenario_at_three() {
        let events = scenario();
        let filtered = filter_events(&events, 3.0);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "a");

        let stats = DerivedStats::from_filtered(&filtered);
        assert_eq!(stats.count, 1);
        assert!((stats.max_magnitude - 5.2).abs() < 1e-9);
        assert!((stats.average_magnitude - 5.2).abs() < 1e-9);
    }

    #[test]
    fn test_empty_is_all_zero() {
        assert_eq!(DerivedStats::compute(&[], 0.0), DerivedStats::default());
        let stats = DerivedStats::compute(&scenario(), 6.5);
        assert_eq!(stats.count, 0);
        assert!(stats.max_magnitude.abs() < f64::EPSILON);
        assert!(stats.average_magnitude.abs() < f64::EPSILON);
    }

    #[test]
    fn test_only_absent_magnitudes_report_zero_max() {
        let events = vec![event("x", None), event("y", None)];
        let stats = DerivedStats::compute(&events, 0.0);
        assert_eq!(stats.count, 2);
        assert!(stats.max_magnitude.abs() < f64::EPSILON);
        assert!(stats.average_magnitude.abs() < f64::EPSILON);
    }

    #[test]
    fn test_filter_is_exact_subset_and_monotonic() {
        let events = vec![
            event("a", Some(0.4)),
            event("b", Some(1.9)),
            event("c", None),
            event("d", Some(3.0)),
            event("e", Some(6.7)),
        ];

        let mut previous = usize::MAX;
        for step in 0..=70 {
            let min = f64::from(step) / 10.0;
            let filtered = filter_events(&events, min);
            let expected: Vec<&SeismicEvent> = events
                .iter()
                .filter(|e| min <= 0.0 || e.magnitude.unwrap_or(f64::NEG_INFINITY) >= min)
                .collect();
            assert_eq!(filtered, expected);
            assert!(filtered.len() <= previous);
            previous = filtered.len();
        }
    }

    #[test]
    fn test_zero_threshold_restores_everything() {
        let events = scenario();
        assert_eq!(filter_events(&events, 4.0).len(), 1);
        let all: Vec<&SeismicEvent> = events.iter().collect();
        assert_eq!(filter_events(&events, 0.0), all);
    }

    #[test]
    fn test_absent_magnitude_hidden_above_floor() {
        let events = vec![event("b", None)];
        assert!(filter_events(&events, 0.1).is_empty());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let events = vec![event("a", Some(3.0))];
        assert_eq!(filter_events(&events, 3.0).len(), 1);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_min_magnitude(-1.0), Some(0.0));
        assert_eq!(clamp_min_magnitude(9.5), Some(7.0));
        assert_eq!(clamp_min_magnitude(4.3), Some(4.3));
        assert_eq!(clamp_min_magnitude(f64::NAN), None);
    }
}
