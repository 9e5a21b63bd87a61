//! Distance-based measurement trigger
//!
//! A new environmental reading is due once the vehicle has moved at least
//! the trigger distance away from where the previous reading was taken.

use super::geo::calculate_distance;

/// Tracks the last measurement location against a trigger threshold
#[derive(Debug, Clone)]
pub struct DistanceTrigger {
    threshold_m: f64,
    last_measurement: Option<(f64, f64)>,
}

impl DistanceTrigger {
    /// Create a trigger with the given threshold in meters
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            last_measurement: None,
        }
    }

    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    pub fn last_measurement(&self) -> Option<(f64, f64)> {
        self.last_measurement
    }

    /// Distance in meters from the last measurement location
    ///
    /// `None` until the first measurement has been recorded.
    pub fn distance_from_last(&self, latitude: f64, longitude: f64) -> Option<f64> {
        self.last_measurement
            .map(|(lat, lon)| calculate_distance(lat, lon, latitude, longitude))
    }

    /// Whether a reading should be taken at this location
    ///
    /// Always true before the first measurement with a usable position,
    /// never true for a non-finite one.
    pub fn should_measure(&self, latitude: f64, longitude: f64) -> bool {
        if !latitude.is_finite() || !longitude.is_finite() {
            return false;
        }
        self.distance_from_last(latitude, longitude)
            .map_or(true, |distance| distance >= self.threshold_m)
    }

    /// Record that a reading was taken at this location
    ///
    /// A non-finite position is ignored so the reference stays comparable.
    pub fn mark_measured(&mut self, latitude: f64, longitude: f64) {
        if latitude.is_finite() && longitude.is_finite() {
            self.last_measurement = Some((latitude, longitude));
        }
    }
}
