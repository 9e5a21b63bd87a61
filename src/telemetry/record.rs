//! Telemetry record: the unit of delivery and its JSON wire form

use crate::error::Result;
use crate::gps::GeoFix;
use crate::sensor::EnvironmentSample;
use serde::{Deserialize, Serialize};

/// One combined GPS + environmental reading, tagged with the bus identifier
///
/// Field declaration order is the JSON key order on the wire:
/// `bus_id, timestamp, latitude, longitude, temperature, humidity, pressure`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub bus_id: String,

    /// ISO-8601 UTC (`YYYY-MM-DDThh:mm:ssZ`)
    pub timestamp: String,

    pub latitude: f64,
    pub longitude: f64,

    #[serde(rename = "temperature")]
    pub temperature_c: f32,

    #[serde(rename = "humidity")]
    pub humidity_pct: f32,

    #[serde(rename = "pressure")]
    pub pressure_hpa: f32,
}

impl TelemetryRecord {
    /// Assemble a record from a fix and a sample
    ///
    /// Returns `None` unless the fix is held and the sample is valid; a
    /// record is never built from invalid readings.
    pub fn from_readings(
        bus_id: &str,
        fix: &GeoFix,
        sample: &EnvironmentSample,
        timestamp: String,
    ) -> Option<Self> {
        if !fix.has_fix || !sample.valid {
            return None;
        }

        Some(Self {
            bus_id: bus_id.to_string(),
            timestamp,
            latitude: fix.latitude,
            longitude: fix.longitude,
            temperature_c: sample.temperature_c,
            humidity_pct: sample.humidity_pct,
            pressure_hpa: sample.pressure_hpa,
        })
    }

    /// Serialize to the JSON payload posted to the collection endpoint
    ///
    /// # Examples
    ///
    /// ```
    /// use thermora_node::telemetry::TelemetryRecord;
    ///
    /// let record = TelemetryRecord {
    ///     bus_id: "BUS_001".to_string(),
    ///     timestamp: "2026-10-19T08:15:00Z".to_string(),
    ///     latitude: 51.5,
    ///     longitude: -0.125,
    ///     temperature_c: 21.5,
    ///     humidity_pct: 45.0,
    ///     pressure_hpa: 1013.25,
    /// };
    /// let json = record.to_json().unwrap();
    /// assert!(json.starts_with(r#"{"bus_id":"BUS_001","timestamp":"#));
    /// ```
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
