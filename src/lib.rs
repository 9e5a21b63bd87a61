//! # Thermora Node Library
//!
//! Vehicle-mounted environmental telemetry: GPS-triggered BME280 readings
//! delivered over Wi-Fi to an HTTP collection endpoint.
//!
//! This library provides the capture-and-delivery pipeline: NMEA position
//! tracking with haversine distance triggering, retrying sensor acquisition,
//! and connectivity-aware HTTP delivery with a bounded offline buffer.

pub mod clock;
pub mod config;
pub mod error;
pub mod gps;
pub mod logging;
pub mod network;
pub mod nmea;
pub mod node;
pub mod sensor;
pub mod serial;
pub mod telemetry;
