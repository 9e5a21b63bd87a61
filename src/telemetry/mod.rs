//! # Telemetry Module
//!
//! The delivery unit and its holding area.
//!
//! This module handles:
//! - Assembling a [`TelemetryRecord`] from a GPS fix and an environmental sample
//! - Serializing records to the JSON payload the collection endpoint expects
//! - Buffering undelivered records in a bounded drop-oldest FIFO

pub mod buffer;
pub mod record;

pub use buffer::ReadingBuffer;
pub use record::TelemetryRecord;
