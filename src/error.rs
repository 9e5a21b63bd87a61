//! # Error Types
//!
//! Custom error types for the telemetry node using `thiserror`.
//!
//! Component boundaries still report acquisition and delivery problems as
//! validity flags and booleans; these errors cover configuration, start-up
//! and the hardware seams underneath the components.

use thiserror::Error;

/// Main error type for the telemetry node
#[derive(Debug, Error)]
pub enum TelemetryNodeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors (GPS receiver)
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("GPS serial port not found (tried: {0})")]
    SerialPortNotFound(String),

    /// Environmental sensor bus errors
    #[error("Sensor error: {0}")]
    Sensor(String),

    /// Wi-Fi link errors
    #[error("Network error: {0}")]
    Network(String),

    /// HTTP transport-level errors (no status code received)
    #[error("HTTP transport error: {0}")]
    Transport(String),

    /// Payload serialization errors
    #[error("Payload error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result type alias for the telemetry node
pub type Result<T> = std::result::Result<T, TelemetryNodeError>;
