//! # Serial Communication Module
//!
//! Owns the serial connection to the GPS receiver.
//!
//! This module handles:
//! - Opening the receiver's UART (8N1, no flow control) at the configured baud
//! - Trying candidate device paths in order
//! - Non-blocking reads of whatever the receiver has buffered

pub mod port_trait;

use crate::error::{Result, TelemetryNodeError};
use port_trait::SerialRead;
use std::io::{self, Read};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default NMEA baud rate for consumer GPS receivers
pub const GPS_DEFAULT_BAUD_RATE: u32 = 9600;

/// Read timeout applied to the port; reads only happen when bytes are buffered
const GPS_READ_TIMEOUT_MS: u64 = 10;

/// Fallback GPS device paths, tried after the configured one
pub const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/serial0", // Raspberry Pi primary UART alias
    "/dev/ttyS0",   // On-board UART
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// GPS Serial Port Handler
///
/// Exclusive owner of the receiver's serial stream.
pub struct GpsSerial {
    /// Serial port handle
    port: Box<dyn tokio_serial::SerialPort>,
    /// Device path (e.g., /dev/ttyS0)
    device_path: String,
}

impl std::fmt::Debug for GpsSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl GpsSerial {
    /// Open the GPS receiver, trying `preferred` before the default paths
    ///
    /// # Errors
    ///
    /// Returns error if none of the candidate paths can be opened
    pub fn open(preferred: &str, baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(&candidate_paths(preferred), baud_rate)
    }

    /// Open the GPS receiver with custom device paths
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyS0"])
    /// * `baud_rate` - Receiver baud rate
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use thermora_node::serial::GpsSerial;
    ///
    /// let serial = GpsSerial::open_with_paths(&["/dev/ttyS0"], 9600)?;
    /// println!("GPS on {}", serial.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open GPS serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened GPS receiver at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(TelemetryNodeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with NMEA settings (8N1)
    fn open_port(path: &str, baud_rate: u32) -> Result<Box<dyn tokio_serial::SerialPort>> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(Duration::from_millis(GPS_READ_TIMEOUT_MS))
            .open()
            .map_err(|e| TelemetryNodeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

impl SerialRead for GpsSerial {
    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let buffered = self
            .port
            .bytes_to_read()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))? as usize;

        if buffered == 0 || buf.is_empty() {
            return Ok(0);
        }

        let len = buffered.min(buf.len());
        self.port.read(&mut buf[..len])
    }
}

/// Candidate device paths: `preferred` first, then the defaults not already listed
fn candidate_paths(preferred: &str) -> Vec<&str> {
    let mut paths = vec![preferred];
    paths.extend(DEFAULT_DEVICE_PATHS.iter().filter(|&&path| path != preferred));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(GPS_DEFAULT_BAUD_RATE, 9600);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 3);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/serial0");
    }

    #[test]
    fn test_candidate_paths_prefer_configured_port() {
        assert_eq!(
            candidate_paths("/dev/ttyAMA0"),
            ["/dev/ttyAMA0", "/dev/serial0", "/dev/ttyS0", "/dev/ttyUSB0"]
        );
        // No duplicate when the configured port is a default one
        assert_eq!(candidate_paths("/dev/ttyS0"), ["/dev/ttyS0", "/dev/serial0", "/dev/ttyUSB0"]);
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = GpsSerial::open_with_paths(invalid_paths, GPS_DEFAULT_BAUD_RATE);

        match result.unwrap_err() {
            TelemetryNodeError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = GpsSerial::open_with_paths(empty_paths, GPS_DEFAULT_BAUD_RATE);

        match result.unwrap_err() {
            TelemetryNodeError::SerialPortNotFound(_) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = GpsSerial::open_port("/dev/nonexistent_gps_device_12345", 9600);

        match result {
            Err(TelemetryNodeError::Serial(msg)) => {
                assert!(msg.contains("/dev/nonexistent_gps_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            Err(other) => panic!("Expected Serial error, got: {:?}", other),
            Ok(_) => panic!("Opening a missing device should fail"),
        }
    }

    // Integration test - only runs if a GPS receiver is connected
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_read_with_real_hardware() {
        match GpsSerial::open("/dev/serial0", GPS_DEFAULT_BAUD_RATE) {
            Ok(mut serial) => {
                std::thread::sleep(Duration::from_millis(1500));
                let mut buf = [0u8; 256];
                let n = serial.read_available(&mut buf).expect("read failed");
                println!("Read {} bytes from {}", n, serial.device_path());
            }
            Err(_) => println!("No GPS hardware detected (this is OK for CI/CD)"),
        }
    }
}
