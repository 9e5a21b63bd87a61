//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TelemetryNodeError};
use crate::serial::GPS_DEFAULT_BAUD_RATE;

/// Supported GPS receiver baud rates
pub const VALID_GPS_BAUD_RATES: [u32; 6] = [4800, 9600, 19200, 38400, 57600, 115200];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub wifi: WifiConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub measurement: MeasurementConfig,
    #[serde(default)]
    pub sensor: SensorConfig,
    #[serde(default)]
    pub gps: GpsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Wi-Fi station configuration
#[derive(Debug, Deserialize, Clone)]
pub struct WifiConfig {
    pub ssid: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_wifi_interface")]
    pub interface: String,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Collection endpoint configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub endpoint: String,

    pub api_key: String,

    #[serde(default = "default_api_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

/// Vehicle identity
#[derive(Debug, Deserialize, Clone)]
pub struct BusConfig {
    #[serde(default = "default_bus_id")]
    pub id: String,
}

/// Measurement trigger and buffering
#[derive(Debug, Deserialize, Clone)]
pub struct MeasurementConfig {
    #[serde(default = "default_distance_trigger_meters")]
    pub distance_trigger_meters: f64,

    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

/// Environmental sensor configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SensorConfig {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,

    #[serde(default = "default_i2c_address")]
    pub i2c_address: u8,

    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_read_delay_ms")]
    pub read_delay_ms: u64,
}

/// GPS receiver configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpsConfig {
    #[serde(default = "default_gps_port")]
    pub port: String,

    #[serde(default = "default_gps_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    #[serde(default = "default_fix_timeout_ms")]
    pub fix_timeout_ms: u64,
}

/// Log output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily log files; empty logs to the console only
    #[serde(default)]
    pub log_dir: String,

    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_wifi_interface() -> String { "wlan0".to_string() }
fn default_connect_timeout_ms() -> u64 { 30000 }
fn default_reconnect_interval_ms() -> u64 { 30000 }
fn default_poll_interval_ms() -> u64 { 500 }

fn default_api_timeout_ms() -> u64 { 10000 }
fn default_retry_count() -> u32 { 3 }
fn default_retry_delay_ms() -> u64 { 1000 }

fn default_bus_id() -> String { "BUS_001".to_string() }

fn default_distance_trigger_meters() -> f64 { 600.0 }
fn default_buffer_size() -> usize { 100 }

fn default_i2c_bus() -> String { "/dev/i2c-1".to_string() }
fn default_i2c_address() -> u8 { 0x76 }
fn default_read_retries() -> u32 { 3 }
fn default_read_delay_ms() -> u64 { 100 }

fn default_gps_port() -> String { "/dev/ttyS0".to_string() }
fn default_gps_baud_rate() -> u32 { GPS_DEFAULT_BAUD_RATE }
fn default_update_interval_ms() -> u64 { 1000 }
fn default_fix_timeout_ms() -> u64 { 30000 }

fn default_log_level() -> String { "info".to_string() }

impl Default for BusConfig {
    fn default() -> Self {
        Self { id: default_bus_id() }
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            distance_trigger_meters: default_distance_trigger_meters(),
            buffer_size: default_buffer_size(),
        }
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            i2c_address: default_i2c_address(),
            read_retries: default_read_retries(),
            read_delay_ms: default_read_delay_ms(),
        }
    }
}

impl Default for GpsConfig {
    fn default() -> Self {
        Self {
            port: default_gps_port(),
            baud_rate: default_gps_baud_rate(),
            update_interval_ms: default_update_interval_ms(),
            fix_timeout_ms: default_fix_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: String::new(),
            level: default_log_level(),
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> TelemetryNodeError {
    TelemetryNodeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails (including missing `wifi.ssid`, `api.endpoint`
    ///   or `api.api_key`)
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use thermora_node::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Returns
    ///
    /// * `Result<()>` - Ok if valid, Err if invalid
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate Wi-Fi configuration
        if self.wifi.ssid.is_empty() {
            return Err(invalid("wifi ssid cannot be empty"));
        }

        if self.wifi.interface.is_empty() {
            return Err(invalid("wifi interface cannot be empty"));
        }

        if self.wifi.connect_timeout_ms == 0 || self.wifi.connect_timeout_ms > 300000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 300000"));
        }

        if self.wifi.poll_interval_ms == 0 || self.wifi.poll_interval_ms > self.wifi.connect_timeout_ms {
            return Err(invalid("poll_interval_ms must be between 1 and connect_timeout_ms"));
        }

        if self.wifi.reconnect_interval_ms == 0 {
            return Err(invalid("reconnect_interval_ms must be greater than 0"));
        }

        // Validate API configuration
        if !(self.api.endpoint.starts_with("http://") || self.api.endpoint.starts_with("https://")) {
            return Err(invalid("api endpoint must be an http:// or https:// URL"));
        }

        if self.api.api_key.is_empty() {
            return Err(invalid("api_key cannot be empty"));
        }

        if self.api.timeout_ms == 0 || self.api.timeout_ms > 120000 {
            return Err(invalid("api timeout_ms must be between 1 and 120000"));
        }

        if !(1..=10).contains(&self.api.retry_count) {
            return Err(invalid("retry_count must be between 1 and 10"));
        }

        // Validate bus identity
        if self.bus.id.is_empty() {
            return Err(invalid("bus id cannot be empty"));
        }

        // Validate measurement configuration
        let trigger = self.measurement.distance_trigger_meters;
        if !trigger.is_finite() || trigger <= 0.0 {
            return Err(invalid("distance_trigger_meters must be a positive number"));
        }

        if self.measurement.buffer_size == 0 {
            return Err(invalid("buffer_size must be greater than 0"));
        }

        // Validate sensor configuration
        if self.sensor.i2c_bus.is_empty() {
            return Err(invalid("sensor i2c_bus cannot be empty"));
        }

        if ![0x76, 0x77].contains(&self.sensor.i2c_address) {
            return Err(invalid(format!(
                "i2c_address 0x{:02X} is not a BME280 address (must be 0x76 or 0x77)",
                self.sensor.i2c_address
            )));
        }

        if self.sensor.read_retries == 0 {
            return Err(invalid("read_retries must be at least 1"));
        }

        // Validate GPS configuration
        if self.gps.port.is_empty() {
            return Err(invalid("gps port cannot be empty"));
        }

        if !VALID_GPS_BAUD_RATES.contains(&self.gps.baud_rate) {
            return Err(invalid(
                "gps baud_rate must be one of: 4800, 9600, 19200, 38400, 57600, 115200",
            ));
        }

        if self.gps.update_interval_ms == 0 || self.gps.update_interval_ms > 60000 {
            return Err(invalid("update_interval_ms must be between 1 and 60000"));
        }

        // Validate log level
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid("logging level must be one of: trace, debug, info, warn, error"));
        }

        Ok(())
    }
}
