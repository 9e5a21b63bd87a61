//! # Environmental Sensor Module
//!
//! Produces validated temperature/humidity/pressure samples with bounded
//! retry.
//!
//! A sample is valid only when all three channels came back finite on the
//! same attempt. Failed attempts are retried after a fixed delay; once the
//! retries are exhausted the last (possibly NaN) values are returned with
//! `valid = false`. Nothing here fails hard: callers check `valid`.
//!
//! ## Usage
//!
//! ```no_run
//! use thermora_node::clock::TokioClock;
//! use thermora_node::sensor::EnvironmentReader;
//! use thermora_node::sensor::device::Bme280Sensor;
//!
//! # async fn run() {
//! let sensor = Bme280Sensor::new("/dev/i2c-1", 0x76);
//! let mut reader = EnvironmentReader::new(sensor, TokioClock::new(), 3, 100);
//!
//! if reader.init_sensor() {
//!     let sample = reader.read_data().await;
//!     if sample.valid {
//!         println!("{:.1} °C", sample.temperature_c);
//!     }
//! }
//! # }
//! ```

pub mod device;

use crate::clock::Clock;
use device::{EnvironmentSensor, RawSample};
use tracing::{debug, error, info, warn};

/// Pascals per hectopascal
const PA_PER_HPA: f32 = 100.0;

/// One environmental acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
    pub valid: bool,
}

impl EnvironmentSample {
    /// Sample with every channel NaN and `valid = false`
    pub fn invalid() -> Self {
        Self {
            temperature_c: f32::NAN,
            humidity_pct: f32::NAN,
            pressure_hpa: f32::NAN,
            valid: false,
        }
    }

    fn from_raw(raw: RawSample) -> Self {
        let pressure_hpa = raw.pressure_pa / PA_PER_HPA;
        let valid = raw.temperature_c.is_finite()
            && raw.humidity_pct.is_finite()
            && pressure_hpa.is_finite();

        Self {
            temperature_c: raw.temperature_c,
            humidity_pct: raw.humidity_pct,
            pressure_hpa,
            valid,
        }
    }
}

/// Environmental sensor reader with bounded retry
pub struct EnvironmentReader<S: EnvironmentSensor, C: Clock> {
    sensor: S,
    clock: C,
    initialized: bool,
    read_retries: u32,
    read_delay_ms: u64,
}

impl<S: EnvironmentSensor, C: Clock> std::fmt::Debug for EnvironmentReader<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentReader")
            .field("initialized", &self.initialized)
            .field("read_retries", &self.read_retries)
            .field("read_delay_ms", &self.read_delay_ms)
            .finish_non_exhaustive()
    }
}

impl<S: EnvironmentSensor, C: Clock> EnvironmentReader<S, C> {
    /// Create a reader; the sensor stays uninitialized until [`init_sensor`](Self::init_sensor)
    ///
    /// # Arguments
    ///
    /// * `sensor` - Sensor device, owned exclusively by the reader
    /// * `clock` - Clock used for the inter-retry delay
    /// * `read_retries` - Maximum attempts per `read_data` call
    /// * `read_delay_ms` - Delay between attempts
    pub fn new(sensor: S, clock: C, read_retries: u32, read_delay_ms: u64) -> Self {
        Self {
            sensor,
            clock,
            initialized: false,
            read_retries,
            read_delay_ms,
        }
    }

    /// Open the bus, probe and configure the sensor
    ///
    /// # Returns
    ///
    /// `true` if the sensor answered and was configured. On failure the
    /// reader stays uninitialized and every read returns an invalid sample.
    pub fn init_sensor(&mut self) -> bool {
        match self.sensor.begin() {
            Ok(()) => {
                self.initialized = true;
                info!("Environmental sensor initialized");
                true
            }
            Err(e) => {
                self.initialized = false;
                error!("Environmental sensor initialization failed: {}", e);
                false
            }
        }
    }

    /// Acquire one sample, retrying non-finite reads
    ///
    /// Performs at most `read_retries` attempts with `read_delay_ms` between
    /// consecutive attempts (never after the last). An uninitialized reader
    /// returns an invalid sample without attempting a read.
    pub async fn read_data(&mut self) -> EnvironmentSample {
        if !self.initialized {
            warn!("Environmental sensor not initialized, sample invalid");
            return EnvironmentSample::invalid();
        }

        let mut sample = EnvironmentSample::invalid();

        for attempt in 0..self.read_retries {
            sample = match self.sensor.sample() {
                Ok(raw) => EnvironmentSample::from_raw(raw),
                Err(e) => {
                    debug!("Sensor read attempt {} failed: {}", attempt + 1, e);
                    EnvironmentSample::invalid()
                }
            };

            if sample.valid {
                return sample;
            }

            if attempt + 1 < self.read_retries {
                self.clock.sleep_ms(self.read_delay_ms).await;
            }
        }

        error!(
            "Failed to read sensor data after {} attempts (T={}, H={}, P={})",
            self.read_retries, sample.temperature_c, sample.humidity_pct, sample.pressure_hpa
        );
        sample
    }

    /// Temperature in °C from a full `read_data` cycle
    pub async fn read_temperature(&mut self) -> f32 {
        self.read_data().await.temperature_c
    }

    /// Relative humidity in % from a full `read_data` cycle
    pub async fn read_humidity(&mut self) -> f32 {
        self.read_data().await.humidity_pct
    }

    /// Pressure in hPa from a full `read_data` cycle
    pub async fn read_pressure(&mut self) -> f32 {
        self.read_data().await.pressure_hpa
    }

    /// Cached initialization state; not a live bus probe
    pub fn is_connected(&self) -> bool {
        self.initialized
    }
}
