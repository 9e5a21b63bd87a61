//! # GPS Position Tracking Module
//!
//! Keeps the freshest satellite fix from the receiver and provides the
//! distance computations behind the measurement trigger.
//!
//! This module handles:
//! - Draining the receiver's serial stream through the NMEA decoder
//! - Re-deriving the fix on every update (no hysteresis, no filtering)
//! - Haversine distance between coordinates
//! - Formatting receiver UTC time as ISO-8601
//!
//! ## Usage
//!
//! ```no_run
//! use thermora_node::gps::PositionTracker;
//! use thermora_node::serial::GpsSerial;
//!
//! let serial = GpsSerial::open_with_paths(&["/dev/ttyS0"], 9600)?;
//! let mut tracker = PositionTracker::new(serial);
//!
//! let fix = tracker.coordinates();
//! if fix.has_fix {
//!     println!("{}, {} ({} satellites)", fix.latitude, fix.longitude, fix.satellites);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod geo;
pub mod trigger;

use crate::clock::Clock;
use crate::nmea::decoder::NmeaDecoder;
use crate::serial::port_trait::SerialRead;
use tracing::{debug, info, warn};

pub use trigger::DistanceTrigger;

/// Bytes pulled from the serial source per read
const READ_CHUNK_SIZE: usize = 256;

/// ISO-8601 UTC format used for fix timestamps
pub const GPS_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Snapshot of the receiver fix
///
/// `has_fix` and `valid` are recomputed on every update; losing the signal
/// clears both immediately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoFix {
    /// Latitude in decimal degrees
    pub latitude: f64,

    /// Longitude in decimal degrees
    pub longitude: f64,

    /// Satellites in use at the last fix
    pub satellites: u32,

    /// UTC time of the last fix with valid date and time (`YYYY-MM-DDThh:mm:ssZ`)
    pub fix_timestamp: Option<String>,

    pub has_fix: bool,
    pub valid: bool,
}

/// GPS position tracker
///
/// Exclusive owner of the receiver byte source and its NMEA decoder.
pub struct PositionTracker<S: SerialRead> {
    source: S,
    decoder: NmeaDecoder,
    current: GeoFix,
}

impl<S: SerialRead> std::fmt::Debug for PositionTracker<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionTracker")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl<S: SerialRead> PositionTracker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            decoder: NmeaDecoder::new(),
            current: GeoFix::default(),
        }
    }

    /// Drain buffered receiver bytes and re-derive the fix
    ///
    /// Never blocks: every byte already buffered by the serial source is
    /// consumed, nothing more. A read error ends the drain for this cycle.
    pub fn update(&mut self) {
        let mut buf = [0u8; READ_CHUNK_SIZE];

        loop {
            match self.source.read_available(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    for &byte in &buf[..n] {
                        self.decoder.encode(byte);
                    }
                }
                Err(e) => {
                    warn!("GPS serial read failed: {}", e);
                    break;
                }
            }
        }

        self.refresh_fix();
    }

    fn refresh_fix(&mut self) {
        match self.decoder.location() {
            Some((latitude, longitude)) => {
                self.current.latitude = latitude;
                self.current.longitude = longitude;
                self.current.satellites = self.decoder.satellites();
                self.current.has_fix = true;
                self.current.valid = true;

                if let Some(timestamp) = self.gps_time() {
                    self.current.fix_timestamp = Some(timestamp);
                }
            }
            None => {
                self.current.has_fix = false;
                self.current.valid = false;
            }
        }
    }

    /// Update, then return a copy of the current fix
    pub fn coordinates(&mut self) -> GeoFix {
        self.update();
        self.current.clone()
    }

    /// Update, then report whether a fix is currently held
    pub fn has_fix(&mut self) -> bool {
        self.update();
        self.current.has_fix
    }

    /// Haversine distance in meters between two coordinates
    ///
    /// See [`geo::calculate_distance`].
    pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
        geo::calculate_distance(lat1, lon1, lat2, lon2)
    }

    /// Receiver UTC date and time as `YYYY-MM-DDThh:mm:ssZ`
    ///
    /// Returns `None` unless both date and time are currently valid. No
    /// partial or stale value is ever produced.
    pub fn gps_time(&self) -> Option<String> {
        let datetime = self.decoder.date()?.and_time(self.decoder.time()?);
        Some(datetime.format(GPS_TIME_FORMAT).to_string())
    }

    /// Poll for a fix until one is held or `timeout_ms` elapses
    ///
    /// # Returns
    ///
    /// `true` if a fix was obtained within the timeout
    pub async fn wait_for_fix<C: Clock + ?Sized>(
        &mut self,
        clock: &C,
        timeout_ms: u64,
        poll_interval_ms: u64,
    ) -> bool {
        let start = clock.now_ms();
        info!("Waiting up to {} ms for GPS fix", timeout_ms);

        loop {
            if self.has_fix() {
                info!(
                    "GPS fix acquired: {:.6}, {:.6} ({} satellites)",
                    self.current.latitude, self.current.longitude, self.current.satellites
                );
                return true;
            }

            if clock.now_ms().saturating_sub(start) >= timeout_ms {
                warn!("No GPS fix after {} ms", timeout_ms);
                return false;
            }

            debug!("No GPS fix yet");
            clock.sleep_ms(poll_interval_ms).await;
        }
    }

    /// Decoder statistics: (sentences committed, sentences rejected)
    pub fn sentence_stats(&self) -> (u64, u64) {
        (
            self.decoder.sentences_committed(),
            self.decoder.sentences_failed(),
        )
    }
}
