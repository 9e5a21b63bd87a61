//! # NMEA Sentence Decoder
//!
//! Byte-at-a-time state holder over [`nmea0183::Parser`]. Checksum-verified
//! GGA and RMC sentences are committed into the decoder state; everything
//! else is counted and ignored.

use chrono::{NaiveDate, NaiveTime};
use nmea0183::{ParseResult, Parser};
use tracing::{debug, trace};

/// Latitude bound in decimal degrees
const MAX_LATITUDE: f64 = 90.0;

/// Longitude bound in decimal degrees
const MAX_LONGITUDE: f64 = 180.0;

/// Accept a position only when both coordinates are finite and in range
pub fn checked_position(latitude: f64, longitude: f64) -> Option<(f64, f64)> {
    let in_range = latitude.is_finite()
        && longitude.is_finite()
        && latitude.abs() <= MAX_LATITUDE
        && longitude.abs() <= MAX_LONGITUDE;

    in_range.then_some((latitude, longitude))
}

fn to_time(hours: u32, minutes: u32, seconds: f64) -> Option<NaiveTime> {
    // Leap second 60 is folded into 59
    let seconds = (seconds.max(0.0) as u32).min(59);
    NaiveTime::from_hms_opt(hours, minutes, seconds)
}

fn to_date(year: u32, month: u32, day: u32) -> Option<NaiveDate> {
    // Two-digit NMEA year, always read as 20yy
    NaiveDate::from_ymd_opt(2000 + (year % 100) as i32, month, day)
}

/// Streaming NMEA decoder
///
/// Feed bytes with [`NmeaDecoder::encode`]. Location validity follows the
/// most recent GGA/RMC sentence: a sentence reporting no fix clears it
/// immediately, there is no hysteresis. Sentences the parser rejects
/// (checksum, malformed fields) are dropped without touching the state.
pub struct NmeaDecoder {
    parser: Parser,

    location: Option<(f64, f64)>,
    satellites: u32,
    time: Option<NaiveTime>,
    date: Option<NaiveDate>,

    sentences_committed: u64,
    sentences_failed: u64,
}

impl std::fmt::Debug for NmeaDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NmeaDecoder")
            .field("location", &self.location)
            .field("satellites", &self.satellites)
            .field("time", &self.time)
            .field("date", &self.date)
            .finish_non_exhaustive()
    }
}

impl Default for NmeaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl NmeaDecoder {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            location: None,
            satellites: 0,
            time: None,
            date: None,
            sentences_committed: 0,
            sentences_failed: 0,
        }
    }

    /// Feed one byte from the serial stream
    ///
    /// # Returns
    ///
    /// `true` when this byte completed a GGA or RMC sentence that was
    /// committed into the decoder state
    pub fn encode(&mut self, byte: u8) -> bool {
        match self.parser.parse_from_byte(byte) {
            None => false,
            Some(Ok(ParseResult::GGA(Some(gga)))) => {
                self.location =
                    checked_position(gga.latitude.as_f64(), gga.longitude.as_f64());
                if self.location.is_none() {
                    debug!("GGA position invalid, fix dropped");
                }
                self.satellites = gga.sat_in_use as u32;
                self.time = to_time(
                    gga.time.hours as u32,
                    gga.time.minutes as u32,
                    gga.time.seconds as f64,
                );
                self.sentences_committed += 1;
                true
            }
            Some(Ok(ParseResult::RMC(Some(rmc)))) => {
                self.location =
                    checked_position(rmc.latitude.as_f64(), rmc.longitude.as_f64());
                if self.location.is_none() {
                    debug!("RMC position invalid, fix dropped");
                }
                let (date, time) = (&rmc.datetime.date, &rmc.datetime.time);
                self.time = to_time(time.hours as u32, time.minutes as u32, time.seconds as f64);
                self.date = to_date(date.year as u32, date.month as u32, date.day as u32);
                self.sentences_committed += 1;
                true
            }
            // A fix sentence without usable data: the receiver has lost the fix
            Some(Ok(ParseResult::GGA(None))) | Some(Ok(ParseResult::RMC(None))) => {
                self.location = None;
                self.time = None;
                self.sentences_committed += 1;
                true
            }
            Some(Ok(_)) => {
                trace!("Ignoring NMEA sentence without fix data");
                false
            }
            Some(Err(e)) => {
                self.sentences_failed += 1;
                debug!("Rejected NMEA sentence: {}", e);
                false
            }
        }
    }

    /// Current position as (latitude, longitude), `None` without a fix
    pub fn location(&self) -> Option<(f64, f64)> {
        self.location
    }

    pub fn location_is_valid(&self) -> bool {
        self.location.is_some()
    }

    /// Satellites in use from the most recent GGA sentence
    pub fn satellites(&self) -> u32 {
        self.satellites
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Number of GGA/RMC sentences committed so far
    pub fn sentences_committed(&self) -> u64 {
        self.sentences_committed
    }

    /// Number of framed sentences rejected by the parser
    pub fn sentences_failed(&self) -> u64 {
        self.sentences_failed
    }
}
