//! # NMEA Protocol Module
//!
//! Streaming decoder for the NMEA 0183 sentences emitted by the GPS receiver.
//!
//! Framing, checksum verification and GGA/RMC field parsing are done by
//! `nmea0183`; this module tracks which of location, time and date are
//! currently valid.

pub mod decoder;
