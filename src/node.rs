//! # Telemetry Node
//!
//! Ties the position tracker, environmental reader and uploader together.
//!
//! One [`TelemetryNode::tick`] is one pass of the capture-and-delivery loop:
//!
//! 1. Keep the Wi-Fi link alive (throttled reconnect)
//! 2. Refresh the GPS fix; without a fix nothing else happens
//! 3. Skip the cycle unless the vehicle moved past the trigger distance
//! 4. Read the environmental sensor; an invalid sample skips the cycle
//! 5. Build the record, flush the backlog oldest-first, then send it
//! 6. Buffer the record if it could not be delivered

use crate::clock::Clock;
use crate::gps::{DistanceTrigger, PositionTracker, GPS_TIME_FORMAT};
use crate::network::link::WifiLink;
use crate::network::transport::HttpTransport;
use crate::network::TelemetryUploader;
use crate::sensor::device::EnvironmentSensor;
use crate::sensor::EnvironmentReader;
use crate::serial::port_trait::SerialRead;
use crate::telemetry::{ReadingBuffer, TelemetryRecord};
use chrono::Utc;
use tracing::{debug, info, warn};

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No GPS fix this cycle
    NoFix,
    /// Fix held but too close to the previous reading
    BelowTrigger { distance_m: f64 },
    /// Sensor produced no valid sample after all retries
    SensorInvalid,
    /// Record accepted by the endpoint
    Delivered,
    /// Record kept for a later flush; `evicted` is set when the oldest
    /// buffered record was dropped to make room
    Buffered { evicted: bool },
}

/// The capture-and-delivery pipeline
pub struct TelemetryNode<S, E, L, T, C>
where
    S: SerialRead,
    E: EnvironmentSensor,
    L: WifiLink,
    T: HttpTransport,
    C: Clock,
{
    bus_id: String,
    tracker: PositionTracker<S>,
    reader: EnvironmentReader<E, C>,
    uploader: TelemetryUploader<L, T, C>,
    trigger: DistanceTrigger,
    buffer: ReadingBuffer,
}

impl<S, E, L, T, C> TelemetryNode<S, E, L, T, C>
where
    S: SerialRead,
    E: EnvironmentSensor,
    L: WifiLink,
    T: HttpTransport,
    C: Clock,
{
    pub fn new(
        bus_id: impl Into<String>,
        tracker: PositionTracker<S>,
        reader: EnvironmentReader<E, C>,
        uploader: TelemetryUploader<L, T, C>,
        trigger: DistanceTrigger,
        buffer: ReadingBuffer,
    ) -> Self {
        Self {
            bus_id: bus_id.into(),
            tracker,
            reader,
            uploader,
            trigger,
            buffer,
        }
    }

    pub fn tracker_mut(&mut self) -> &mut PositionTracker<S> {
        &mut self.tracker
    }

    pub fn reader_mut(&mut self) -> &mut EnvironmentReader<E, C> {
        &mut self.reader
    }

    pub fn uploader_mut(&mut self) -> &mut TelemetryUploader<L, T, C> {
        &mut self.uploader
    }

    pub fn buffer(&self) -> &ReadingBuffer {
        &self.buffer
    }

    /// Run one capture-and-delivery cycle
    pub async fn tick(&mut self) -> TickOutcome {
        self.uploader.check_connection().await;

        let fix = self.tracker.coordinates();
        if !fix.has_fix {
            debug!("No GPS fix, skipping cycle");
            return TickOutcome::NoFix;
        }

        if !self.trigger.should_measure(fix.latitude, fix.longitude) {
            let distance_m = self
                .trigger
                .distance_from_last(fix.latitude, fix.longitude)
                .unwrap_or(0.0);
            debug!(
                "Moved {:.1} m of {:.1} m trigger distance",
                distance_m,
                self.trigger.threshold_m()
            );
            return TickOutcome::BelowTrigger { distance_m };
        }

        let sample = self.reader.read_data().await;
        let timestamp = self
            .tracker
            .gps_time()
            .unwrap_or_else(|| Utc::now().format(GPS_TIME_FORMAT).to_string());

        let Some(record) = TelemetryRecord::from_readings(&self.bus_id, &fix, &sample, timestamp)
        else {
            warn!("Skipping reading: sensor sample invalid");
            return TickOutcome::SensorInvalid;
        };

        info!(
            "Reading at {:.6}, {:.6}: {:.1} °C, {:.1} %, {:.1} hPa",
            record.latitude,
            record.longitude,
            record.temperature_c,
            record.humidity_pct,
            record.pressure_hpa
        );
        self.trigger.mark_measured(fix.latitude, fix.longitude);

        self.flush_buffer().await;

        // Keep delivery order: a new record never overtakes the backlog
        if self.buffer.is_empty() && self.uploader.send_data_to_api(&record).await {
            return TickOutcome::Delivered;
        }

        let evicted = self.buffer.push(record).is_some();
        if evicted {
            warn!(
                "Reading buffer full ({} records), dropped oldest reading",
                self.buffer.capacity()
            );
        }
        info!("Reading buffered ({} pending)", self.buffer.len());
        TickOutcome::Buffered { evicted }
    }

    /// Deliver buffered records oldest-first until one fails
    ///
    /// # Returns
    ///
    /// Number of records delivered
    pub async fn flush_buffer(&mut self) -> usize {
        let mut delivered = 0;

        while let Some(record) = self.buffer.front() {
            if !self.uploader.send_data_to_api(record).await {
                break;
            }
            self.buffer.pop_front();
            delivered += 1;
        }

        if delivered > 0 {
            info!(
                "Flushed {} buffered readings ({} pending)",
                delivered,
                self.buffer.len()
            );
        }
        delivered
    }
}
