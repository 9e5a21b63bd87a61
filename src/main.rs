//! # Thermora Node
//!
//! Vehicle-mounted environmental telemetry node.
//!
//! Samples temperature, humidity and pressure every time the vehicle has
//! moved past the trigger distance, tags the reading with GPS position and
//! time, and uploads it to the collection endpoint.

use anyhow::{Context, Result};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use thermora_node::clock::TokioClock;
use thermora_node::config::Config;
use thermora_node::gps::{DistanceTrigger, PositionTracker};
use thermora_node::logging;
use thermora_node::network::link::NmcliLink;
use thermora_node::network::transport::ReqwestTransport;
use thermora_node::network::{TelemetryUploader, UploaderSettings};
use thermora_node::node::TelemetryNode;
use thermora_node::sensor::device::Bme280Sensor;
use thermora_node::sensor::EnvironmentReader;
use thermora_node::serial::GpsSerial;
use thermora_node::telemetry::ReadingBuffer;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of ticks between status log messages
const STATUS_LOG_INTERVAL_TICKS: u64 = 60;

/// Main entry point for the telemetry node
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, or `config/default.toml`)
///    - Set up logging
///    - Open the GPS serial port and the BME280 (a missing sensor is logged
///      and the node keeps running, skipping readings)
///    - Connect Wi-Fi (failure starts the node offline, buffering readings)
///    - Wait for the first GPS fix, bounded by `gps.fix_timeout_ms`
///
/// 2. **Main Loop**
///    - Run one capture-and-delivery tick every `gps.update_interval_ms`
///    - Log link and buffer status periodically
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration cannot be loaded or is invalid
/// - The GPS serial port cannot be opened
/// - The HTTP client cannot be created
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard =
        logging::init_logging(&config.logging).context("Failed to initialize logging")?;

    info!(
        "Thermora node v{} starting (bus {})",
        env!("CARGO_PKG_VERSION"),
        config.bus.id
    );

    let clock = TokioClock::new();

    // GPS receiver
    let serial = GpsSerial::open(&config.gps.port, config.gps.baud_rate)?;
    info!("GPS serial port opened at: {}", serial.device_path());
    let tracker = PositionTracker::new(serial);

    // Environmental sensor
    let sensor = Bme280Sensor::new(&config.sensor.i2c_bus, config.sensor.i2c_address);
    let mut reader = EnvironmentReader::new(
        sensor,
        clock,
        config.sensor.read_retries,
        config.sensor.read_delay_ms,
    );
    if !reader.init_sensor() {
        warn!("Continuing without environmental sensor; readings will be skipped");
    }

    // Network
    let link = NmcliLink::new(
        &config.wifi.interface,
        config.wifi.connect_timeout_ms.div_ceil(1000),
    );
    let transport = ReqwestTransport::new()?;
    let mut uploader =
        TelemetryUploader::new(link, transport, clock, UploaderSettings::from_config(&config));
    if !uploader.connect_wifi().await {
        warn!("Starting offline; readings will be buffered");
    }

    let mut node = TelemetryNode::new(
        config.bus.id.clone(),
        tracker,
        reader,
        uploader,
        DistanceTrigger::new(config.measurement.distance_trigger_meters),
        ReadingBuffer::new(config.measurement.buffer_size),
    );

    node.tracker_mut()
        .wait_for_fix(&clock, config.gps.fix_timeout_ms, config.gps.update_interval_ms)
        .await;

    let mut tick_interval = interval(Duration::from_millis(config.gps.update_interval_ms));
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        "Sampling every {:.0} m, checking position every {} ms",
        config.measurement.distance_trigger_meters, config.gps.update_interval_ms
    );
    info!("Press Ctrl+C to exit");

    let mut tick_count: u64 = 0;

    // Armed once so a Ctrl+C arriving mid-tick is not lost
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Main capture loop
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                let outcome = node.tick().await;
                debug!(?outcome, "Tick complete");

                tick_count += 1;
                if tick_count % STATUS_LOG_INTERVAL_TICKS == 0 {
                    let (committed, failed) = node.tracker_mut().sentence_stats();
                    let rssi = node.uploader_mut().get_rssi();
                    info!(
                        "Status: RSSI {} dBm, {} readings buffered, NMEA {} ok / {} rejected",
                        rssi,
                        node.buffer().len(),
                        committed,
                        failed
                    );
                }
            }

            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                if !node.buffer().is_empty() {
                    warn!("{} undelivered readings discarded", node.buffer().len());
                }
                break;
            }
        }
    }

    node.uploader_mut().disconnect().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
        assert!(std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join(DEFAULT_CONFIG_PATH)
            .exists());
    }

    #[test]
    fn test_status_interval_constant() {
        // One status line a minute at the default 1000 ms update interval
        assert_eq!(STATUS_LOG_INTERVAL_TICKS, 60);
    }
}
