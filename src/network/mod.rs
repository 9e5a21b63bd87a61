//! # Network Module
//!
//! Best-effort Wi-Fi connectivity and retrying HTTP delivery of telemetry
//! records.
//!
//! ## Behavior
//!
//! - `connect_wifi` requests association and polls the live link state every
//!   `poll_interval_ms` until `connect_timeout_ms` has elapsed.
//! - `check_connection` reconnects at most once per `reconnect_interval_ms`,
//!   no matter how often it is called.
//! - `send_data_to_api` never touches the network while the link is down.
//!   Otherwise it serializes once and POSTs up to `retry_count` times with a
//!   fixed `retry_delay_ms` before every attempt after the first. Only HTTP
//!   200 and 201 count as delivered.
//!
//! ## Usage
//!
//! ```no_run
//! use thermora_node::clock::TokioClock;
//! use thermora_node::config::Config;
//! use thermora_node::network::{TelemetryUploader, UploaderSettings};
//! use thermora_node::network::link::NmcliLink;
//! use thermora_node::network::transport::ReqwestTransport;
//!
//! # async fn run() -> thermora_node::error::Result<()> {
//! let config = Config::load("config/default.toml")?;
//! let settings = UploaderSettings::from_config(&config);
//! let link = NmcliLink::new(&config.wifi.interface, config.wifi.connect_timeout_ms / 1000);
//! let mut uploader = TelemetryUploader::new(link, ReqwestTransport::new()?, TokioClock::new(), settings);
//!
//! if uploader.connect_wifi().await {
//!     println!("RSSI: {} dBm", uploader.get_rssi());
//! }
//! # Ok(())
//! # }
//! ```

pub mod link;
pub mod transport;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::Result;
use crate::telemetry::TelemetryRecord;
use link::WifiLink;
use tracing::{debug, error, info, warn};
use transport::{HttpRequest, HttpTransport};

/// Connect-status polling interval
pub const DEFAULT_CONNECT_POLL_MS: u64 = 500;

/// Result of one delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Endpoint answered 200/201 on the given attempt (1-based)
    Delivered { attempts: u32 },
    /// Link was down; no request was made
    NotConnected,
    /// Every attempt failed
    Failed { attempts: u32 },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Credentials, endpoint and timing used by [`TelemetryUploader`]
#[derive(Debug, Clone)]
pub struct UploaderSettings {
    pub ssid: String,
    pub password: String,
    pub endpoint: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub connect_poll_ms: u64,
    pub reconnect_interval_ms: u64,
}

impl UploaderSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ssid: config.wifi.ssid.clone(),
            password: config.wifi.password.clone(),
            endpoint: config.api.endpoint.clone(),
            api_key: config.api.api_key.clone(),
            request_timeout_ms: config.api.timeout_ms,
            retry_count: config.api.retry_count,
            retry_delay_ms: config.api.retry_delay_ms,
            connect_timeout_ms: config.wifi.connect_timeout_ms,
            connect_poll_ms: config.wifi.poll_interval_ms,
            reconnect_interval_ms: config.wifi.reconnect_interval_ms,
        }
    }
}

/// Wi-Fi connectivity plus HTTP delivery with retry
pub struct TelemetryUploader<L: WifiLink, T: HttpTransport, C: Clock> {
    link: L,
    transport: T,
    clock: C,
    settings: UploaderSettings,
    wifi_connected: bool,
    last_reconnect_attempt: Option<u64>,
}

impl<L: WifiLink, T: HttpTransport, C: Clock> std::fmt::Debug for TelemetryUploader<L, T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryUploader")
            .field("endpoint", &self.settings.endpoint)
            .field("wifi_connected", &self.wifi_connected)
            .field("last_reconnect_attempt", &self.last_reconnect_attempt)
            .finish_non_exhaustive()
    }
}

impl<L: WifiLink, T: HttpTransport, C: Clock> TelemetryUploader<L, T, C> {
    pub fn new(link: L, transport: T, clock: C, settings: UploaderSettings) -> Self {
        Self {
            link,
            transport,
            clock,
            settings,
            wifi_connected: false,
            last_reconnect_attempt: None,
        }
    }

    /// Associate with the configured network
    ///
    /// No-op success when the link is already up. Otherwise requests
    /// association and polls the link state until it comes up or the
    /// connect timeout elapses. Time spent inside the association request
    /// counts against the same timeout.
    ///
    /// # Returns
    ///
    /// `true` if the link is up on return
    pub async fn connect_wifi(&mut self) -> bool {
        if self.link.is_connected() {
            self.wifi_connected = true;
            return true;
        }

        info!("Connecting to WiFi: {}", self.settings.ssid);
        let start = self.clock.now_ms();
        if let Err(e) = self
            .link
            .begin(&self.settings.ssid, &self.settings.password)
            .await
        {
            self.wifi_connected = false;
            error!("WiFi association request failed: {}", e);
            return false;
        }

        while !self.link.is_connected()
            && self.clock.now_ms().saturating_sub(start) < self.settings.connect_timeout_ms
        {
            self.clock.sleep_ms(self.settings.connect_poll_ms).await;
        }

        if self.link.is_connected() {
            self.wifi_connected = true;
            info!("WiFi connected (RSSI: {} dBm)", self.link.rssi().unwrap_or(0));
            true
        } else {
            self.wifi_connected = false;
            error!(
                "WiFi connection failed after {} ms",
                self.settings.connect_timeout_ms
            );
            false
        }
    }

    /// Live link state, never the cached flag
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Cached connectivity flag as of the last connect or connection check
    pub fn wifi_connected(&self) -> bool {
        self.wifi_connected
    }

    /// Reconnect if the link is down, at most once per reconnect interval
    ///
    /// The first call that finds the link down attempts immediately.
    pub async fn check_connection(&mut self) {
        if self.is_connected() {
            self.wifi_connected = true;
            return;
        }

        self.wifi_connected = false;
        let now = self.clock.now_ms();
        let due = match self.last_reconnect_attempt {
            None => true,
            Some(last) => now.saturating_sub(last) > self.settings.reconnect_interval_ms,
        };

        if due {
            self.last_reconnect_attempt = Some(now);
            warn!("WiFi link down, attempting reconnect");
            self.connect_wifi().await;
        }
    }

    /// Live signal strength in dBm, or 0 when not connected
    pub fn get_rssi(&self) -> i32 {
        if self.is_connected() {
            self.link.rssi().unwrap_or(0)
        } else {
            0
        }
    }

    /// Drop the association and clear the cached flag
    pub async fn disconnect(&mut self) {
        if let Err(e) = self.link.disconnect().await {
            warn!("WiFi disconnect failed: {}", e);
        }
        self.wifi_connected = false;
    }

    /// JSON body for one record
    pub fn create_json_payload(&self, record: &TelemetryRecord) -> Result<String> {
        record.to_json()
    }

    /// One POST of `payload`
    ///
    /// # Returns
    ///
    /// `true` only for HTTP 200 or 201
    pub async fn perform_http_request(&self, payload: &str) -> bool {
        let request = HttpRequest {
            url: self.settings.endpoint.clone(),
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-API-Key".to_string(), self.settings.api_key.clone()),
            ],
            body: payload.to_string(),
            timeout_ms: self.settings.request_timeout_ms,
        };

        match self.transport.post(&request).await {
            Ok(response) if response.status == 200 || response.status == 201 => {
                info!("HTTP response code: {}", response.status);
                debug!("Response: {}", response.body);
                true
            }
            Ok(response) => {
                warn!("HTTP error code {}", response.status);
                false
            }
            Err(e) => {
                warn!("HTTP request failed: {}", e);
                false
            }
        }
    }

    /// Deliver one record with retry
    ///
    /// # Returns
    ///
    /// `true` if the endpoint accepted the record
    pub async fn send_data_to_api(&mut self, record: &TelemetryRecord) -> bool {
        self.deliver(record).await.is_delivered()
    }

    /// Deliver one record with retry, reporting how it went
    pub async fn deliver(&mut self, record: &TelemetryRecord) -> DeliveryOutcome {
        if !self.is_connected() {
            error!("WiFi not connected, cannot send data");
            return DeliveryOutcome::NotConnected;
        }

        let payload = match self.create_json_payload(record) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize telemetry record: {}", e);
                return DeliveryOutcome::Failed { attempts: 0 };
            }
        };
        debug!("Sending data to API: {}", payload);

        for attempt in 0..self.settings.retry_count {
            if attempt > 0 {
                info!("Retry attempt {}...", attempt);
                self.clock.sleep_ms(self.settings.retry_delay_ms).await;
            }

            if self.perform_http_request(&payload).await {
                return DeliveryOutcome::Delivered {
                    attempts: attempt + 1,
                };
            }
        }

        error!(
            "Failed to send data after {} attempts",
            self.settings.retry_count
        );
        DeliveryOutcome::Failed {
            attempts: self.settings.retry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::link::MockWifiLink;
    use super::transport::{HttpResponse, MockHttpTransport};
    use super::*;
    use crate::clock::mocks::MockClock;
    use crate::error::TelemetryNodeError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn settings() -> UploaderSettings {
        UploaderSettings {
            ssid: "depot".to_string(),
            password: "hunter2".to_string(),
            endpoint: "https://api.example.com/readings".to_string(),
            api_key: "key-123".to_string(),
            request_timeout_ms: 10_000,
            retry_count: 3,
            retry_delay_ms: 1_000,
            connect_timeout_ms: 30_000,
            connect_poll_ms: DEFAULT_CONNECT_POLL_MS,
            reconnect_interval_ms: 30_000,
        }
    }

    fn record() -> TelemetryRecord {
        TelemetryRecord {
            bus_id: "BUS_001".to_string(),
            timestamp: "2026-10-19T08:15:00Z".to_string(),
            latitude: 51.5,
            longitude: -0.125,
            temperature_c: 21.5,
            humidity_pct: 45.0,
            pressure_hpa: 1013.25,
        }
    }

    fn status(code: u16) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: code,
            body: String::new(),
        })
    }

    fn connected_link() -> MockWifiLink {
        let mut link = MockWifiLink::new();
        link.expect_is_connected().return_const(true);
        link.expect_rssi().return_const(Some(-61));
        link
    }

    fn disconnected_link() -> MockWifiLink {
        let mut link = MockWifiLink::new();
        link.expect_is_connected().return_const(false);
        link.expect_rssi().return_const(None);
        link
    }

    type Uploader = TelemetryUploader<MockWifiLink, MockHttpTransport, MockClock>;

    fn uploader(link: MockWifiLink, transport: MockHttpTransport) -> (Uploader, MockClock) {
        uploader_with(link, transport, settings())
    }

    fn uploader_with(
        link: MockWifiLink,
        transport: MockHttpTransport,
        settings: UploaderSettings,
    ) -> (Uploader, MockClock) {
        let clock = MockClock::new();
        (TelemetryUploader::new(link, transport, clock.clone(), settings), clock)
    }

    #[tokio::test]
    async fn test_send_when_disconnected_makes_no_request() {
        let mut transport = MockHttpTransport::new();
        transport.expect_post().times(0);
        let (mut uploader, clock) = uploader(disconnected_link(), transport);

        assert_eq!(uploader.deliver(&record()).await, DeliveryOutcome::NotConnected);
        assert!(!uploader.send_data_to_api(&record()).await);
        assert!(clock.get_sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_first_attempt_success_short_circuits() {
        let mut transport = MockHttpTransport::new();
        transport.expect_post().times(1).returning(|_| status(201));
        let (mut uploader, clock) = uploader(connected_link(), transport);

        assert_eq!(
            uploader.deliver(&record()).await,
            DeliveryOutcome::Delivered { attempts: 1 }
        );
        assert!(clock.get_sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_retries_exactly_retry_count_with_fixed_backoff() {
        let mut transport = MockHttpTransport::new();
        transport.expect_post().times(3).returning(|_| status(500));
        let (mut uploader, clock) = uploader(connected_link(), transport);

        assert_eq!(
            uploader.deliver(&record()).await,
            DeliveryOutcome::Failed { attempts: 3 }
        );
        assert_eq!(clock.get_sleeps(), vec![1_000, 1_000]);
    }

    #[tokio::test]
    async fn test_success_on_second_attempt() {
        let mut transport = MockHttpTransport::new();
        let mut calls = 0;
        transport.expect_post().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(TelemetryNodeError::Transport("connection reset".to_string()))
            } else {
                status(200)
            }
        });
        let (mut uploader, clock) = uploader(connected_link(), transport);

        assert!(uploader.send_data_to_api(&record()).await);
        assert_eq!(clock.get_sleeps(), vec![1_000]);
    }

    #[tokio::test]
    async fn test_only_200_and_201_are_success() {
        for (code, expected) in [(200, true), (201, true), (202, false), (204, false), (401, false), (503, false)] {
            let mut transport = MockHttpTransport::new();
            transport.expect_post().times(1).returning(move |_| status(code));
            let (sender, _clock) = uploader(connected_link(), transport);

            assert_eq!(sender.perform_http_request("{}").await, expected, "status {}", code);
        }
    }

    #[tokio::test]
    async fn test_request_carries_headers_timeout_and_payload() {
        let expected_body = record().to_json().unwrap();
        let mut transport = MockHttpTransport::new();
        transport
            .expect_post()
            .withf(move |req: &HttpRequest| {
                req.url == "https://api.example.com/readings"
                    && req.header("Content-Type") == Some("application/json")
                    && req.header("X-API-Key") == Some("key-123")
                    && req.timeout_ms == 10_000
                    && req.body == expected_body
            })
            .times(1)
            .returning(|_| status(200));
        let (mut uploader, _clock) = uploader(connected_link(), transport);

        assert!(uploader.send_data_to_api(&record()).await);
    }

    #[tokio::test]
    async fn test_connect_when_already_connected_is_noop() {
        let mut link = connected_link();
        link.expect_begin().times(0);
        let (mut uploader, clock) = uploader(link, MockHttpTransport::new());

        assert!(uploader.connect_wifi().await);
        assert!(uploader.wifi_connected());
        assert!(clock.get_sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_connect_polls_until_link_up() {
        let up = Arc::new(AtomicBool::new(false));
        let polls = Arc::new(std::sync::Mutex::new(0u32));

        let mut link = MockWifiLink::new();
        {
            let up = up.clone();
            let polls = polls.clone();
            link.expect_is_connected().returning(move || {
                let mut n = polls.lock().unwrap();
                *n += 1;
                // Link comes up on the fourth status check
                if *n >= 4 {
                    up.store(true, Ordering::SeqCst);
                }
                up.load(Ordering::SeqCst)
            });
        }
        link.expect_begin()
            .withf(|ssid, password| ssid == "depot" && password == "hunter2")
            .times(1)
            .returning(|_, _| Ok(()));
        link.expect_rssi().return_const(Some(-61));
        let (mut uploader, clock) = uploader(link, MockHttpTransport::new());

        assert!(uploader.connect_wifi().await);
        assert!(uploader.wifi_connected());
        assert_eq!(clock.get_sleeps(), vec![500, 500]);
    }

    #[tokio::test]
    async fn test_connect_times_out() {
        let mut link = disconnected_link();
        link.expect_begin().times(1).returning(|_, _| Ok(()));
        let (mut uploader, clock) = uploader(link, MockHttpTransport::new());

        assert!(!uploader.connect_wifi().await);
        assert!(!uploader.wifi_connected());
        // 30 s timeout polled every 500 ms
        assert_eq!(clock.get_sleeps().len(), 60);
        assert_eq!(clock.now_ms(), 30_000);
    }

    #[tokio::test]
    async fn test_connect_timeout_includes_association_time() {
        let clock = MockClock::new();
        let mut link = disconnected_link();
        {
            let clock = clock.clone();
            // Association blocks for the whole timeout, as `nmcli --wait` can
            link.expect_begin().times(1).returning(move |_, _| {
                clock.advance(30_000);
                Ok(())
            });
        }
        let mut uploader = TelemetryUploader::new(link, MockHttpTransport::new(), clock.clone(), settings());

        assert!(!uploader.connect_wifi().await);
        assert!(clock.get_sleeps().is_empty());
        assert_eq!(clock.now_ms(), 30_000);
    }

    #[tokio::test]
    async fn test_connect_polls_only_for_remaining_time() {
        let clock = MockClock::new();
        let mut link = disconnected_link();
        {
            let clock = clock.clone();
            link.expect_begin().times(1).returning(move |_, _| {
                clock.advance(20_000);
                Ok(())
            });
        }
        let mut uploader = TelemetryUploader::new(link, MockHttpTransport::new(), clock.clone(), settings());

        assert!(!uploader.connect_wifi().await);
        // 10 s left after association, polled every 500 ms
        assert_eq!(clock.get_sleeps().len(), 20);
        assert_eq!(clock.now_ms(), 30_000);
    }

    #[tokio::test]
    async fn test_connect_request_failure_returns_false() {
        let mut link = disconnected_link();
        link.expect_begin()
            .times(1)
            .returning(|_, _| Err(TelemetryNodeError::Network("no such SSID".to_string())));
        let (mut uploader, clock) = uploader(link, MockHttpTransport::new());

        assert!(!uploader.connect_wifi().await);
        assert!(clock.get_sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_check_connection_throttles_reconnects() {
        let mut link = disconnected_link();
        link.expect_begin().times(2).returning(|_, _| Ok(()));
        let settings = UploaderSettings {
            connect_timeout_ms: 1_000,
            ..settings()
        };
        let (mut uploader, clock) = uploader_with(link, MockHttpTransport::new(), settings);

        // First check attempts immediately; the connect wait runs to t=1000
        uploader.check_connection().await;
        assert!(!uploader.wifi_connected());
        assert_eq!(clock.now_ms(), 1_000);

        // Many checks inside the reconnect window do not reconnect
        for _ in 0..14 {
            uploader.check_connection().await;
            clock.advance(2_000);
        }
        assert_eq!(clock.now_ms(), 29_000);
        uploader.check_connection().await;

        // Past the window: exactly one more attempt
        clock.advance(1_001);
        uploader.check_connection().await;
        uploader.check_connection().await;
    }

    #[tokio::test]
    async fn test_check_connection_when_up_sets_flag() {
        let mut link = connected_link();
        link.expect_begin().times(0);
        let (mut uploader, _clock) = uploader(link, MockHttpTransport::new());

        uploader.check_connection().await;
        assert!(uploader.wifi_connected());
    }

    #[test]
    fn test_rssi_sentinel_when_disconnected() {
        let (down, _clock) = uploader(disconnected_link(), MockHttpTransport::new());
        assert_eq!(down.get_rssi(), 0);

        let (up, _clock) = uploader(connected_link(), MockHttpTransport::new());
        assert_eq!(up.get_rssi(), -61);
    }

    #[tokio::test]
    async fn test_disconnect_clears_flag() {
        let mut link = connected_link();
        link.expect_disconnect().times(1).returning(|| Ok(()));
        let (mut uploader, _clock) = uploader(link, MockHttpTransport::new());

        assert!(uploader.connect_wifi().await);
        uploader.disconnect().await;
        assert!(!uploader.wifi_connected());
    }

    #[test]
    fn test_payload_matches_record_json() {
        let (uploader, _clock) = uploader(connected_link(), MockHttpTransport::new());
        let payload = uploader.create_json_payload(&record()).unwrap();
        assert!(payload.starts_with(r#"{"bus_id":"BUS_001","timestamp":"2026-10-19T08:15:00Z","latitude":51.5"#));
    }
}
