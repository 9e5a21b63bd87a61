//! Wi-Fi link abstraction and the NetworkManager-backed implementation

use crate::error::{Result, TelemetryNodeError};
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Default sysfs directory holding per-interface state
pub const SYSFS_NET_DIR: &str = "/sys/class/net";

/// Kernel wireless statistics table
pub const PROC_NET_WIRELESS: &str = "/proc/net/wireless";

/// Station-mode wireless link
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WifiLink: Send {
    /// Start association with the given network
    ///
    /// Returning `Ok` means the request was accepted, not that the link is
    /// up; callers poll [`is_connected`](WifiLink::is_connected).
    ///
    /// # Errors
    ///
    /// Returns error if the association request could not be issued
    async fn begin(&mut self, ssid: &str, password: &str) -> Result<()>;

    /// Live link state
    fn is_connected(&self) -> bool;

    /// Signal level in dBm, `None` if unavailable
    fn rssi(&self) -> Option<i32>;

    /// Drop the association
    ///
    /// # Errors
    ///
    /// Returns error if the disconnect request could not be issued
    async fn disconnect(&mut self) -> Result<()>;
}

/// Wi-Fi link driven through `nmcli`
///
/// Association goes through NetworkManager; link state and signal level are
/// read straight from the kernel so polling does not spawn processes.
#[derive(Debug, Clone)]
pub struct NmcliLink {
    interface: String,
    sysfs_net_dir: PathBuf,
    proc_wireless: PathBuf,
    wait_secs: u64,
}

impl NmcliLink {
    /// Create a link for the given interface (e.g., "wlan0")
    ///
    /// `wait_secs` bounds how long `nmcli` itself may block on association.
    pub fn new(interface: impl Into<String>, wait_secs: u64) -> Self {
        Self::with_paths(interface, wait_secs, SYSFS_NET_DIR, PROC_NET_WIRELESS)
    }

    /// Create a link reading state from non-default locations
    pub fn with_paths(
        interface: impl Into<String>,
        wait_secs: u64,
        sysfs_net_dir: impl Into<PathBuf>,
        proc_wireless: impl Into<PathBuf>,
    ) -> Self {
        Self {
            interface: interface.into(),
            sysfs_net_dir: sysfs_net_dir.into(),
            proc_wireless: proc_wireless.into(),
            wait_secs,
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Run `nmcli`, optionally answering its secret prompt on stdin
    async fn nmcli(&self, args: &[String], secret: Option<&str>) -> Result<()> {
        let run_failed =
            |e: std::io::Error| TelemetryNodeError::Network(format!("Failed to run nmcli: {}", e));

        let mut child = Command::new("nmcli")
            .args(args)
            .stdin(if secret.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(run_failed)?;

        if let (Some(secret), Some(mut stdin)) = (secret, child.stdin.take()) {
            stdin
                .write_all(format!("{}\n", secret).as_bytes())
                .await
                .map_err(run_failed)?;
        }

        let output = child.wait_with_output().await.map_err(run_failed)?;

        if output.status.success() {
            Ok(())
        } else {
            Err(TelemetryNodeError::Network(format!(
                "nmcli exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// Arguments for an association request
///
/// With a password, `--ask` makes nmcli prompt for it on stdin so it never
/// shows up in the process list.
fn connect_args(wait_secs: u64, ssid: &str, interface: &str, ask_password: bool) -> Vec<String> {
    let mut args = Vec::new();
    if ask_password {
        args.push("--ask".to_string());
    }
    args.extend(["--wait".to_string(), wait_secs.max(1).to_string()]);
    args.extend(["device", "wifi", "connect", ssid, "ifname", interface].map(String::from));
    args
}

#[async_trait]
impl WifiLink for NmcliLink {
    async fn begin(&mut self, ssid: &str, password: &str) -> Result<()> {
        let secret = (!password.is_empty()).then_some(password);
        let args = connect_args(self.wait_secs, ssid, &self.interface, secret.is_some());

        debug!("Requesting association with {} on {}", ssid, self.interface);
        self.nmcli(&args, secret).await
    }

    fn is_connected(&self) -> bool {
        let path = self.sysfs_net_dir.join(&self.interface).join("operstate");
        fs::read_to_string(path)
            .map(|state| state.trim() == "up")
            .unwrap_or(false)
    }

    fn rssi(&self) -> Option<i32> {
        let contents = fs::read_to_string(&self.proc_wireless).ok()?;
        parse_proc_wireless(&contents, &self.interface)
    }

    async fn disconnect(&mut self) -> Result<()> {
        let args = ["device", "disconnect", self.interface.as_str()].map(String::from);
        self.nmcli(&args, None).await
    }
}

/// Extract the signal level (dBm) for `interface` from `/proc/net/wireless`
///
/// The table has two header lines followed by one row per interface:
///
/// ```text
/// Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
///  face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
///  wlan0: 0000   54.  -56.  -256        0      0      0      0      0        0
/// ```
///
/// # Examples
///
/// ```
/// use thermora_node::network::link::parse_proc_wireless;
///
/// let table = " wlan0: 0000   54.  -56.  -256        0      0      0      0      0        0\n";
/// assert_eq!(parse_proc_wireless(table, "wlan0"), Some(-56));
/// ```
pub fn parse_proc_wireless(contents: &str, interface: &str) -> Option<i32> {
    contents.lines().find_map(|line| {
        let (name, rest) = line.split_once(':')?;
        if name.trim() != interface {
            return None;
        }
        // status, link quality, signal level
        let level = rest.split_whitespace().nth(2)?;
        let level: f64 = level.trim_end_matches('.').parse().ok()?;
        Some(level as i32)
    })
}
