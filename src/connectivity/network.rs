//! Network link on a Linux interface
//!
//! Link state comes from `/sys/class/net/<iface>/operstate`. When an SSID is
//! configured a down link is rejoined through NetworkManager's `nmcli`;
//! otherwise the OS is expected to bring the link back and each attempt only
//! re-checks it.

use super::{ConnectivityError, NetworkLink};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Wireless (or any) uplink interface
#[derive(Debug, Clone)]
pub struct WifiLink {
    interface: String,
    ssid: Option<String>,
    password: Option<String>,
    sysfs_net: PathBuf,
}

impl WifiLink {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ssid: None,
            password: None,
            sysfs_net: PathBuf::from("/sys/class/net"),
        }
    }

    /// Join this network when the link is found down
    pub fn with_credentials(mut self, ssid: impl Into<String>, password: Option<String>) -> Self {
        self.ssid = Some(ssid.into());
        self.password = password;
        self
    }

    /// Read interface state from another sysfs root
    pub fn with_sysfs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.sysfs_net = root.into();
        self
    }

    fn operstate_path(&self) -> PathBuf {
        self.sysfs_net.join(&self.interface).join("operstate")
    }

    async fn join(&self, ssid: &str) {
        let mut command = Command::new("nmcli");
        command.args(["device", "wifi", "connect", ssid]);
        if let Some(password) = &self.password {
            command.args(["password", password.as_str()]);
        }
        command.args(["ifname", self.interface.as_str()]);

        match command.output().await {
            Ok(output) if output.status.success() => {
                debug!(ssid, interface = %self.interface, "nmcli join succeeded");
            }
            Ok(output) => {
                warn!(
                    ssid,
                    status = %output.status,
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "nmcli join failed"
                );
            }
            Err(e) => warn!(ssid, "Failed to run nmcli: {}", e),
        }
    }
}

#[async_trait]
impl NetworkLink for WifiLink {
    async fn is_connected(&self) -> bool {
        match tokio::fs::read_to_string(self.operstate_path()).await {
            Ok(state) => state.trim() == "up",
            Err(_) => false,
        }
    }

    async fn try_connect(&mut self) -> Result<(), ConnectivityError> {
        if self.is_connected().await {
            return Ok(());
        }
        if let Some(ssid) = self.ssid.clone() {
            self.join(&ssid).await;
        }
        if self.is_connected().await {
            Ok(())
        } else {
            Err(ConnectivityError::LinkDown {
                interface: self.interface.clone(),
            })
        }
    }
}
