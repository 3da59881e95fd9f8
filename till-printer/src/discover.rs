//! Device discovery
//!
//! Scans are bounded: each call runs for at most the given duration and
//! pushes devices into the returned channel as they are found, so consumers
//! observe a growing set instead of one final batch. Dropping the receiver
//! aborts the scan early.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default scan duration
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-host connect timeout for the network sweep
const SWEEP_CONNECT_TIMEOUT: Duration = Duration::from_millis(300);

/// How often the bluetooth scan re-reads the controller's device list
const BT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A device surfaced by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub name: String,
    /// MAC address (bluetooth) or host address (network)
    pub address: String,
}

/// Scan for Bluetooth printers.
///
/// Already-paired devices are emitted immediately (they are the ones most
/// likely to be printers the operator set up earlier); a discovery session
/// then runs until `timeout` and newly visible devices are emitted as the
/// controller reports them. Requires `bluetoothctl` on the host.
pub fn scan_bluetooth(timeout: Duration) -> mpsc::Receiver<DiscoveredDevice> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let mut seen: HashSet<String> = HashSet::new();

        // Paired devices first
        if let Some(devices) = bluetoothctl_devices(true).await {
            for dev in devices {
                if seen.insert(dev.address.clone()) && tx.send(dev).await.is_err() {
                    return;
                }
            }
        }

        // Background discovery session, bounded by the controller itself
        let mut discovery = Command::new("bluetoothctl")
            .arg("--timeout")
            .arg(timeout.as_secs().to_string())
            .arg("scan")
            .arg("on")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .ok();

        if discovery.is_none() {
            warn!("bluetoothctl not available, scan limited to paired devices");
        }

        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            tokio::time::sleep(BT_POLL_INTERVAL).await;

            let Some(devices) = bluetoothctl_devices(false).await else {
                break;
            };
            for dev in devices {
                if seen.insert(dev.address.clone()) && tx.send(dev).await.is_err() {
                    // Receiver gone, stop scanning
                    if let Some(child) = discovery.as_mut() {
                        child.kill().await.ok();
                    }
                    return;
                }
            }
        }

        if let Some(child) = discovery.as_mut() {
            child.kill().await.ok();
        }
        debug!(found = seen.len(), "bluetooth scan finished");
    });

    rx
}

/// Scan the local /24 for hosts listening on `port` (9100 for raw printing).
///
/// Hosts are emitted as they answer. The sweep stops at `timeout` even if
/// addresses remain unprobed.
pub fn scan_network(port: u16, timeout: Duration) -> mpsc::Receiver<DiscoveredDevice> {
    let (tx, rx) = mpsc::channel(32);

    tokio::spawn(async move {
        let Some(local) = local_ipv4() else {
            warn!("no local ipv4 address, skipping network scan");
            return;
        };
        let octets = local.octets();

        let sweep = async {
            let candidates = (1u8..=254)
                .map(|host| Ipv4Addr::new(octets[0], octets[1], octets[2], host))
                .filter(|ip| *ip != local);

            let mut probes = futures::stream::iter(candidates)
                .map(|ip| async move {
                    let addr = format!("{}:{}", ip, port);
                    match tokio::time::timeout(SWEEP_CONNECT_TIMEOUT, TcpStream::connect(&addr))
                        .await
                    {
                        Ok(Ok(_)) => Some(ip),
                        _ => None,
                    }
                })
                .buffer_unordered(32);

            while let Some(hit) = probes.next().await {
                if let Some(ip) = hit {
                    let dev = DiscoveredDevice {
                        name: format!("Printer {}", ip),
                        address: ip.to_string(),
                    };
                    if tx.send(dev).await.is_err() {
                        return;
                    }
                }
            }
        };

        if tokio::time::timeout(timeout, sweep).await.is_err() {
            debug!("network scan hit its deadline");
        }
    });

    rx
}

/// Parse `bluetoothctl devices [Paired]` output.
///
/// Lines look like `Device 00:11:62:AA:BB:CC TSP100-BB:CC`. Returns `None`
/// when the tool is missing or errored, so callers can distinguish "no
/// devices" from "no controller".
async fn bluetoothctl_devices(paired_only: bool) -> Option<Vec<DiscoveredDevice>> {
    let mut cmd = Command::new("bluetoothctl");
    cmd.arg("devices");
    if paired_only {
        cmd.arg("Paired");
    }

    let output = cmd.output().await.ok()?;
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut devices = Vec::new();
    for line in stdout.lines() {
        let mut parts = line.trim().splitn(3, ' ');
        if parts.next() != Some("Device") {
            continue;
        }
        let Some(address) = parts.next() else {
            continue;
        };
        if !crate::transport::bluetooth::is_valid_mac(address) {
            continue;
        }
        let name = parts.next().unwrap_or(address).to_string();
        devices.push(DiscoveredDevice {
            name,
            address: address.to_string(),
        });
    }
    Some(devices)
}

/// Local IPv4 address, learned from a routed (never sent) UDP socket.
fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:9").ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() => Some(ip),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scan_network_emits_local_listener() {
        // A listener on an ephemeral port of this machine's own /24 is not
        // reachable deterministically in CI, so only check the scan finishes
        // and the channel closes by the deadline.
        let mut rx = scan_network(9_100, Duration::from_millis(300));
        let started = std::time::Instant::now();
        while rx.recv().await.is_some() {}
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_dropping_receiver_stops_scan() {
        let rx = scan_network(9_100, Duration::from_secs(30));
        drop(rx);
        // Nothing to assert beyond "does not hang": the spawned task exits
        // on its first failed send.
    }
}
