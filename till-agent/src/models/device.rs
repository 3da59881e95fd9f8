//! Printer status and discovered-device models

use serde::{Deserialize, Serialize};

use super::printer_config::TransportKind;

/// Connection state of one printer, the single source of truth for observers
///
/// Transitions: `Disconnected → Connecting → Connected`; `Error` is reachable
/// from `Connecting`/`Connected` and immediately decays to `Disconnected`
/// after being emitted once. `Disconnected` is reachable from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// A device surfaced by a scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterDevice {
    pub name: String,
    /// MAC address (bluetooth) or host (network)
    pub address: String,
    pub transport: TransportKind,
    pub status: PrinterStatus,
}
