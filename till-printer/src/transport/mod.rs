//! Printer transport layer
//!
//! A transport is the byte-stream channel to one physical printer. Network
//! (TCP 9100) and Bluetooth (RFCOMM) implementations expose the same
//! contract: connect, write, probe, disconnect. Platform failures are
//! normalized to [`TransportError`](crate::error::TransportError) before they
//! leave this module.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportResult;

pub mod bluetooth;
pub mod network;

pub use bluetooth::BluetoothTransport;
pub use network::NetworkTransport;

/// Default connect timeout
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default probe (liveness) timeout
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(4);

/// ESC/POS real-time status request (DLE EOT 1)
///
/// Safe to send at any time; produces no paper output. A responsive printer
/// answers with one status byte.
pub(crate) const STATUS_QUERY: [u8; 3] = [0x10, 0x04, 0x01];

/// Uniform byte-stream contract to a physical printer.
///
/// A successful `connect` only proves the channel opened; callers that need
/// proof the device is alive must follow up with `probe` (thermal printers
/// routinely accept connections while powered off or out of paper).
#[async_trait]
pub trait Transport: Send {
    /// Open the underlying channel. No-op when already connected.
    async fn connect(&mut self) -> TransportResult<()>;

    /// Write the whole buffer to the device.
    async fn write(&mut self, data: &[u8]) -> TransportResult<()>;

    /// Cheap liveness check; `false` means the device is not answering.
    async fn probe(&mut self) -> bool;

    /// Close and drop the channel. Infallible: a dead peer is already gone.
    async fn disconnect(&mut self);

    /// Whether a live handle is currently held.
    fn is_connected(&self) -> bool;
}
