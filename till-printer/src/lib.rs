//! # till-printer
//!
//! Thermal printer library - low-level printing capabilities only.
//!
//! ## Scope
//!
//! This crate handles HOW to print:
//! - ESC/POS command building (with Star dialect variants)
//! - GBK wire encoding for CJK-capable printers
//! - Network transport (TCP port 9100)
//! - Bluetooth transport (RFCOMM serial)
//! - Bounded device discovery
//!
//! Business logic (WHAT to print) stays in application code: receipt
//! rendering, templates and auto-print policy live in `till-agent`.
//!
//! ## Example
//!
//! ```ignore
//! use till_printer::{Dialect, EscPosBuilder, NetworkTransport, Transport};
//!
//! // Build receipt content
//! let mut builder = EscPosBuilder::new(48, Dialect::EscPos);
//! builder.center();
//! builder.double_size();
//! builder.line("My Store");
//! builder.reset_size();
//! builder.left();
//! builder.line_lr("Total:", "24.90");
//! builder.cut_feed(3);
//!
//! // Send to a network printer
//! let mut transport = NetworkTransport::new("192.168.1.100", 9100);
//! transport.connect().await?;
//! transport.write(&builder.build()).await?;
//! transport.disconnect().await;
//! ```

mod dialect;
mod discover;
mod encoding;
mod error;
mod escpos;
pub mod transport;

// Re-exports
pub use dialect::Dialect;
pub use discover::{DiscoveredDevice, SCAN_TIMEOUT, scan_bluetooth, scan_network};
pub use encoding::{column_width, encode_wire, fit_width, pad_width, wrap_width};
pub use error::{TransportError, TransportResult};
pub use escpos::EscPosBuilder;
pub use transport::{BluetoothTransport, CONNECT_TIMEOUT, NetworkTransport, PROBE_TIMEOUT, Transport};
