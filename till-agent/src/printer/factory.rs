//! Transport construction
//!
//! The manager never builds sockets itself; it asks a factory. Tests inject a
//! factory producing mock transports, production wires the default one.

use std::time::Duration;

use till_printer::{
    BluetoothTransport, CONNECT_TIMEOUT, NetworkTransport, PROBE_TIMEOUT, Transport,
    TransportError, TransportResult,
};

use crate::models::{PrinterConfig, TransportKind};

/// Produces a fresh transport for a printer config
pub trait TransportFactory: Send + Sync {
    fn create(&self, config: &PrinterConfig) -> TransportResult<Box<dyn Transport>>;
}

/// Factory for the real Bluetooth and network transports
pub struct DefaultTransportFactory {
    connect_timeout: Duration,
    probe_timeout: Duration,
}

impl DefaultTransportFactory {
    pub fn new(connect_timeout: Duration, probe_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            probe_timeout,
        }
    }
}

impl Default for DefaultTransportFactory {
    fn default() -> Self {
        Self::new(CONNECT_TIMEOUT, PROBE_TIMEOUT)
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn create(&self, config: &PrinterConfig) -> TransportResult<Box<dyn Transport>> {
        match config.transport {
            TransportKind::Network => Ok(Box::new(
                NetworkTransport::new(config.address.clone(), config.port)
                    .with_connect_timeout(self.connect_timeout)
                    .with_probe_timeout(self.probe_timeout),
            )),
            TransportKind::Bluetooth => Ok(Box::new(
                BluetoothTransport::new(config.address.clone())
                    .with_connect_timeout(self.connect_timeout),
            )),
            TransportKind::Usb => Err(TransportError::NotFound(format!(
                "usb transport is not supported on this host: {}",
                config.address
            ))),
        }
    }
}
