//! Printer management
//!
//! # Contents
//!
//! - [`PrinterManager`] - per-printer connection state machine
//! - [`StatusStream`] - push-based status observation
//! - [`TransportFactory`] - injectable transport construction
//! - [`PrinterOperationError`] - manager-boundary errors

pub mod error;
pub mod factory;
pub mod manager;

pub use error::{PrinterOpResult, PrinterOperationError};
pub use factory::{DefaultTransportFactory, TransportFactory};
pub use manager::{INTER_COPY_DELAY, PrinterManager, StatusStream};
