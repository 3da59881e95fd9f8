//! Error types for the transport layer

use thiserror::Error;

/// Transport error taxonomy
///
/// Every platform or socket failure is normalized into one of these four
/// variants at the transport boundary; callers never see raw OS errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Device not found, not paired, or not bound to a local endpoint
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Connect, probe or write deadline exceeded
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The remote endpoint refused the connection
    #[error("Connection refused: {0}")]
    Refused(String),

    /// Any other I/O failure (mid-write disconnect, reset, invalid address)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

impl TransportError {
    /// Normalize an `io::Error` into the taxonomy, keeping the context string.
    pub fn from_io(err: std::io::Error, context: &str) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::ConnectionRefused => Self::Refused(format!("{}: {}", context, err)),
            ErrorKind::TimedOut => Self::Timeout(format!("{}: {}", context, err)),
            ErrorKind::NotFound | ErrorKind::AddrNotAvailable => {
                Self::NotFound(format!("{}: {}", context, err))
            }
            _ => Self::Io(err),
        }
    }

    /// Whether the failure was a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
