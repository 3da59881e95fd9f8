//! Manager-boundary error types

use thiserror::Error;

/// Errors surfaced by printer-manager operations
///
/// Transport failures never appear here: they are normalized inside the
/// manager and reported as a boolean outcome plus a status downgrade, so the
/// caller decides whether to retry.
#[derive(Debug, Error)]
pub enum PrinterOperationError {
    /// The config is missing or fails validation
    #[error("Printer not configured: {0}")]
    NotConfigured(String),

    /// The licensing gate denied the operation
    #[error("Printing is not eligible under the current license")]
    NotEligible,

    /// A conflicting operation is already running
    #[error("Operation already in progress: {0}")]
    AlreadyInProgress(String),
}

/// Result type for manager operations
pub type PrinterOpResult<T> = Result<T, PrinterOperationError>;
