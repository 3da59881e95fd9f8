//! Automatic printing
//!
//! # Contents
//!
//! - [`AutoPrintCoordinator`] - new-order events → de-duplicated, retried
//!   print dispatch
//! - [`PrintOutcome`] - terminal job results for UI feedback

pub mod coordinator;

pub use coordinator::{AutoPrintCoordinator, BACKOFF_STEP, MAX_ATTEMPTS, PrintOutcome};
