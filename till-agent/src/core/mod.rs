//! Core module - configuration and service assembly
//!
//! # Contents
//!
//! - [`Config`] - environment-driven agent configuration
//! - [`Services`] - wired service graph with explicit shutdown

pub mod config;
pub mod services;

pub use config::Config;
pub use services::Services;
