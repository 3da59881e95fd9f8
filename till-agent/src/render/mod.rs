//! Receipt rendering
//!
//! # Contents
//!
//! - [`ReceiptRenderer`] - pure order → bytes assembly
//! - [`StoreSnapshot`] - store fields stamped onto receipts
//! - [`test_page`] - manual printer verification page

pub mod receipt;

pub use receipt::{ReceiptRenderer, StoreSnapshot, test_page};
