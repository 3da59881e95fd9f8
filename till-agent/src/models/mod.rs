//! Domain models
//!
//! # Contents
//!
//! - [`PrinterConfig`] - identity and formatting of one physical printer
//! - [`TemplateConfig`] - visibility flags of one receipt template
//! - [`Order`] - the payload of a "new order" event
//! - [`PrinterStatus`] / [`PrinterDevice`] - connection state and scan results

pub mod device;
pub mod order;
pub mod printer_config;
pub mod template_config;

pub use device::{PrinterDevice, PrinterStatus};
pub use order::{FulfillmentInfo, ItemOption, Order, OrderItem};
pub use printer_config::{FontSize, PaperWidth, PrinterConfig, TransportKind};
pub use template_config::{SectionState, TemplateConfig, TemplateType};
