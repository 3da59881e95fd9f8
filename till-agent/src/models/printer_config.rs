//! Printer configuration model

use serde::{Deserialize, Serialize};
use till_printer::Dialect;

/// How a printer is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Bluetooth,
    Network,
    Usb,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bluetooth => write!(f, "bluetooth"),
            Self::Network => write!(f, "network"),
            Self::Usb => write!(f, "usb"),
        }
    }
}

/// Paper roll width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperWidth {
    /// 57/58 mm rolls, 32 columns at normal font
    Mm58,
    /// 80 mm rolls, 48 columns at normal font
    #[default]
    Mm80,
}

impl PaperWidth {
    /// Printable columns at normal font size
    pub fn columns(&self) -> usize {
        match self {
            Self::Mm58 => 32,
            Self::Mm80 => 48,
        }
    }
}

/// Receipt font size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontSize {
    #[default]
    Normal,
    /// Double height for the body text
    Large,
}

/// Configuration of one physical printer
///
/// Created and edited by the settings UI, persisted in the key-value store,
/// read here at connect time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterConfig {
    pub id: String,
    pub name: String,
    /// MAC address (bluetooth) or host (network)
    pub address: String,
    pub transport: TransportKind,
    /// TCP port, network transport only
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub paper_width: PaperWidth,
    /// Command dialect of the printer brand
    #[serde(default)]
    pub brand: Dialect,

    /// Preferred target for manual prints; at most one per store
    #[serde(default)]
    pub is_default: bool,
    /// Participates in automatic printing
    #[serde(default)]
    pub is_auto_print: bool,
    /// Copies per print job, at least 1
    #[serde(default = "default_copies")]
    pub print_copies: u32,

    // === Formatting ===
    #[serde(default)]
    pub font_size: FontSize,
    /// Print density override (device units), when the firmware supports it
    #[serde(default)]
    pub density: Option<u8>,
    /// Print speed override (device units)
    #[serde(default)]
    pub speed: Option<u8>,
    #[serde(default = "default_true")]
    pub auto_cut: bool,

    // === Section toggles (ANDed with the template's flags) ===
    #[serde(default = "default_true")]
    pub print_store_info: bool,
    #[serde(default = "default_true")]
    pub print_customer_info: bool,
    #[serde(default = "default_true")]
    pub print_item_details: bool,
    #[serde(default = "default_true")]
    pub print_order_notes: bool,
    #[serde(default = "default_true")]
    pub print_footer: bool,
}

fn default_port() -> u16 {
    9100
}

fn default_copies() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl PrinterConfig {
    /// Minimal valid config for the given transport and address
    pub fn new(id: impl Into<String>, transport: TransportKind, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            address: address.into(),
            transport,
            port: default_port(),
            paper_width: PaperWidth::default(),
            brand: Dialect::default(),
            is_default: false,
            is_auto_print: false,
            print_copies: default_copies(),
            font_size: FontSize::default(),
            density: None,
            speed: None,
            auto_cut: true,
            print_store_info: true,
            print_customer_info: true,
            print_item_details: true,
            print_order_notes: true,
            print_footer: true,
        }
    }

    /// Address present, and a usable port for network printers.
    pub fn is_valid(&self) -> bool {
        if self.address.trim().is_empty() {
            return false;
        }
        match self.transport {
            TransportKind::Network => self.port > 0,
            TransportKind::Bluetooth | TransportKind::Usb => true,
        }
    }

    /// Printable columns for this printer's paper
    pub fn columns(&self) -> usize {
        self.paper_width.columns()
    }

    /// Name for logs and device lists, falling back to the address
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.address
        } else {
            &self.name
        }
    }
}
