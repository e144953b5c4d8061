//! # Printer Configuration
//!
//! Receipt layout settings and the USB vendor allow-list.
//!
//! ## Vendor Allow-List
//!
//! Device selection is filtered to vendors known to ship ESC/POS receipt
//! printers (or the USB bridge chips inside them):
//!
//! | Vendor ID | Vendor |
//! |-----------|--------|
//! | 0x0483 | STMicroelectronics |
//! | 0x0416 | Winbond |
//! | 0x0DD4 | Custom Engineering |
//! | 0x04B8 | Seiko Epson |
//! | 0x0519 | Star Micronics |
//! | 0x0FE6 | ICS Advent |
//! | 0x1FC9 | NXP |
//! | 0x20D1 | Simba |
//! | 0x0525 | Netchip |
//! | 0x28E9 | GigaDevice |
//!
//! The list is fixed; it is not part of [`PrinterConfig`].
//!
//! ## Usage
//!
//! ```
//! use posprint::printer::PrinterConfig;
//!
//! let config = PrinterConfig::default();
//! assert_eq!(config.line_spacing, 60);
//! assert_eq!(config.currency, "Rs.");
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::protocol::text::TextEncoding;

/// A vendor-id match rule handed to the host's device request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: u16,
    pub vendor: &'static str,
}

impl DeviceFilter {
    pub const fn new(vendor_id: u16, vendor: &'static str) -> Self {
        Self { vendor_id, vendor }
    }

    pub fn matches(&self, vendor_id: u16) -> bool {
        self.vendor_id == vendor_id
    }
}

/// Vendors whose devices may be selected as a receipt printer.
pub const PRINTER_VENDORS: [DeviceFilter; 10] = [
    DeviceFilter::new(0x0483, "STMicroelectronics"),
    DeviceFilter::new(0x0416, "Winbond"),
    DeviceFilter::new(0x0DD4, "Custom Engineering"),
    DeviceFilter::new(0x04B8, "Seiko Epson"),
    DeviceFilter::new(0x0519, "Star Micronics"),
    DeviceFilter::new(0x0FE6, "ICS Advent"),
    DeviceFilter::new(0x1FC9, "NXP"),
    DeviceFilter::new(0x20D1, "Simba"),
    DeviceFilter::new(0x0525, "Netchip"),
    DeviceFilter::new(0x28E9, "GigaDevice"),
];

/// Name of an allowed vendor.
pub fn vendor_name(vendor_id: u16) -> Option<&'static str> {
    PRINTER_VENDORS
        .iter()
        .find(|f| f.matches(vendor_id))
        .map(|f| f.vendor)
}

/// Configuration value selected when a device comes up unconfigured.
pub const DEFAULT_CONFIGURATION: u8 = 1;

/// Characters per separator line (58mm paper, Font A).
pub const SEPARATOR_WIDTH: usize = 32;

/// # Printer Configuration
///
/// Layout knobs for the receipt encoder. The defaults reproduce the standard
/// receipt byte-for-byte; override them from a JSON file with
/// [`PrinterConfig::load`]. Missing keys keep their defaults.
///
/// ```json
/// { "currency": "NPR", "footer": ["Dhanyabad!", "See you soon"], "encoding": "cp437" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PrinterConfig {
    /// `ESC 3 n` value sent after INIT, in dot units.
    pub line_spacing: u8,

    /// Literal prefix on subtotal, discount and total lines.
    pub currency: String,

    /// The two centered lines printed after the payment line.
    pub footer: [String; 2],

    /// Byte encoding for text frames.
    pub encoding: TextEncoding,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            line_spacing: 60,
            currency: "Rs.".to_string(),
            footer: [
                "Thank you for dining with us!".to_string(),
                "Please visit again".to_string(),
            ],
            encoding: TextEncoding::Utf8,
        }
    }
}

impl PrinterConfig {
    /// Read a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }
}
