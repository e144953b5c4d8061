//! # posprint - ESC/POS Receipt Printer Driver
//!
//! posprint drives ESC/POS thermal receipt printers over a USB bulk-OUT
//! endpoint. It provides:
//!
//! - **Protocol**: ESC/POS command bytes and text line encoding (UTF-8 or CP437)
//! - **Receipts**: A fixed restaurant bill layout built from a JSON document
//! - **Connection management**: Select, open, configure and claim a printer,
//!   with a single-attempt guard and a serialized print queue
//! - **Transport**: A host USB capability boundary with `rusb` and mock backends
//!
//! ## Quick Start
//!
//! ```no_run
//! use posprint::{PrinterConfig, ReceiptDocument, ReceiptPrinter, RusbHost};
//!
//! # async fn demo() -> Result<(), posprint::Error> {
//! let printer = ReceiptPrinter::new(RusbHost::new()?, PrinterConfig::default());
//! printer.connect().await?;
//!
//! let receipt: ReceiptDocument = serde_json::from_str(r#"{
//!     "restaurantName": "Cafe X", "tableNumber": 4, "billId": "B-102",
//!     "items": [{"name": "Tea", "qty": 2, "price": 50, "total": 100}],
//!     "subtotal": 100, "total": 100, "paymentMethod": "cash"
//! }"#)?;
//! printer.print_receipt(&receipt).await?;
//! printer.disconnect().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`protocol`] | ESC/POS command bytes and text encoding |
//! | [`job`] | Ordered frame sequences |
//! | [`document`] | Receipt input model |
//! | [`receipt`] | Receipt and test page layout |
//! | [`transport`] | USB capability traits and backends |
//! | [`printer`] | Vendor allow-list, settings, connection manager |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Any USB printer from an allow-listed vendor (Seiko Epson, Star Micronics
//! and the controller vendors used by most generic 58/80mm printers, see
//! [`printer::config::PRINTER_VENDORS`]) whose first interface has a bulk-OUT
//! endpoint.

pub mod document;
pub mod error;
pub mod job;
pub mod printer;
pub mod protocol;
pub mod receipt;
pub mod transport;

// Re-exports for convenience
pub use document::ReceiptDocument;
pub use error::Error;
pub use printer::{PrinterConfig, ReceiptPrinter};
pub use transport::MockHost;
#[cfg(feature = "usb")]
pub use transport::RusbHost;
