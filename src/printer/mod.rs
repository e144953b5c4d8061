//! # Printer Module
//!
//! Printer settings and the connection manager.
//!
//! ## Modules
//!
//! - [`config`]: Vendor allow-list and receipt layout settings
//! - [`connection`]: [`ReceiptPrinter`], the connect/print/disconnect state machine

pub mod config;
pub mod connection;

pub use config::PrinterConfig;
pub use connection::{ConnectionState, PrinterHandle, ReceiptPrinter};
