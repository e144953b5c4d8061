//! # Error Types
//!
//! This module defines error types used throughout the posprint library.
//!
//! Connection errors go back to the caller for display; nothing here is
//! retried automatically. A failed connect needs a fresh, user-initiated
//! attempt, and a failed print is never resent because the printer may
//! already have emitted part of it.

use thiserror::Error;

/// Failure reported by the host USB layer.
#[derive(Debug, Error)]
pub enum UsbError {
    /// Operation on a device that is not open (or was closed underneath us)
    #[error("device is not open")]
    NotOpen,

    /// The endpoint returned a STALL
    #[error("transfer stalled on endpoint {0}")]
    Stall(u8),

    /// The device sent more data than expected
    #[error("babble on endpoint {0}")]
    Babble(u8),

    /// Fewer bytes accepted than were offered
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Missing or malformed descriptors
    #[error("descriptor error: {0}")]
    Descriptor(String),

    /// Anything else the backend reports
    #[error("USB error: {0}")]
    Backend(String),
}

/// Errors from [`ReceiptPrinter::connect`](crate::printer::ReceiptPrinter::connect).
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The host has no USB access capability
    #[error("USB access is not supported in this environment")]
    UnsupportedEnvironment,

    /// Another connect attempt is in flight.
    ///
    /// Soft: `connect()` turns this into `Ok(false)`.
    #[error("a connection attempt is already in progress")]
    AlreadyConnecting,

    /// The selection was cancelled or no allowed device is attached
    #[error("no printer selected")]
    NoDeviceSelected,

    /// The first interface has no bulk OUT endpoint
    #[error("no bulk OUT endpoint found")]
    NoOutputEndpoint,

    /// Open, configure, claim or INIT failed
    #[error("printer access failed: {0}")]
    DeviceAccessFailure(#[source] UsbError),
}

impl ConnectError {
    /// Expected during normal use and not reported to the user.
    pub fn is_soft(&self) -> bool {
        matches!(self, ConnectError::AlreadyConnecting)
    }
}

/// Errors from printing a job.
#[derive(Debug, Error)]
pub enum PrintError {
    /// No open printer handle
    #[error("printer not connected")]
    NotConnected,

    /// A transfer failed; frames before `frame` were sent, none after.
    #[error("transfer of frame {frame} failed: {source}")]
    TransportFailure {
        frame: usize,
        #[source]
        source: UsbError,
    },
}

/// Errors loading a [`PrinterConfig`](crate::printer::PrinterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Main error type for posprint operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Usb(#[from] UsbError),

    /// Malformed receipt input
    #[error("invalid receipt: {0}")]
    Receipt(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
