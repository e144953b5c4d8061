//! # Printer Transport Layer
//!
//! The host USB capability boundary and the frame-by-frame job writer.
//!
//! ## Capability Interface
//!
//! The printer core needs only a handful of host primitives: a device
//! request filtered by vendor id, open/close, configuration select,
//! interface claim, and bulk-OUT transfer. They are modelled as the
//! [`UsbHost`] and [`UsbDevice`] traits so any environment that offers the
//! same primitives can back a [`ReceiptPrinter`](crate::printer::ReceiptPrinter).
//!
//! ## Available Transports
//!
//! - [`mock`]: Scriptable in-memory host for tests and dry runs
//! - [`usb`]: Native libusb via `rusb` (feature `usb`)

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::error::{PrintError, UsbError};
use crate::job::PrintJob;
use crate::printer::config::DeviceFilter;

pub mod mock;
#[cfg(feature = "usb")]
pub mod usb;

pub use mock::{MockDevice, MockHost};
#[cfg(feature = "usb")]
pub use usb::{RusbDevice, RusbHost};

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Endpoint data direction, from the host's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub number: u8,
    pub direction: Direction,
    pub transfer_type: TransferType,
}

impl Endpoint {
    pub const fn new(number: u8, direction: Direction, transfer_type: TransferType) -> Self {
        Self {
            number,
            direction,
            transfer_type,
        }
    }

    pub fn is_bulk_out(&self) -> bool {
        self.direction == Direction::Out && self.transfer_type == TransferType::Bulk
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlternateSetting {
    pub endpoints: Vec<Endpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub number: u8,
    pub alternates: Vec<AlternateSetting>,
}

/// Snapshot of the active configuration descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub value: u8,
    pub interfaces: Vec<Interface>,
}

impl Configuration {
    /// First bulk-OUT endpoint of the first alternate setting of the first
    /// interface, along with that interface's number.
    ///
    /// `Err` when the configuration has no interface or no alternate setting;
    /// `Ok(None)` when the alternate setting lacks a bulk-OUT endpoint.
    pub fn printer_endpoint(&self) -> Result<(u8, Option<Endpoint>), UsbError> {
        let interface = self
            .interfaces
            .first()
            .ok_or_else(|| UsbError::Descriptor("configuration has no interfaces".into()))?;
        let alternate = interface.alternates.first().ok_or_else(|| {
            UsbError::Descriptor(format!(
                "interface {} has no alternate settings",
                interface.number
            ))
        })?;
        let endpoint = alternate.endpoints.iter().copied().find(Endpoint::is_bulk_out);
        Ok((interface.number, endpoint))
    }
}

/// Completion status of an OUT transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Ok,
    Stall,
    Babble,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferResult {
    pub bytes_written: usize,
    pub status: TransferStatus,
}

impl TransferResult {
    pub fn ok(bytes_written: usize) -> Self {
        Self {
            bytes_written,
            status: TransferStatus::Ok,
        }
    }
}

// ============================================================================
// CAPABILITY TRAITS
// ============================================================================

/// Host-side USB access.
#[async_trait]
pub trait UsbHost: Send + Sync {
    type Device: UsbDevice + 'static;

    /// Whether this environment can reach USB devices at all.
    fn is_supported(&self) -> bool;

    /// Let the user (or a selection policy) pick one device matching
    /// `filters`. `Ok(None)` means cancelled or nothing matched.
    async fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> Result<Option<Self::Device>, UsbError>;
}

/// One physical device as exposed by the host.
///
/// All methods take `&self`; implementations keep their own interior state
/// so a handle can be shared with an in-flight print.
#[async_trait]
pub trait UsbDevice: Send + Sync {
    fn vendor_id(&self) -> u16;

    fn product_id(&self) -> u16;

    fn is_opened(&self) -> bool;

    /// Active configuration, `None` while the device is unconfigured.
    fn configuration(&self) -> Option<Configuration>;

    async fn open(&self) -> Result<(), UsbError>;

    async fn close(&self) -> Result<(), UsbError>;

    async fn select_configuration(&self, value: u8) -> Result<(), UsbError>;

    async fn claim_interface(&self, number: u8) -> Result<(), UsbError>;

    async fn transfer_out(&self, endpoint: u8, data: &[u8]) -> Result<TransferResult, UsbError>;
}

// ============================================================================
// JOB WRITER
// ============================================================================

/// Send one frame's bytes and check the outcome.
pub async fn write_frame<D: UsbDevice + ?Sized>(
    device: &D,
    endpoint: u8,
    data: &[u8],
) -> Result<(), UsbError> {
    let result = device.transfer_out(endpoint, data).await?;
    match result.status {
        TransferStatus::Ok => {}
        TransferStatus::Stall => return Err(UsbError::Stall(endpoint)),
        TransferStatus::Babble => return Err(UsbError::Babble(endpoint)),
    }
    if result.bytes_written != data.len() {
        return Err(UsbError::ShortWrite {
            written: result.bytes_written,
            expected: data.len(),
        });
    }
    Ok(())
}

/// Write every frame of `job` to `endpoint`, one transfer per frame.
///
/// Each transfer completes before the next is issued. The first failure
/// stops the job; whatever was already sent stays printed.
#[instrument(skip(device, job), fields(frames = job.len()))]
pub async fn send_job<D: UsbDevice + ?Sized>(
    device: &D,
    endpoint: u8,
    job: &PrintJob,
) -> Result<(), PrintError> {
    for (frame, data) in job.encoded_frames().enumerate() {
        write_frame(device, endpoint, &data)
            .await
            .map_err(|source| PrintError::TransportFailure { frame, source })?;
    }
    debug!("job written");
    Ok(())
}
