//! # Native USB Transport
//!
//! libusb access through `rusb`. There is no chooser dialog here: "selection"
//! takes the first attached device whose vendor id passes the filters,
//! optionally narrowed to one vendor/product pair.
//!
//! ## Linux Setup
//!
//! Most receipt printers are grabbed by the `usblp` kernel driver. The
//! backend asks libusb to detach it while the interface is claimed. Without
//! root you also need a udev rule granting access, e.g.:
//!
//! ```text
//! SUBSYSTEM=="usb", ATTR{idVendor}=="04b8", MODE="0666"
//! ```
//!
//! Bulk writes run on the blocking pool with no timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusb::{Context, DeviceHandle, UsbContext};
use tracing::{debug, warn};

use super::{
    AlternateSetting, Configuration, Direction, Endpoint, Interface, TransferResult,
    TransferStatus, TransferType, UsbDevice, UsbHost,
};
use crate::error::UsbError;
use crate::printer::config::{DeviceFilter, vendor_name};

/// libusb treats a zero timeout as "wait forever".
const NO_TIMEOUT: Duration = Duration::ZERO;

fn backend_error(e: rusb::Error) -> UsbError {
    UsbError::Backend(e.to_string())
}

fn convert_direction(direction: rusb::Direction) -> Direction {
    match direction {
        rusb::Direction::In => Direction::In,
        rusb::Direction::Out => Direction::Out,
    }
}

fn convert_transfer_type(transfer_type: rusb::TransferType) -> TransferType {
    match transfer_type {
        rusb::TransferType::Control => TransferType::Control,
        rusb::TransferType::Isochronous => TransferType::Isochronous,
        rusb::TransferType::Bulk => TransferType::Bulk,
        rusb::TransferType::Interrupt => TransferType::Interrupt,
    }
}

/// Outcome of a bulk write as a transfer result.
///
/// Stall and babble become statuses; everything else stays an error.
fn transfer_outcome(result: Result<usize, rusb::Error>) -> Result<TransferResult, UsbError> {
    match result {
        Ok(written) => Ok(TransferResult::ok(written)),
        Err(rusb::Error::Pipe) => Ok(TransferResult {
            bytes_written: 0,
            status: TransferStatus::Stall,
        }),
        Err(rusb::Error::Overflow) => Ok(TransferResult {
            bytes_written: 0,
            status: TransferStatus::Babble,
        }),
        Err(e) => Err(backend_error(e)),
    }
}

fn convert_configuration(descriptor: &rusb::ConfigDescriptor) -> Configuration {
    let interfaces = descriptor
        .interfaces()
        .map(|interface| Interface {
            number: interface.number(),
            alternates: interface
                .descriptors()
                .map(|alt| AlternateSetting {
                    endpoints: alt
                        .endpoint_descriptors()
                        .map(|ep| {
                            Endpoint::new(
                                ep.address(),
                                convert_direction(ep.direction()),
                                convert_transfer_type(ep.transfer_type()),
                            )
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    Configuration {
        value: descriptor.number(),
        interfaces,
    }
}

// ============================================================================
// HOST
// ============================================================================

/// An attached device that passed the vendor allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub bus: u8,
    pub address: u8,
    pub vendor_id: u16,
    pub product_id: u16,
    pub vendor: &'static str,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: ID {:04x}:{:04x} {}",
            self.bus, self.address, self.vendor_id, self.product_id, self.vendor
        )
    }
}

/// libusb-backed [`UsbHost`].
pub struct RusbHost {
    context: Context,
    vendor_id: Option<u16>,
    product_id: Option<u16>,
}

impl RusbHost {
    pub fn new() -> Result<Self, UsbError> {
        Ok(Self {
            context: Context::new().map_err(backend_error)?,
            vendor_id: None,
            product_id: None,
        })
    }

    /// Only select devices with these ids. The vendor must still be on the
    /// allow-list.
    pub fn select(mut self, vendor_id: Option<u16>, product_id: Option<u16>) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    fn wanted(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id.is_none_or(|v| v == vendor_id)
            && self.product_id.is_none_or(|p| p == product_id)
    }

    /// Attached devices from known receipt printer vendors.
    pub fn list_devices(&self) -> Result<Vec<DeviceInfo>, UsbError> {
        let devices = self.context.devices().map_err(backend_error)?;
        let mut found = Vec::new();
        for device in devices.iter() {
            let Ok(descriptor) = device.device_descriptor() else {
                continue;
            };
            if let Some(vendor) = vendor_name(descriptor.vendor_id()) {
                found.push(DeviceInfo {
                    bus: device.bus_number(),
                    address: device.address(),
                    vendor_id: descriptor.vendor_id(),
                    product_id: descriptor.product_id(),
                    vendor,
                });
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl UsbHost for RusbHost {
    type Device = RusbDevice;

    // True on any libusb >= 1.0.9. The real capability check is the
    // `Context::new()` in `RusbHost::new`, which fails without libusb access.
    fn is_supported(&self) -> bool {
        rusb::has_capability()
    }

    async fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> Result<Option<RusbDevice>, UsbError> {
        let devices = self.context.devices().map_err(backend_error)?;
        for device in devices.iter() {
            let descriptor = match device.device_descriptor() {
                Ok(d) => d,
                Err(e) => {
                    debug!(error = %e, "skipping device without descriptor");
                    continue;
                }
            };
            let (vendor_id, product_id) = (descriptor.vendor_id(), descriptor.product_id());
            if filters.iter().any(|f| f.matches(vendor_id)) && self.wanted(vendor_id, product_id) {
                return Ok(Some(RusbDevice {
                    device,
                    vendor_id,
                    product_id,
                    handle: Mutex::new(None),
                    claimed: Mutex::new(Vec::new()),
                }));
            }
        }
        Ok(None)
    }
}

// ============================================================================
// DEVICE
// ============================================================================

/// A device found by [`RusbHost`].
pub struct RusbDevice {
    device: rusb::Device<Context>,
    vendor_id: u16,
    product_id: u16,
    handle: Mutex<Option<Arc<DeviceHandle<Context>>>>,
    claimed: Mutex<Vec<u8>>,
}

impl RusbDevice {
    fn handle(&self) -> Result<Arc<DeviceHandle<Context>>, UsbError> {
        self.handle.lock().clone().ok_or(UsbError::NotOpen)
    }

    /// Run a `&mut` handle operation. Fails while a transfer holds the handle.
    fn with_handle_mut<T>(
        &self,
        f: impl FnOnce(&mut DeviceHandle<Context>) -> rusb::Result<T>,
    ) -> Result<T, UsbError> {
        let mut slot = self.handle.lock();
        let handle = slot.as_mut().ok_or(UsbError::NotOpen)?;
        let handle = Arc::get_mut(handle)
            .ok_or_else(|| UsbError::Backend("device busy with a transfer".into()))?;
        f(handle).map_err(backend_error)
    }
}

#[async_trait]
impl UsbDevice for RusbDevice {
    fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    fn product_id(&self) -> u16 {
        self.product_id
    }

    fn is_opened(&self) -> bool {
        self.handle.lock().is_some()
    }

    fn configuration(&self) -> Option<Configuration> {
        match self.device.active_config_descriptor() {
            Ok(descriptor) => Some(convert_configuration(&descriptor)),
            Err(rusb::Error::NotFound) => None,
            Err(e) => {
                debug!(error = %e, "could not read active configuration");
                None
            }
        }
    }

    async fn open(&self) -> Result<(), UsbError> {
        let mut handle = self.device.open().map_err(backend_error)?;
        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(e) => warn!(error = %e, "could not enable kernel driver auto-detach"),
        }
        *self.handle.lock() = Some(Arc::new(handle));
        Ok(())
    }

    async fn close(&self) -> Result<(), UsbError> {
        let claimed = std::mem::take(&mut *self.claimed.lock());
        let handle = self.handle.lock().take();
        let Some(mut handle) = handle else {
            return Ok(());
        };

        // Dropping the last reference closes the libusb handle
        let Some(handle) = Arc::get_mut(&mut handle) else {
            debug!("transfer in flight, handle closes when it completes");
            return Ok(());
        };
        let mut result = Ok(());
        for number in claimed {
            if let Err(e) = handle.release_interface(number) {
                result = Err(backend_error(e));
            }
        }
        result
    }

    async fn select_configuration(&self, value: u8) -> Result<(), UsbError> {
        self.with_handle_mut(|h| h.set_active_configuration(value))
    }

    async fn claim_interface(&self, number: u8) -> Result<(), UsbError> {
        self.with_handle_mut(|h| h.claim_interface(number))?;
        self.claimed.lock().push(number);
        Ok(())
    }

    async fn transfer_out(&self, endpoint: u8, data: &[u8]) -> Result<TransferResult, UsbError> {
        let handle = self.handle()?;
        let data = data.to_vec();
        let result = tokio::task::spawn_blocking(move || {
            handle.write_bulk(endpoint, &data, NO_TIMEOUT)
        })
        .await
        .map_err(|e| UsbError::Backend(format!("transfer task failed: {e}")))?;

        if let Err(rusb::Error::NoDevice) = result {
            warn!("printer disappeared during transfer");
            self.handle.lock().take();
        }
        transfer_outcome(result)
    }
}
