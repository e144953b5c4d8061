//! # Printer Connection
//!
//! [`ReceiptPrinter`] owns the one printer handle an application talks to.
//!
//! ## Lifecycle
//!
//! ```text
//! Disconnected --connect()--> Connecting --ok--> Connected --disconnect()--> Disconnected
//!                                  |
//!                                  +--error--> Disconnected
//! ```
//!
//! Only one connect attempt runs at a time; a second caller gets `Ok(false)`
//! and no device request is made. Calling `connect()` while already connected
//! is a no-op that returns `Ok(true)`. A failed print does not change state;
//! if the device went away, [`ReceiptPrinter::is_connected`] reports it on
//! the next check.
//!
//! Print calls are queued: each job holds the printer for its whole frame
//! sequence, so two receipts never interleave on paper.
//!
//! ## Example
//!
//! ```
//! use posprint::printer::{PrinterConfig, ReceiptPrinter};
//! use posprint::transport::MockHost;
//!
//! # tokio_test_block_on(async {
//! let printer = ReceiptPrinter::new(MockHost::new(), PrinterConfig::default());
//! assert!(printer.connect().await?);
//! printer.print_test().await?;
//! printer.disconnect().await;
//! # Ok::<(), posprint::Error>(())
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use super::config::{DEFAULT_CONFIGURATION, PRINTER_VENDORS, PrinterConfig};
use crate::document::ReceiptDocument;
use crate::error::{ConnectError, PrintError, UsbError};
use crate::job::PrintJob;
use crate::protocol::commands::INIT;
use crate::receipt;
use crate::transport::{self, Endpoint, UsbDevice, UsbHost};

/// Where the connection manager is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// An opened, configured and claimed printer.
#[derive(Debug)]
pub struct PrinterHandle<D> {
    device: D,
    configuration: u8,
    interface: u8,
    endpoint: Endpoint,
}

impl<D: UsbDevice> PrinterHandle<D> {
    pub fn configuration(&self) -> u8 {
        self.configuration
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.device.is_opened()
    }
}

/// Holds the connecting flag for the duration of one attempt.
///
/// Released on drop, so early returns and a dropped `connect()` future both
/// clear it.
struct ConnectingGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ConnectingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ConnectError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self { flag })
            .map_err(|_| ConnectError::AlreadyConnecting)
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// # Receipt Printer
///
/// Connection manager plus print entry points for a single USB printer.
/// Create one per application and pass it to whatever needs to print.
pub struct ReceiptPrinter<H: UsbHost> {
    host: H,
    config: PrinterConfig,
    slot: Mutex<Option<Arc<PrinterHandle<H::Device>>>>,
    connecting: AtomicBool,
    queue: tokio::sync::Mutex<()>,
}

impl<H: UsbHost> ReceiptPrinter<H> {
    pub fn new(host: H, config: PrinterConfig) -> Self {
        Self {
            host,
            config,
            slot: Mutex::new(None),
            connecting: AtomicBool::new(false),
            queue: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PrinterConfig {
        &self.config
    }

    /// Whether the host can reach USB devices at all.
    pub fn is_supported(&self) -> bool {
        self.host.is_supported()
    }

    /// True iff a handle is stored and its device reports itself open.
    pub fn is_connected(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|h| h.is_open())
    }

    pub fn state(&self) -> ConnectionState {
        if self.connecting.load(Ordering::Acquire) {
            ConnectionState::Connecting
        } else if self.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Endpoint of the current connection.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.slot.lock().as_ref().map(|h| h.endpoint())
    }

    /// The stored printer handle, if any.
    pub fn handle(&self) -> Option<Arc<PrinterHandle<H::Device>>> {
        self.slot.lock().clone()
    }

    fn live_handle(&self) -> Option<Arc<PrinterHandle<H::Device>>> {
        self.slot.lock().as_ref().filter(|h| h.is_open()).cloned()
    }

    // ========================================================================
    // CONNECTION LIFECYCLE
    // ========================================================================

    /// Select, open and claim a printer, then reset it with INIT.
    ///
    /// Returns `Ok(false)` when another attempt is already in flight.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> Result<bool, ConnectError> {
        match self.try_connect().await {
            Ok(()) => Ok(true),
            Err(e) if e.is_soft() => {
                debug!("connect already in progress");
                Ok(false)
            }
            Err(e) => {
                warn!(error = %e, "failed to connect to printer");
                Err(e)
            }
        }
    }

    async fn try_connect(&self) -> Result<(), ConnectError> {
        if !self.host.is_supported() {
            return Err(ConnectError::UnsupportedEnvironment);
        }

        let _guard = ConnectingGuard::acquire(&self.connecting)?;

        if self.is_connected() {
            debug!("printer already connected");
            return Ok(());
        }

        let device = self
            .host
            .request_device(&PRINTER_VENDORS)
            .await
            .map_err(ConnectError::DeviceAccessFailure)?
            .ok_or(ConnectError::NoDeviceSelected)?;

        info!(
            vendor_id = %format!("{:04x}", device.vendor_id()),
            product_id = %format!("{:04x}", device.product_id()),
            "printer selected"
        );

        // A stale handle (device gone) is replaced by this attempt
        let stale = self.slot.lock().take();
        drop(stale);

        device
            .open()
            .await
            .map_err(ConnectError::DeviceAccessFailure)?;

        let (configuration, interface, endpoint) = match claim(&device).await {
            Ok(claimed) => claimed,
            Err(e) => {
                close_quietly(&device).await;
                return Err(e);
            }
        };

        let handle = Arc::new(PrinterHandle {
            device,
            configuration,
            interface,
            endpoint,
        });
        *self.slot.lock() = Some(handle.clone());

        if let Err(e) = transport::write_frame(&handle.device, endpoint.number, &INIT.bytes()).await
        {
            let failed = self.slot.lock().take();
            drop(failed);
            close_quietly(&handle.device).await;
            return Err(ConnectError::DeviceAccessFailure(e));
        }

        info!(
            configuration,
            interface,
            endpoint = endpoint.number,
            "printer connected"
        );
        Ok(())
    }

    /// Close the printer and clear the slot.
    ///
    /// The slot is cleared even if closing fails; the failure is only logged.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let handle = self.slot.lock().take();
        let Some(handle) = handle else {
            return;
        };
        match handle.device.close().await {
            Ok(()) => info!("printer disconnected"),
            Err(e) => warn!(error = %e, "error closing printer"),
        }
    }

    // ========================================================================
    // PRINTING
    // ========================================================================

    /// Print a bill.
    pub async fn print_receipt(&self, receipt: &ReceiptDocument) -> Result<(), PrintError> {
        let job = receipt::receipt_job(receipt, &self.config);
        info!(
            bill_id = %receipt.bill_id,
            items = receipt.items.len(),
            frames = job.len(),
            "printing receipt"
        );
        self.print_job(&job).await
    }

    /// Print the fixed test page.
    pub async fn print_test(&self) -> Result<(), PrintError> {
        let job = receipt::test_page_job(&self.config);
        info!(frames = job.len(), "printing test page");
        self.print_job(&job).await
    }

    /// Send an already-built job.
    ///
    /// Waits for any job in progress, then fails with `NotConnected` before
    /// any transfer if there is no open printer.
    pub async fn print_job(&self, job: &PrintJob) -> Result<(), PrintError> {
        let _turn = self.queue.lock().await;
        let handle = self.live_handle().ok_or(PrintError::NotConnected)?;

        let result = transport::send_job(&handle.device, handle.endpoint.number, job).await;
        match &result {
            Ok(()) => info!("print job sent"),
            Err(e) => warn!(error = %e, "print job aborted"),
        }
        result
    }
}

/// Configure the device and find its bulk-OUT endpoint.
async fn claim<D: UsbDevice>(device: &D) -> Result<(u8, u8, Endpoint), ConnectError> {
    if device.configuration().is_none() {
        debug!(value = DEFAULT_CONFIGURATION, "selecting configuration");
        device
            .select_configuration(DEFAULT_CONFIGURATION)
            .await
            .map_err(ConnectError::DeviceAccessFailure)?;
    }
    let configuration = device.configuration().ok_or_else(|| {
        ConnectError::DeviceAccessFailure(UsbError::Descriptor(
            "no active configuration after select".into(),
        ))
    })?;

    let (interface, endpoint) = configuration
        .printer_endpoint()
        .map_err(ConnectError::DeviceAccessFailure)?;

    device
        .claim_interface(interface)
        .await
        .map_err(ConnectError::DeviceAccessFailure)?;

    let endpoint = endpoint.ok_or(ConnectError::NoOutputEndpoint)?;
    Ok((configuration.value, interface, endpoint))
}

async fn close_quietly<D: UsbDevice>(device: &D) {
    if let Err(e) = device.close().await {
        warn!(error = %e, "error closing printer after failed connect");
    }
}
