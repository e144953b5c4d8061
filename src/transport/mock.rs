//! # Mock USB Host
//!
//! An in-memory [`UsbHost`] with one scriptable printer attached. Clones
//! share state, so a test can hand one clone to a `ReceiptPrinter` and keep
//! another to inspect what reached the "device".
//!
//! ```
//! use posprint::transport::MockHost;
//!
//! let host = MockHost::new().preconfigured().fail_transfer_at(3);
//! let probe = host.clone();
//! assert_eq!(probe.request_count(), 0);
//! ```
//!
//! Transfer indices count every transfer the device has seen, including the
//! INIT sent while connecting.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{
    AlternateSetting, Configuration, Direction, Endpoint, Interface, TransferResult,
    TransferStatus, TransferType, UsbDevice, UsbHost,
};
use crate::error::UsbError;
use crate::printer::config::DeviceFilter;

/// Epson TM-T20 ids, a common receipt printer.
pub const MOCK_VENDOR_ID: u16 = 0x04B8;
pub const MOCK_PRODUCT_ID: u16 = 0x0E15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferFault {
    Error,
    Stall,
    Short,
}

#[derive(Debug)]
struct State {
    supported: bool,
    attached: bool,
    vendor_id: u16,
    product_id: u16,
    interfaces: Vec<Interface>,
    active_configuration: Option<u8>,

    fail_open: bool,
    fail_select: bool,
    fail_claim: bool,
    fail_close: bool,
    transfer_fault: Option<(usize, TransferFault)>,

    opened: bool,
    requested_filters: Vec<Vec<u16>>,
    selected_configurations: Vec<u8>,
    claimed_interfaces: Vec<u8>,
    close_count: usize,
    transfer_attempts: usize,
    transfers: Vec<(u8, Vec<u8>)>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            supported: true,
            attached: true,
            vendor_id: MOCK_VENDOR_ID,
            product_id: MOCK_PRODUCT_ID,
            interfaces: vec![Interface {
                number: 0,
                alternates: vec![AlternateSetting {
                    endpoints: vec![
                        Endpoint::new(2, Direction::In, TransferType::Bulk),
                        Endpoint::new(1, Direction::Out, TransferType::Bulk),
                    ],
                }],
            }],
            active_configuration: None,
            fail_open: false,
            fail_select: false,
            fail_claim: false,
            fail_close: false,
            transfer_fault: None,
            opened: false,
            requested_filters: Vec::new(),
            selected_configurations: Vec::new(),
            claimed_interfaces: Vec::new(),
            close_count: 0,
            transfer_attempts: 0,
            transfers: Vec::new(),
        }
    }
}

/// Scriptable host with a single attached printer.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    state: Arc<Mutex<State>>,
    gate: Option<Arc<Notify>>,
}

impl MockHost {
    /// Supported host, one unconfigured printer with a bulk-OUT endpoint 1.
    pub fn new() -> Self {
        Self::default()
    }

    fn with(self, f: impl FnOnce(&mut State)) -> Self {
        f(&mut self.state.lock());
        self
    }

    // === Scripting ===

    pub fn unsupported(self) -> Self {
        self.with(|s| s.supported = false)
    }

    /// Device requests come back empty, as if the user cancelled.
    pub fn no_device(self) -> Self {
        self.with(|s| s.attached = false)
    }

    pub fn with_ids(self, vendor_id: u16, product_id: u16) -> Self {
        self.with(|s| {
            s.vendor_id = vendor_id;
            s.product_id = product_id;
        })
    }

    /// Device reports configuration 1 as already active.
    pub fn preconfigured(self) -> Self {
        self.with(|s| s.active_configuration = Some(1))
    }

    /// Replace the endpoints of interface 0, alternate 0.
    pub fn with_endpoints(self, endpoints: Vec<Endpoint>) -> Self {
        self.with(|s| {
            s.interfaces = vec![Interface {
                number: 0,
                alternates: vec![AlternateSetting { endpoints }],
            }]
        })
    }

    pub fn with_interfaces(self, interfaces: Vec<Interface>) -> Self {
        self.with(|s| s.interfaces = interfaces)
    }

    pub fn fail_open(self) -> Self {
        self.with(|s| s.fail_open = true)
    }

    pub fn fail_select(self) -> Self {
        self.with(|s| s.fail_select = true)
    }

    pub fn fail_claim(self) -> Self {
        self.with(|s| s.fail_claim = true)
    }

    pub fn fail_close(self) -> Self {
        self.with(|s| s.fail_close = true)
    }

    /// Transfer number `n` returns a backend error.
    pub fn fail_transfer_at(self, n: usize) -> Self {
        self.with(|s| s.transfer_fault = Some((n, TransferFault::Error)))
    }

    /// Transfer number `n` completes with STALL status.
    pub fn stall_transfer_at(self, n: usize) -> Self {
        self.with(|s| s.transfer_fault = Some((n, TransferFault::Stall)))
    }

    /// Transfer number `n` accepts one byte fewer than offered.
    pub fn short_write_at(self, n: usize) -> Self {
        self.with(|s| s.transfer_fault = Some((n, TransferFault::Short)))
    }

    /// Hold every device request until the returned [`Notify`] fires.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Simulate the printer dropping off the bus.
    pub fn unplug(&self) {
        self.state.lock().opened = false;
    }

    // === Inspection ===

    pub fn request_count(&self) -> usize {
        self.state.lock().requested_filters.len()
    }

    /// Vendor ids passed to each device request.
    pub fn requested_filters(&self) -> Vec<Vec<u16>> {
        self.state.lock().requested_filters.clone()
    }

    pub fn selected_configurations(&self) -> Vec<u8> {
        self.state.lock().selected_configurations.clone()
    }

    pub fn claimed_interfaces(&self) -> Vec<u8> {
        self.state.lock().claimed_interfaces.clone()
    }

    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    pub fn is_device_open(&self) -> bool {
        self.state.lock().opened
    }

    /// Transfers attempted, successful or not.
    pub fn transfer_attempts(&self) -> usize {
        self.state.lock().transfer_attempts
    }

    /// Payloads of successful transfers, in order.
    pub fn transfers(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .transfers
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Endpoint numbers of successful transfers, in order.
    pub fn transfer_endpoints(&self) -> Vec<u8> {
        self.state.lock().transfers.iter().map(|(ep, _)| *ep).collect()
    }

    /// Everything the printer received, as one stream.
    pub fn received_bytes(&self) -> Vec<u8> {
        self.state
            .lock()
            .transfers
            .iter()
            .flat_map(|(_, data)| data.iter().copied())
            .collect()
    }

    pub fn clear_transfers(&self) {
        self.state.lock().transfers.clear();
    }
}

#[async_trait]
impl UsbHost for MockHost {
    type Device = MockDevice;

    fn is_supported(&self) -> bool {
        self.state.lock().supported
    }

    async fn request_device(
        &self,
        filters: &[DeviceFilter],
    ) -> Result<Option<MockDevice>, UsbError> {
        self.state
            .lock()
            .requested_filters
            .push(filters.iter().map(|f| f.vendor_id).collect());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let state = self.state.lock();
        let selectable = state.attached && filters.iter().any(|f| f.matches(state.vendor_id));
        Ok(selectable.then(|| MockDevice {
            state: self.state.clone(),
        }))
    }
}

/// Handle to the mock printer.
#[derive(Debug, Clone)]
pub struct MockDevice {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl UsbDevice for MockDevice {
    fn vendor_id(&self) -> u16 {
        self.state.lock().vendor_id
    }

    fn product_id(&self) -> u16 {
        self.state.lock().product_id
    }

    fn is_opened(&self) -> bool {
        self.state.lock().opened
    }

    fn configuration(&self) -> Option<Configuration> {
        let state = self.state.lock();
        state.active_configuration.map(|value| Configuration {
            value,
            interfaces: state.interfaces.clone(),
        })
    }

    async fn open(&self) -> Result<(), UsbError> {
        let mut state = self.state.lock();
        if state.fail_open {
            return Err(UsbError::Backend("access denied".into()));
        }
        state.opened = true;
        Ok(())
    }

    async fn close(&self) -> Result<(), UsbError> {
        let mut state = self.state.lock();
        state.close_count += 1;
        if state.fail_close {
            return Err(UsbError::Backend("close failed".into()));
        }
        state.opened = false;
        state.claimed_interfaces.clear();
        Ok(())
    }

    async fn select_configuration(&self, value: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock();
        if !state.opened {
            return Err(UsbError::NotOpen);
        }
        if state.fail_select {
            return Err(UsbError::Backend("configuration rejected".into()));
        }
        state.selected_configurations.push(value);
        state.active_configuration = Some(value);
        Ok(())
    }

    async fn claim_interface(&self, number: u8) -> Result<(), UsbError> {
        let mut state = self.state.lock();
        if !state.opened {
            return Err(UsbError::NotOpen);
        }
        if state.fail_claim {
            return Err(UsbError::Backend("interface busy".into()));
        }
        state.claimed_interfaces.push(number);
        Ok(())
    }

    async fn transfer_out(&self, endpoint: u8, data: &[u8]) -> Result<TransferResult, UsbError> {
        let mut state = self.state.lock();
        let index = state.transfer_attempts;
        state.transfer_attempts += 1;

        if !state.opened {
            return Err(UsbError::NotOpen);
        }
        let fault = state.transfer_fault;
        match fault {
            Some((n, TransferFault::Error)) if n == index => {
                Err(UsbError::Backend("transfer failed".into()))
            }
            Some((n, TransferFault::Stall)) if n == index => Ok(TransferResult {
                bytes_written: 0,
                status: TransferStatus::Stall,
            }),
            Some((n, TransferFault::Short)) if n == index => {
                let written = data.len().saturating_sub(1);
                state.transfers.push((endpoint, data[..written].to_vec()));
                Ok(TransferResult::ok(written))
            }
            _ => {
                state.transfers.push((endpoint, data.to_vec()));
                Ok(TransferResult::ok(data.len()))
            }
        }
    }
}
