//! End-to-end tests: `ReceiptPrinter` driving the mock USB host.
//!
//! Every byte the "printer" receives is checked against what a real ESC/POS
//! device would be sent.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use posprint::error::{ConnectError, PrintError, UsbError};
use posprint::printer::config::PRINTER_VENDORS;
use posprint::printer::{ConnectionState, PrinterConfig, ReceiptPrinter};
use posprint::protocol::text::TextEncoding;
use posprint::receipt::{receipt_job, test_page_job};
use posprint::transport::{Direction, Endpoint, MockHost, TransferType};
use posprint::ReceiptDocument;

const CAFE_X: &str = r#"{
    "restaurantName": "Cafe X",
    "tableNumber": 4,
    "billId": "B-102",
    "date": "2026-01-20 19:30",
    "items": [{ "name": "Coffee", "qty": 2, "price": 150, "total": 300 }],
    "subtotal": 300,
    "discount": 0,
    "total": 300,
    "paymentMethod": "cash"
}"#;

fn cafe_x() -> ReceiptDocument {
    serde_json::from_str(CAFE_X).unwrap()
}

fn printer(host: &MockHost) -> ReceiptPrinter<MockHost> {
    ReceiptPrinter::new(host.clone(), PrinterConfig::default())
}

/// Connected printer with the INIT transfer already cleared.
async fn connected(host: &MockHost) -> ReceiptPrinter<MockHost> {
    let printer = printer(host);
    assert!(printer.connect().await.unwrap());
    host.clear_transfers();
    printer
}

fn text(line: &str) -> Vec<u8> {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    bytes
}

// ============================================================================
// CONNECT
// ============================================================================

#[tokio::test]
async fn test_connect_requests_only_allow_listed_vendors() {
    let host = MockHost::new();
    printer(&host).connect().await.unwrap();

    let allowed: Vec<u16> = PRINTER_VENDORS.iter().map(|f| f.vendor_id).collect();
    assert_eq!(host.requested_filters(), vec![allowed]);
}

#[tokio::test]
async fn test_connect_configures_claims_and_resets() {
    let host = MockHost::new();
    let printer = printer(&host);

    assert!(printer.connect().await.unwrap());
    assert!(printer.is_connected());
    assert_eq!(printer.state(), ConnectionState::Connected);
    assert_eq!(host.selected_configurations(), vec![1]);
    assert_eq!(host.claimed_interfaces(), vec![0]);
    assert_eq!(host.transfers(), vec![vec![0x1B, 0x40]]);
    assert_eq!(host.transfer_endpoints(), vec![1]);
    assert_eq!(printer.endpoint().map(|e| e.number), Some(1));

    let handle = printer.handle().unwrap();
    assert_eq!(handle.configuration(), 1);
    assert_eq!(handle.interface(), 0);
    assert!(handle.is_open());
}

#[tokio::test]
async fn test_connect_keeps_active_configuration() {
    let host = MockHost::new().preconfigured();
    assert!(printer(&host).connect().await.unwrap());
    assert!(host.selected_configurations().is_empty());
}

#[tokio::test]
async fn test_connect_uses_first_bulk_out_endpoint() {
    let host = MockHost::new().with_endpoints(vec![
        Endpoint::new(3, Direction::Out, TransferType::Interrupt),
        Endpoint::new(5, Direction::Out, TransferType::Bulk),
        Endpoint::new(6, Direction::Out, TransferType::Bulk),
    ]);
    let printer = printer(&host);
    printer.connect().await.unwrap();

    assert_eq!(printer.endpoint().map(|e| e.number), Some(5));
    assert_eq!(host.transfer_endpoints(), vec![5]);
}

#[tokio::test]
async fn test_reentrant_connect_returns_false_without_request() {
    let (host, gate) = MockHost::new().gated();
    let printer = Arc::new(printer(&host));

    let first = tokio::spawn({
        let printer = printer.clone();
        async move { printer.connect().await }
    });
    while host.request_count() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(printer.state(), ConnectionState::Connecting);

    assert!(!printer.connect().await.unwrap());
    assert_eq!(host.request_count(), 1);

    gate.notify_one();
    assert!(first.await.unwrap().unwrap());
    assert!(printer.is_connected());
    assert_eq!(host.request_count(), 1);
}

#[tokio::test]
async fn test_cancelled_connect_releases_guard() {
    let (host, gate) = MockHost::new().gated();
    let printer = printer(&host);

    let attempt = tokio::time::timeout(Duration::from_millis(20), printer.connect()).await;
    assert!(attempt.is_err());
    assert_eq!(printer.state(), ConnectionState::Disconnected);

    gate.notify_one();
    assert!(printer.connect().await.unwrap());
    assert_eq!(host.request_count(), 2);
}

#[tokio::test]
async fn test_unsupported_environment() {
    let host = MockHost::new().unsupported();
    let printer = printer(&host);

    assert!(!printer.is_supported());
    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::UnsupportedEnvironment)
    ));
    assert_eq!(host.request_count(), 0);
}

#[tokio::test]
async fn test_cancelled_selection() {
    let host = MockHost::new().no_device();
    let printer = printer(&host);

    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::NoDeviceSelected)
    ));
    assert!(!printer.is_connected());

    // The guard was released, so a retry reaches the host again
    assert!(printer.connect().await.is_err());
    assert_eq!(host.request_count(), 2);
}

#[tokio::test]
async fn test_unknown_vendor_is_not_selectable() {
    let host = MockHost::new().with_ids(0x046D, 0xC52B);
    assert!(matches!(
        printer(&host).connect().await,
        Err(ConnectError::NoDeviceSelected)
    ));
}

#[tokio::test]
async fn test_open_failure() {
    let host = MockHost::new().fail_open();
    let printer = printer(&host);

    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::DeviceAccessFailure(UsbError::Backend(_)))
    ));
    assert!(!printer.is_connected());
    assert_eq!(host.close_count(), 0);
}

#[tokio::test]
async fn test_select_failure_closes_device() {
    let host = MockHost::new().fail_select();
    let printer = printer(&host);

    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::DeviceAccessFailure(_))
    ));
    assert_eq!(host.close_count(), 1);
    assert!(!host.is_device_open());
}

#[tokio::test]
async fn test_claim_failure_closes_device() {
    let host = MockHost::new().fail_claim();
    let printer = printer(&host);

    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::DeviceAccessFailure(_))
    ));
    assert_eq!(host.close_count(), 1);
    assert_eq!(printer.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_missing_bulk_out_endpoint() {
    let host = MockHost::new().with_endpoints(vec![
        Endpoint::new(2, Direction::In, TransferType::Bulk),
        Endpoint::new(3, Direction::Out, TransferType::Interrupt),
    ]);
    let printer = printer(&host);

    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::NoOutputEndpoint)
    ));
    assert!(!printer.is_connected());
    assert_eq!(host.close_count(), 1);
    assert_eq!(host.transfer_attempts(), 0);
}

#[tokio::test]
async fn test_init_failure_clears_slot() {
    let host = MockHost::new().fail_transfer_at(0);
    let printer = printer(&host);

    assert!(matches!(
        printer.connect().await,
        Err(ConnectError::DeviceAccessFailure(_))
    ));
    assert!(!printer.is_connected());
    assert!(printer.endpoint().is_none());
    assert_eq!(host.close_count(), 1);
}

#[tokio::test]
async fn test_connect_while_connected_is_noop() {
    let host = MockHost::new();
    let printer = printer(&host);

    assert!(printer.connect().await.unwrap());
    assert!(printer.connect().await.unwrap());
    assert_eq!(host.request_count(), 1);
    assert_eq!(host.transfers().len(), 1);
}

#[tokio::test]
async fn test_stale_handle_is_replaced() {
    let host = MockHost::new();
    let printer = printer(&host);
    printer.connect().await.unwrap();

    host.unplug();
    assert!(!printer.is_connected());

    assert!(printer.connect().await.unwrap());
    assert_eq!(host.request_count(), 2);
    assert!(printer.is_connected());
}

// ============================================================================
// DISCONNECT
// ============================================================================

#[tokio::test]
async fn test_disconnect_closes_device() {
    let host = MockHost::new();
    let printer = connected(&host).await;

    printer.disconnect().await;
    assert!(!printer.is_connected());
    assert!(!host.is_device_open());
    assert_eq!(host.close_count(), 1);
}

#[tokio::test]
async fn test_disconnect_clears_slot_when_close_fails() {
    let host = MockHost::new().fail_close();
    let printer = connected(&host).await;

    printer.disconnect().await;
    assert!(!printer.is_connected());
    assert_eq!(host.close_count(), 1);
    assert!(matches!(
        printer.print_test().await,
        Err(PrintError::NotConnected)
    ));
}

#[tokio::test]
async fn test_disconnect_without_connection() {
    let host = MockHost::new();
    printer(&host).disconnect().await;
    assert_eq!(host.close_count(), 0);
}

// ============================================================================
// PRINTING
// ============================================================================

#[tokio::test]
async fn test_print_while_disconnected_sends_nothing() {
    let host = MockHost::new();
    let printer = printer(&host);

    assert!(matches!(
        printer.print_receipt(&cafe_x()).await,
        Err(PrintError::NotConnected)
    ));
    assert!(matches!(
        printer.print_test().await,
        Err(PrintError::NotConnected)
    ));
    assert_eq!(host.transfer_attempts(), 0);
}

#[tokio::test]
async fn test_cafe_x_bytes() {
    let host = MockHost::new();
    let printer = connected(&host).await;

    printer.print_receipt(&cafe_x()).await.unwrap();

    let sep = "--------------------------------";
    let expected: Vec<Vec<u8>> = vec![
        vec![0x1B, 0x40],
        vec![0x1B, 0x33, 60],
        vec![0x1B, 0x61, 1],
        vec![0x1B, 0x45, 1],
        vec![0x1D, 0x21, 0x10],
        text("Cafe X"),
        vec![0x1D, 0x21, 0x00],
        vec![0x1B, 0x45, 0],
        text(sep),
        vec![0x1B, 0x61, 0],
        text("Table: 4"),
        text("Date: 2026-01-20 19:30"),
        text("Bill #: B-102"),
        text(sep),
        vec![0x1B, 0x45, 1],
        text("Item                  Qty  Amount"),
        vec![0x1B, 0x45, 0],
        text(sep),
        text("Coffee                 2     300"),
        text(sep),
        vec![0x1B, 0x61, 2],
        text("Subtotal: Rs. 300"),
        vec![0x1B, 0x45, 1],
        vec![0x1D, 0x21, 0x10],
        text("Total: Rs. 300"),
        vec![0x1D, 0x21, 0x00],
        vec![0x1B, 0x45, 0],
        vec![0x1B, 0x61, 1],
        text(sep),
        text("Payment: CASH"),
        vec![0x1B, 0x64, 2],
        text("Thank you for dining with us!"),
        text("Please visit again"),
        vec![0x1B, 0x64, 4],
        vec![0x1D, 0x56, 1],
    ];

    assert_eq!(host.transfers(), expected);
    assert!(host.transfer_endpoints().iter().all(|&ep| ep == 1));
}

#[tokio::test]
async fn test_identical_receipts_identical_bytes() {
    let host = MockHost::new();
    let printer = connected(&host).await;

    printer.print_receipt(&cafe_x()).await.unwrap();
    let first = host.transfers();
    host.clear_transfers();
    printer.print_receipt(&cafe_x()).await.unwrap();

    assert_eq!(host.transfers(), first);
}

#[tokio::test]
async fn test_print_test_page() {
    let host = MockHost::new();
    let printer = connected(&host).await;

    printer.print_test().await.unwrap();

    let job = test_page_job(&PrinterConfig::default());
    assert_eq!(host.received_bytes(), job.to_bytes());
    assert!(host.transfers().contains(&text("If you can read this,")));
    assert_eq!(host.transfers().last(), Some(&vec![0x1D, 0x56, 1]));
}

#[tokio::test]
async fn test_transfer_failure_aborts_at_frame() {
    // Transfer 0 is the INIT sent while connecting, so frame 5 is transfer 6
    let host = MockHost::new().fail_transfer_at(6);
    let printer = connected(&host).await;

    let err = printer.print_receipt(&cafe_x()).await.unwrap_err();
    assert!(matches!(
        err,
        PrintError::TransportFailure {
            frame: 5,
            source: UsbError::Backend(_)
        }
    ));

    let job = receipt_job(&cafe_x(), &PrinterConfig::default());
    let sent: Vec<Vec<u8>> = job.encoded_frames().take(5).collect();
    assert_eq!(host.transfers(), sent);
    assert_eq!(host.transfer_attempts(), 7);

    // A failed print leaves the connection as it was
    assert!(printer.is_connected());
}

#[tokio::test]
async fn test_stall_aborts_job() {
    let host = MockHost::new().stall_transfer_at(3);
    let printer = connected(&host).await;

    assert!(matches!(
        printer.print_test().await,
        Err(PrintError::TransportFailure {
            frame: 2,
            source: UsbError::Stall(1)
        })
    ));
    assert_eq!(host.transfers().len(), 2);
}

#[tokio::test]
async fn test_short_write_aborts_job() {
    let host = MockHost::new().short_write_at(1);
    let printer = connected(&host).await;

    assert!(matches!(
        printer.print_test().await,
        Err(PrintError::TransportFailure {
            frame: 0,
            source: UsbError::ShortWrite {
                written: 1,
                expected: 2
            }
        })
    ));
    assert_eq!(host.transfer_attempts(), 2);
}

#[tokio::test]
async fn test_unplugged_printer_is_not_connected() {
    let host = MockHost::new();
    let printer = connected(&host).await;

    host.unplug();
    assert!(matches!(
        printer.print_test().await,
        Err(PrintError::NotConnected)
    ));
    assert!(host.transfers().is_empty());
}

#[tokio::test]
async fn test_concurrent_prints_do_not_interleave() {
    let host = MockHost::new();
    let printer = connected(&host).await;
    let receipt = cafe_x();

    let (a, b) = tokio::join!(printer.print_receipt(&receipt), printer.print_test());
    a.unwrap();
    b.unwrap();

    let bill = receipt_job(&receipt, printer.config()).to_bytes();
    let test_page = test_page_job(printer.config()).to_bytes();
    let received = host.received_bytes();
    assert!(
        received == [bill.clone(), test_page.clone()].concat()
            || received == [test_page, bill].concat()
    );
}

#[tokio::test]
async fn test_cp437_text_frames() {
    let host = MockHost::new();
    let config = PrinterConfig {
        encoding: TextEncoding::Cp437,
        ..PrinterConfig::default()
    };
    let printer = ReceiptPrinter::new(host.clone(), config);
    printer.connect().await.unwrap();
    host.clear_transfers();

    let mut receipt = cafe_x();
    receipt.restaurant_name = "Café Niño".into();
    printer.print_receipt(&receipt).await.unwrap();

    assert_eq!(
        host.transfers()[5],
        vec![b'C', b'a', b'f', 0x82, b' ', b'N', b'i', 0xA4, b'o', b'\n']
    );
}

#[tokio::test]
async fn test_custom_currency_and_footer() {
    let host = MockHost::new();
    let config =
        PrinterConfig::from_json(r#"{ "currency": "NPR", "footer": ["Dhanyabad!", "Again"] }"#)
            .unwrap();
    let printer = ReceiptPrinter::new(host.clone(), config);
    printer.connect().await.unwrap();

    printer.print_receipt(&cafe_x()).await.unwrap();

    let transfers = host.transfers();
    assert!(transfers.contains(&text("Total: NPR 300")));
    assert!(transfers.contains(&text("Dhanyabad!")));
    assert!(!transfers.contains(&text("Please visit again")));
}
