//! # Receipt Encoders
//!
//! Turn a [`ReceiptDocument`] (or the fixed test page) into a [`PrintJob`].
//!
//! The frame order is part of the contract. Alignment, emphasis and size are
//! printer-side state, so every text line depends on the commands before it;
//! identical input always yields an identical job.
//!
//! ## Receipt Layout (58mm, 32 columns)
//!
//! ```text
//!             Cafe X              <- centered, bold, double height
//! --------------------------------
//! Table: 4
//! Date: 2026-01-20 19:30
//! Bill #: B-102
//! --------------------------------
//! Item                  Qty  Amount   <- bold
//! --------------------------------
//! Coffee                 2     300
//! --------------------------------
//!                Subtotal: Rs. 300   <- right aligned
//!                   Total: Rs. 300   <- bold, double height
//! --------------------------------
//!          Payment: CASH
//! ```

use crate::document::{LineItem, ReceiptDocument};
use crate::job::PrintJob;
use crate::printer::config::{PrinterConfig, SEPARATOR_WIDTH};
use crate::protocol::commands::{
    ALIGN_CENTER, ALIGN_LEFT, ALIGN_RIGHT, BOLD_OFF, BOLD_ON, Command, DOUBLE_HEIGHT, INIT,
    NORMAL_SIZE, PARTIAL_CUT,
};

/// Item name column width.
pub const NAME_WIDTH: usize = 20;
/// Quantity column width.
pub const QTY_WIDTH: usize = 3;
/// Line total column width.
pub const AMOUNT_WIDTH: usize = 7;

/// Bold header over the item rows.
pub const ITEM_HEADER: &str = "Item                  Qty  Amount";

fn separator() -> String {
    "-".repeat(SEPARATOR_WIDTH)
}

/// Format one item row: `{name:<20} {qty:>3} {total:>7}`.
///
/// Names longer than 20 characters are cut. Quantity and total are padded
/// but never cut, so an oversized value pushes the row wider.
///
/// ```
/// use posprint::document::LineItem;
/// use posprint::receipt::item_row;
/// use rust_decimal::Decimal;
///
/// let item = LineItem::new("Coffee", 2, Decimal::from(150), Decimal::from(300));
/// assert_eq!(item_row(&item), "Coffee                 2     300");
/// ```
pub fn item_row(item: &LineItem) -> String {
    let name: String = item.name.chars().take(NAME_WIDTH).collect();
    format!(
        "{:<nw$} {:>qw$} {:>aw$}",
        name,
        item.qty.to_string(),
        item.total.to_string(),
        nw = NAME_WIDTH,
        qw = QTY_WIDTH,
        aw = AMOUNT_WIDTH,
    )
}

/// Build the full receipt job.
pub fn receipt_job(receipt: &ReceiptDocument, config: &PrinterConfig) -> PrintJob {
    let mut job = PrintJob::new(config.encoding);
    let currency = &config.currency;

    job.command(INIT)
        .command(Command::LineSpacing(config.line_spacing));

    // Header
    job.command(ALIGN_CENTER)
        .command(BOLD_ON)
        .command(DOUBLE_HEIGHT)
        .text(receipt.restaurant_name.as_str())
        .command(NORMAL_SIZE)
        .command(BOLD_OFF)
        .text(separator());

    // Bill info
    job.command(ALIGN_LEFT)
        .text(format!("Table: {}", receipt.table_number))
        .text(format!("Date: {}", receipt.date))
        .text(format!("Bill #: {}", receipt.bill_id))
        .text(separator());

    // Items
    job.command(BOLD_ON)
        .text(ITEM_HEADER)
        .command(BOLD_OFF)
        .text(separator());
    for item in &receipt.items {
        job.text(item_row(item));
    }
    job.text(separator());

    // Totals
    job.command(ALIGN_RIGHT)
        .text(format!("Subtotal: {} {}", currency, receipt.subtotal));
    if receipt.has_discount() {
        job.text(format!("Discount: {} {}", currency, receipt.discount));
    }
    job.command(BOLD_ON)
        .command(DOUBLE_HEIGHT)
        .text(format!("Total: {} {}", currency, receipt.total))
        .command(NORMAL_SIZE)
        .command(BOLD_OFF);

    job.command(ALIGN_CENTER)
        .text(separator())
        .text(format!("Payment: {}", receipt.payment().label()));

    // Footer
    job.command(Command::FeedLines(2))
        .text(config.footer[0].as_str())
        .text(config.footer[1].as_str())
        .command(Command::FeedLines(4))
        .command(PARTIAL_CUT);

    job
}

/// Build the fixed test page.
pub fn test_page_job(config: &PrinterConfig) -> PrintJob {
    let mut job = PrintJob::new(config.encoding);
    job.command(INIT)
        .command(ALIGN_CENTER)
        .command(BOLD_ON)
        .command(DOUBLE_HEIGHT)
        .text("PRINTER TEST")
        .command(NORMAL_SIZE)
        .command(BOLD_OFF)
        .text(separator())
        .text("If you can read this,")
        .text("your printer is working!")
        .text(separator())
        .command(Command::FeedLines(3))
        .command(PARTIAL_CUT);
    job
}

// ============================================================================
// TESTS
// ============================================================================
