//! # Receipt Documents
//!
//! The input contract for printing a bill. Documents are built by the
//! point-of-sale application from order data and arrive here already
//! validated and rounded; nothing in this crate recomputes totals.
//!
//! Documents deserialize from the JSON the application emits:
//!
//! ```json
//! {
//!   "restaurantName": "Cafe X",
//!   "tableNumber": 4,
//!   "billId": "B-102",
//!   "date": "2026-01-20 19:30",
//!   "items": [{ "name": "Coffee", "qty": 2, "price": 150, "total": 300 }],
//!   "subtotal": 300,
//!   "discount": 0,
//!   "total": 300,
//!   "paymentMethod": "cash"
//! }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the bill was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    /// Card or other electronic payment.
    Electronic,
    /// Fonepay QR wallet.
    Fonepay,
}

impl PaymentMethod {
    /// Uppercased tag as printed on the receipt.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Electronic => "ELECTRONIC",
            PaymentMethod::Fonepay => "FONEPAY",
        }
    }
}

/// One billed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Quantity, fractional for items sold by weight.
    pub qty: Decimal,
    /// Unit price. Carried for completeness; receipts print only `total`.
    pub price: Decimal,
    pub total: Decimal,
}

impl LineItem {
    pub fn new(
        name: impl Into<String>,
        qty: impl Into<Decimal>,
        price: Decimal,
        total: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            qty: qty.into(),
            price,
            total,
        }
    }
}

/// A bill ready to print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDocument {
    pub restaurant_name: String,
    pub table_number: u32,
    pub bill_id: String,
    /// Preformatted date. Defaults to the local time when absent from JSON.
    #[serde(default = "now_string")]
    pub date: String,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: Option<PaymentMethod>,
}

fn now_string() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()
}

impl ReceiptDocument {
    /// Whether a discount line belongs on the receipt.
    pub fn has_discount(&self) -> bool {
        self.discount > Decimal::ZERO
    }

    /// The payment method, defaulting to cash.
    pub fn payment(&self) -> PaymentMethod {
        self.payment_method.unwrap_or_default()
    }
}
