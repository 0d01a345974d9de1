//! Financial record types read from the receipt store.
//!
//! Receipts are produced by the OCR pipeline of the surrounding application.
//! The chat engine only reads them to ground the assistant's answers.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single purchased item on a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: f64,
    pub category: String,
}

/// A receipt with its extracted totals and line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub store: Option<String>,
    pub date: Option<NaiveDate>,
    pub total: f64,
    /// ISO 4217 code (e.g. "EUR").
    pub currency: String,
    pub line_items: Vec<LineItem>,
}
