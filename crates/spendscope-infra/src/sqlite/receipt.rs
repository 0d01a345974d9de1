//! SQLite receipt reader.
//!
//! Implements `FinancialRecordsProvider` over the `receipts` and
//! `expense_items` tables that the surrounding application's OCR pipeline
//! fills. Read-only: nothing here ever writes.

use std::collections::HashMap;

use chrono::NaiveDate;
use spendscope_core::records::FinancialRecordsProvider;
use spendscope_types::error::RepositoryError;
use spendscope_types::receipt::{FinancialRecord, LineItem};
use spendscope_types::user::UserId;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed source of a user's financial records.
#[derive(Clone)]
pub struct SqliteReceiptRepository {
    pool: DatabasePool,
}

impl SqliteReceiptRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

struct ReceiptRow {
    id: String,
    store_name: Option<String>,
    receipt_date: Option<String>,
    total_amount: f64,
    currency: String,
}

impl ReceiptRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            store_name: row.try_get("store_name")?,
            receipt_date: row.try_get("receipt_date")?,
            total_amount: row.try_get("total_amount")?,
            currency: row.try_get("currency")?,
        })
    }

    fn into_record(self, line_items: Vec<LineItem>) -> FinancialRecord {
        FinancialRecord {
            store: self.store_name.filter(|s| !s.trim().is_empty()),
            date: self.receipt_date.as_deref().and_then(parse_receipt_date),
            total: self.total_amount,
            currency: self.currency,
            line_items,
        }
    }
}

/// The OCR pipeline writes either a bare date or a full timestamp; only the
/// calendar date matters here. Unparseable values read as unknown.
fn parse_receipt_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

impl FinancialRecordsProvider for SqliteReceiptRepository {
    async fn list_records(&self, user_id: &UserId) -> Result<Vec<FinancialRecord>, RepositoryError> {
        let receipt_rows = sqlx::query(
            r#"SELECT id, store_name, receipt_date, total_amount, currency
               FROM receipts
               WHERE user_id = ?
               ORDER BY receipt_date ASC, created_at ASC"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if receipt_rows.is_empty() {
            return Ok(Vec::new());
        }

        let item_rows = sqlx::query(
            r#"SELECT receipt_id, description, amount, category
               FROM expense_items
               WHERE receipt_id IN (SELECT id FROM receipts WHERE user_id = ?)
               ORDER BY rowid ASC"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut items_by_receipt: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in &item_rows {
            let receipt_id: String = row
                .try_get("receipt_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let item = LineItem {
                description: row
                    .try_get("description")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                amount: row
                    .try_get("amount")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                category: row
                    .try_get("category")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
            };
            items_by_receipt.entry(receipt_id).or_default().push(item);
        }

        let mut records = Vec::with_capacity(receipt_rows.len());
        for row in &receipt_rows {
            let receipt = ReceiptRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            let items = items_by_receipt.remove(&receipt.id).unwrap_or_default();
            records.push(receipt.into_record(items));
        }

        tracing::debug!(user_id = %user_id, count = records.len(), "Loaded financial records");
        Ok(records)
    }
}
