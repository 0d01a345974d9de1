//! Read-only access to the user's financial records.

use spendscope_types::error::RepositoryError;
use spendscope_types::receipt::FinancialRecord;
use spendscope_types::user::UserId;

/// Source of the structured receipt data injected into every prompt.
///
/// Implementations live in spendscope-infra (e.g., `SqliteReceiptRepository`).
/// The chat engine never writes through this trait.
pub trait FinancialRecordsProvider: Send + Sync {
    /// List every record available to the user, in presentation order.
    fn list_records(
        &self,
        user_id: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<FinancialRecord>, RepositoryError>> + Send;
}
