//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// Query parameters for the session list endpoint.
#[derive(Debug, Deserialize, Default)]
pub struct SessionListQuery {
    /// Maximum results; absent means all.
    pub limit: Option<i64>,
    /// Offset for pagination.
    pub offset: Option<i64>,
}

impl SessionListQuery {
    /// Reject negative paging values instead of letting SQLite interpret them.
    pub fn validated(&self) -> Result<(Option<i64>, Option<i64>), String> {
        if self.limit.is_some_and(|l| l < 0) {
            return Err("limit must not be negative".to_string());
        }
        if self.offset.is_some_and(|o| o < 0) {
            return Err("offset must not be negative".to_string());
        }
        Ok((self.limit, self.offset))
    }
}
