//! History port — record value changes and query them back.

use async_trait::async_trait;

use homelink_domain::error::HubError;
use homelink_domain::history::{HistoryQuery, HistoryRow, ValueChangeRecord};

/// Persistence collaborator for value history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Append one value change.
    async fn insert_value_change(&self, record: ValueChangeRecord) -> Result<(), HubError>;

    /// Rows for `query`, newest first, after `offset` rows, at most `amount`.
    async fn select_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRow>, HubError>;
}
