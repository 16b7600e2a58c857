//! Extension store trait.

use async_trait::async_trait;

use crate::error::TesseraResult;
use crate::types::ExtensionRecord;

/// Timestamp-indexed append log shared by every category and extension.
///
/// Records are never updated or deleted, and duplicate timestamps are
/// accepted, so concurrent appends commute.
#[async_trait]
pub trait ExtensionStore: Send + Sync {
    /// Append a record.
    async fn append(&self, record: &ExtensionRecord) -> TesseraResult<()>;

    /// Records with `start_ts <= timestamp <= end_ts`, ascending by
    /// timestamp. Records sharing a timestamp keep insertion order.
    async fn list_between(
        &self,
        category: &str,
        extension: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> TesseraResult<Vec<ExtensionRecord>>;
}
