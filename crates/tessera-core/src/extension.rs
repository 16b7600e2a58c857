//! Append and range-query entry points for extension records.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{TesseraError, TesseraResult};
use crate::store::{Database, SqliteExtensionStore};
use crate::traits::ExtensionStore;
use crate::types::{ExtensionRecord, ResultList};

/// Facade over an [`ExtensionStore`].
///
/// Every read goes to the store; nothing is cached.
#[derive(Clone)]
pub struct ExtensionLog {
    store: Arc<dyn ExtensionStore>,
}

impl ExtensionLog {
    pub fn new(store: Arc<dyn ExtensionStore>) -> Self {
        Self { store }
    }

    /// Extension log backed by the SQLite extension store.
    pub fn with_database(db: &Database) -> Self {
        Self::new(Arc::new(SqliteExtensionStore::new(db)))
    }

    /// Append a record and return its id.
    ///
    /// `timestamp` is epoch milliseconds and defaults to now.
    pub async fn record(
        &self,
        category: &str,
        extension: &str,
        record_name: &str,
        payload: serde_json::Value,
        timestamp: Option<i64>,
    ) -> TesseraResult<Uuid> {
        if category.trim().is_empty() {
            return Err(TesseraError::missing_field("category", "category must not be blank"));
        }
        if extension.trim().is_empty() {
            return Err(TesseraError::missing_field("extension", "extension must not be blank"));
        }

        let timestamp = timestamp.unwrap_or_else(|| Utc::now().timestamp_millis());
        let record = ExtensionRecord::new(category, extension, record_name, payload, timestamp);
        self.store.append(&record).await?;

        tracing::debug!(
            category,
            extension,
            timestamp,
            id = %record.id,
            "Recorded extension"
        );
        Ok(record.id)
    }

    /// Payloads recorded in `[start_ts, end_ts]`, oldest first.
    pub async fn query(
        &self,
        category: &str,
        extension: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> TesseraResult<ResultList<serde_json::Value>> {
        let records = self.query_records(category, extension, start_ts, end_ts).await?;
        Ok(ResultList {
            data: records.data.into_iter().map(|r| r.payload).collect(),
            paging: records.paging,
        })
    }

    /// Full records recorded in `[start_ts, end_ts]`, oldest first.
    pub async fn query_records(
        &self,
        category: &str,
        extension: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> TesseraResult<ResultList<ExtensionRecord>> {
        if start_ts > end_ts {
            return Err(TesseraError::invalid_range(format!(
                "start timestamp {} is after end timestamp {}",
                start_ts, end_ts
            )));
        }
        let records = self
            .store
            .list_between(category, extension, start_ts, end_ts)
            .await?;
        Ok(ResultList::for_range(records, start_ts, end_ts))
    }
}
