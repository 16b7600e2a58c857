//! Time-keyed extension records and range query results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record appended under `(category, extension)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionRecord {
    pub id: Uuid,
    /// Entity type or report category that owns the stream
    pub category: String,
    /// Extension key, e.g. "reportData.reportDataResult"
    pub extension: String,
    pub record_name: String,
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl ExtensionRecord {
    pub fn new(
        category: impl Into<String>,
        extension: impl Into<String>,
        record_name: impl Into<String>,
        payload: serde_json::Value,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: category.into(),
            extension: extension.into(),
            record_name: record_name.into(),
            payload,
            timestamp,
        }
    }
}

/// Paging metadata echoed back with a list result.
///
/// For time-range queries `before` and `after` carry the start and end
/// bounds that were queried; nothing in the store enforces them as cursors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    pub total: usize,
}

/// A list of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultList<T> {
    pub data: Vec<T>,
    pub paging: Paging,
}

impl<T> ResultList<T> {
    /// Wrap the results of a `[start_ts, end_ts]` range query.
    pub fn for_range(data: Vec<T>, start_ts: i64, end_ts: i64) -> Self {
        let total = data.len();
        Self {
            data,
            paging: Paging {
                before: Some(start_ts.to_string()),
                after: Some(end_ts.to_string()),
                total,
            },
        }
    }

    /// Convert every item, keeping the paging metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<ResultList<U>, E> {
        let data = self.data.into_iter().map(f).collect::<Result<Vec<_>, _>>()?;
        Ok(ResultList {
            data,
            paging: self.paging,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
