//! Analytics report data stored as extension records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use tessera_core::{Database, ExtensionLog, ResultList, TesseraError, TesseraResult};

/// Extension key every report data record is filed under.
pub const REPORT_DATA_EXTENSION: &str = "reportData.reportDataResult";

/// Record name used for report data records.
pub const REPORT_DATA_RECORD: &str = "reportData";

/// Kind of analytics report; its wire name is the storage category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportDataType {
    EntityReportData,
    WebAnalyticUserActivityReportData,
    WebAnalyticEntityViewReportData,
}

impl ReportDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntityReportData => "EntityReportData",
            Self::WebAnalyticUserActivityReportData => "WebAnalyticUserActivityReportData",
            Self::WebAnalyticEntityViewReportData => "WebAnalyticEntityViewReportData",
        }
    }
}

impl fmt::Display for ReportDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportDataType {
    type Err = TesseraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EntityReportData" => Ok(Self::EntityReportData),
            "WebAnalyticUserActivityReportData" => Ok(Self::WebAnalyticUserActivityReportData),
            "WebAnalyticEntityViewReportData" => Ok(Self::WebAnalyticEntityViewReportData),
            other => Err(TesseraError::validation(format!(
                "unknown report data type '{}'",
                other
            ))),
        }
    }
}

/// One analytics data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub report_data_type: ReportDataType,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ReportData {
    pub fn new(report_data_type: ReportDataType, timestamp: i64, data: serde_json::Value) -> Self {
        Self {
            id: None,
            timestamp,
            report_data_type,
            data,
        }
    }
}

/// Append and range-read report data.
#[derive(Clone)]
pub struct ReportDataRepository {
    log: ExtensionLog,
}

impl ReportDataRepository {
    pub fn new(log: ExtensionLog) -> Self {
        Self { log }
    }

    pub fn with_database(db: &Database) -> Self {
        Self::new(ExtensionLog::with_database(db))
    }

    /// Store a data point under a fresh id and return it.
    pub async fn add_report_data(&self, mut report: ReportData) -> TesseraResult<ReportData> {
        report.id = Some(Uuid::new_v4());
        let payload = serde_json::to_value(&report)?;
        self.log
            .record(
                report.report_data_type.as_str(),
                REPORT_DATA_EXTENSION,
                REPORT_DATA_RECORD,
                payload,
                Some(report.timestamp),
            )
            .await?;

        tracing::debug!(
            report_data_type = %report.report_data_type,
            timestamp = report.timestamp,
            "Added report data"
        );
        Ok(report)
    }

    /// Data points of one type recorded in `[start_ts, end_ts]`, oldest first.
    pub async fn get_report_data(
        &self,
        report_data_type: ReportDataType,
        start_ts: i64,
        end_ts: i64,
    ) -> TesseraResult<ResultList<ReportData>> {
        let payloads = self
            .log
            .query(
                report_data_type.as_str(),
                REPORT_DATA_EXTENSION,
                start_ts,
                end_ts,
            )
            .await?;
        Ok(payloads.try_map(serde_json::from_value::<ReportData>)?)
    }
}
