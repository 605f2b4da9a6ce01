//! BigQuery v2 REST payloads
//!
//! Only the fields the client reads or writes are modelled. Integer counters
//! arrive as JSON strings (`"totalBytesProcessed": "1048576"`).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::feature_catalog::ColumnInfo;

/// `jobs.query` request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequestBody {
    pub query: String,
    pub use_legacy_sql: bool,
    pub use_query_cache: bool,
    pub dry_run: bool,
    pub parameter_mode: String,
    pub query_parameters: Vec<QueryParameterBody>,
    pub request_id: String,
    pub timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameterBody {
    pub name: String,
    pub parameter_type: ParameterType,
    pub parameter_value: ParameterValue,
}

impl QueryParameterBody {
    /// `ARRAY<STRING>` named parameter
    pub fn string_array(name: &str, values: &[String]) -> Self {
        Self {
            name: name.to_string(),
            parameter_type: ParameterType {
                type_name: "ARRAY".to_string(),
                array_type: Some(Box::new(ParameterType {
                    type_name: "STRING".to_string(),
                    array_type: None,
                })),
            },
            parameter_value: ParameterValue {
                array_values: values
                    .iter()
                    .map(|value| ScalarValue {
                        value: value.clone(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterType {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_type: Option<Box<ParameterType>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterValue {
    pub array_values: Vec<ScalarValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarValue {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReference {
    pub project_id: String,
    pub job_id: String,
    pub location: Option<String>,
}

/// Response of both `jobs.query` and `jobs.getQueryResults`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub job_reference: Option<JobReference>,
    pub job_complete: Option<bool>,
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    pub page_token: Option<String>,
    pub total_bytes_processed: Option<String>,
    pub cache_hit: Option<bool>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

impl QueryResponse {
    pub fn is_complete(&self) -> bool {
        self.job_complete.unwrap_or(false)
    }

    pub fn bytes_processed(&self) -> u64 {
        self.total_bytes_processed
            .as_deref()
            .and_then(|bytes| bytes.parse().ok())
            .unwrap_or(0)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .as_ref()
            .map(|schema| schema.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<TableFieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableFieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: Option<String>,
}

impl From<&TableFieldSchema> for ColumnInfo {
    fn from(field: &TableFieldSchema) -> Self {
        ColumnInfo::new(&field.name, &field.field_type)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: Value,
}

impl TableCell {
    /// Scalar cells come back as strings; anything else is kept as JSON text.
    pub fn as_text(&self) -> Option<String> {
        match &self.v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// `jobs.get` response, statistics only
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub statistics: Option<JobStatistics>,
}

/// Timestamps are epoch milliseconds encoded as strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
    pub creation_time: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub total_bytes_processed: Option<String>,
}

impl JobStatistics {
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let parse = |millis: &Option<String>| {
            millis
                .as_deref()
                .and_then(|m| m.parse::<i64>().ok())
                .and_then(chrono::DateTime::from_timestamp_millis)
        };
        let start = parse(&self.start_time).or_else(|| parse(&self.creation_time))?;
        let end = parse(&self.end_time)?;
        Some(end - start)
    }
}

/// `tables.get` response, schema only
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Table {
    pub schema: Option<TableSchema>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorProto {
    pub reason: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: String,
}
