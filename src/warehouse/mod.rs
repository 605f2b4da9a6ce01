//! Query Execution Façade
//!
//! `QueryExecutor` is the seam between query assembly and the warehouse:
//! `BigQueryClient` talks to the BigQuery REST API, tests substitute a mock.
//! `run_query` wraps an executor with the interactive-session policy: dry runs
//! always come back empty, failures are logged and turned into `None`.

use std::fmt;

use async_trait::async_trait;
use log::{error, info, warn};

use crate::feature_catalog::ColumnInfo;
use crate::query_planner::{AssembledQuery, QueryParameter};

pub mod bigquery_client;
pub mod errors;
pub mod models;

pub use bigquery_client::BigQueryClient;
pub use errors::WarehouseError;

/// One SQL statement ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    pub sql: String,
    pub parameters: Vec<QueryParameter>,
    pub dry_run: bool,
}

impl QueryRequest {
    pub fn from_assembled(query: &AssembledQuery, dry_run: bool) -> Self {
        Self {
            sql: query.to_sql(),
            parameters: query.parameters.clone(),
            dry_run,
        }
    }
}

/// Fully qualified `project.dataset.table` name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub project: String,
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn parse(name: &str) -> Result<Self, WarehouseError> {
        let parts: Vec<&str> = name.trim().trim_matches('`').split('.').collect();
        match parts.as_slice() {
            [project, dataset, table]
                if !project.is_empty() && !dataset.is_empty() && !table.is_empty() =>
            {
                Ok(Self {
                    project: project.to_string(),
                    dataset: dataset.to_string(),
                    table: table.to_string(),
                })
            }
            _ => Err(WarehouseError::Configuration(format!(
                "expected a `project.dataset.table` name, got `{}`",
                name
            ))),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project, self.dataset, self.table)
    }
}

/// Column names plus rows of nullable cell text, as the warehouse returns them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Cell text of `column` in row `row`
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    pub fn number(&self, row: usize, column: &str) -> Option<f64> {
        self.value(row, column)?.trim().parse().ok()
    }
}

/// What the warehouse reported for one submitted job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    pub table: TabularResult,
    /// Estimate for dry runs, billed bytes otherwise
    pub bytes_processed: u64,
    pub cache_hit: bool,
    pub job_id: Option<String>,
    pub elapsed: Option<chrono::Duration>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Submit one statement and wait for its complete result.
    async fn submit(&self, request: &QueryRequest) -> Result<QueryOutcome, WarehouseError>;

    /// Column names and types of a warehouse table.
    async fn table_schema(&self, table: &TableRef) -> Result<Vec<ColumnInfo>, WarehouseError>;
}

/// Run `request` and return its rows, or `None` when the warehouse fails.
///
/// A dry run returns an empty table whatever the executor reports.
pub async fn run_query<E>(executor: &E, request: &QueryRequest) -> Option<TabularResult>
where
    E: QueryExecutor + ?Sized,
{
    let outcome = match executor.submit(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            return None;
        }
    };

    if request.dry_run {
        info!("This query will process {} bytes.", outcome.bytes_processed);
        return Some(TabularResult {
            columns: outcome.table.columns,
            rows: Vec::new(),
        });
    }

    if outcome.bytes_processed == 0 || outcome.cache_hit {
        info!("Query result served from cache.");
    } else {
        info!("Query processed {} bytes.", outcome.bytes_processed);
    }
    if let Some(elapsed) = outcome.elapsed {
        info!(
            "Query {} finished in {:.3} s",
            outcome.job_id.as_deref().unwrap_or("<unknown>"),
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }
    if outcome.table.is_empty() {
        warn!("Query returned no rows.");
    }

    Some(outcome.table)
}
