//! Analysis session
//!
//! Ties the pipeline together for one interactive request:
//! column discovery → query assembly → execution → presentation.
//!
//! Assembly problems (unknown names, unreadable clinical schema, unsupported
//! pairs) are returned as `Err`. Warehouse problems during execution are
//! logged by the query façade and come back as `Ok(None)`.

use std::time::Instant;

use log::{debug, info};

use crate::config::ExplorerConfig;
use crate::feature_catalog::{
    discover_columns, ColumnInfo, ClinicalColumn, FeatureCatalogError, FeatureType, Study,
};
use crate::presentation::pair_summary::{summarize_pair, PairRow, PairSummary};
use crate::query_planner::pair_rows::{FIRST_VALUE, SECOND_VALUE};
use crate::query_planner::{
    parse_symbol_list, plan_pair_query, plan_scan_query, validate_scan_request, AssembledQuery,
    PairRequest, ScanRequest,
};
use crate::warehouse::{
    run_query, QueryExecutor, QueryRequest, TableRef, TabularResult, WarehouseError,
};

pub mod errors;

pub use errors::AnalysisError;

/// Planning and execution timings of one request.
#[derive(Debug, Clone, Default)]
pub struct AnalysisMetrics {
    pub planning_time: f64,
    pub execution_time: f64,
    pub result_rows: Option<usize>,
}

impl AnalysisMetrics {
    pub fn log_performance(&self, kind: &str) {
        info!(
            "{} performance - Planning: {:.3}ms, Exec: {:.3}ms, Rows: {}",
            kind,
            self.planning_time * 1000.0,
            self.execution_time * 1000.0,
            self.result_rows
                .map_or("N/A".to_string(), |r| r.to_string())
        );
    }
}

/// Pair-mode rows together with their significance summary.
#[derive(Debug, Clone, PartialEq)]
pub struct PairAnalysis {
    pub table: TabularResult,
    pub rows: Vec<PairRow>,
    pub summary: PairSummary,
}

pub struct ExplorerSession<E: QueryExecutor> {
    executor: E,
    config: ExplorerConfig,
}

impl<E: QueryExecutor> ExplorerSession<E> {
    pub fn new(executor: E, config: ExplorerConfig) -> Self {
        Self { executor, config }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Schema of the table behind `feature`, read from the warehouse.
    pub async fn table_schema(
        &self,
        feature: FeatureType,
    ) -> Result<Vec<ColumnInfo>, FeatureCatalogError> {
        let source = feature.descriptor().source_table;
        let table = TableRef::parse(source).map_err(|e| schema_error(source, e))?;
        self.executor
            .table_schema(&table)
            .await
            .map_err(|e| schema_error(source, e))
    }

    /// Usable columns of a clinical feature type; empty for molecular types.
    pub async fn clinical_columns(
        &self,
        feature: FeatureType,
    ) -> Result<Vec<ClinicalColumn>, FeatureCatalogError> {
        if !feature.is_clinical() {
            return Ok(Vec::new());
        }
        let schema = self.table_schema(feature).await?;
        Ok(discover_columns(feature.descriptor(), &schema))
    }

    /// Assemble the scan query for a free-text gene list.
    pub async fn plan_scan(
        &self,
        study: Study,
        feature1: FeatureType,
        feature2: FeatureType,
        genes: &str,
    ) -> Result<AssembledQuery, AnalysisError> {
        let request = ScanRequest {
            study,
            feature1,
            feature2,
            symbols: parse_symbol_list(genes),
            min_samples: self.config.min_samples,
        };
        // reject bad inputs before touching the warehouse
        validate_scan_request(&request)?;

        let schema = if feature2.is_clinical() {
            self.table_schema(feature2).await?
        } else {
            Vec::new()
        };
        Ok(plan_scan_query(&request, &schema)?)
    }

    /// Run a scan; `Ok(None)` when the warehouse call failed.
    pub async fn scan(
        &self,
        study: Study,
        feature1: FeatureType,
        feature2: FeatureType,
        genes: &str,
        dry_run: bool,
    ) -> Result<Option<TabularResult>, AnalysisError> {
        let mut metrics = AnalysisMetrics::default();
        let started = Instant::now();
        let query = self.plan_scan(study, feature1, feature2, genes).await?;
        metrics.planning_time = started.elapsed().as_secs_f64();

        let request = QueryRequest::from_assembled(&query, dry_run);
        debug!("Scan SQL:\n{}", request.sql);

        let started = Instant::now();
        let result = run_query(&self.executor, &request).await;
        metrics.execution_time = started.elapsed().as_secs_f64();
        metrics.result_rows = result.as_ref().map(TabularResult::len);
        metrics.log_performance("Scan");

        Ok(result)
    }

    pub fn plan_pair(
        &self,
        study: Study,
        feature1: FeatureType,
        feature2: FeatureType,
        label1: &str,
        label2: &str,
    ) -> Result<AssembledQuery, AnalysisError> {
        Ok(plan_pair_query(&PairRequest {
            study,
            feature1,
            feature2,
            label1: label1.to_string(),
            label2: label2.to_string(),
        })?)
    }

    /// Fetch the rows of one pair and summarise them.
    pub async fn pair(
        &self,
        study: Study,
        feature1: FeatureType,
        feature2: FeatureType,
        label1: &str,
        label2: &str,
    ) -> Result<Option<PairAnalysis>, AnalysisError> {
        let mut metrics = AnalysisMetrics::default();
        let started = Instant::now();
        let query = self.plan_pair(study, feature1, feature2, label1, label2)?;
        metrics.planning_time = started.elapsed().as_secs_f64();

        let request = QueryRequest::from_assembled(&query, false);
        debug!("Pair SQL:\n{}", request.sql);

        let started = Instant::now();
        let Some(table) = run_query(&self.executor, &request).await else {
            return Ok(None);
        };
        metrics.execution_time = started.elapsed().as_secs_f64();
        metrics.result_rows = Some(table.len());
        metrics.log_performance("Pair");

        let rows = pair_rows(&table);
        let summary = summarize_pair(feature2, &rows, self.config.min_samples as usize);
        Ok(Some(PairAnalysis {
            table,
            rows,
            summary,
        }))
    }
}

fn schema_error(table: &str, error: WarehouseError) -> FeatureCatalogError {
    let reason = match error {
        WarehouseError::SchemaIntrospection { reason, .. } => reason,
        other => other.to_string(),
    };
    FeatureCatalogError::schema_failure(table, reason)
}

/// Read `(data1, data2)` out of a pair-mode result.
pub fn pair_rows(table: &TabularResult) -> Vec<PairRow> {
    (0..table.len())
        .map(|i| PairRow::new(table.number(i, FIRST_VALUE), table.value(i, SECOND_VALUE)))
        .collect()
}
