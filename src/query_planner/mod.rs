//! Query assembly
//!
//! Maps a (feature 1, feature 2) pair onto one self-contained BigQuery
//! statement. Scan mode correlates a list of genes against every symbol of
//! feature 2:
//!
//! ```text
//! WITH
//! table1 AS (...),      -- feature 1, genes in @PARAMETERLIST, values and ranks
//! table2 AS (...),      -- feature 2, every symbol, ranks or categories
//! summ_table AS (...)   -- sufficient statistics per symbol pair
//! SELECT ...            -- the statistic feature 2 drives, guarded and ordered
//! ```
//!
//! Pair mode returns the joined per-subject rows of one symbol pair.

use std::collections::HashSet;

use log::{debug, info};

use crate::feature_catalog::{
    discover_columns, ColumnInfo, DataKind, FeatureDescriptor, FeatureType, Study,
};
use crate::render_plan::RenderPlan;
use crate::sql_generator;
use crate::utils::cte_naming::{feature_table_name, PARAMETER_LIST, SUMMARY_CTE};

pub mod errors;
pub mod feature_table;
pub mod pair_aggregation;
pub mod pair_rows;
pub mod statistic;

#[cfg(test)]
mod tests;

pub use errors::QueryPlannerError;

/// Array-of-string bind parameter, `@name` in the SQL text.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledQuery {
    pub plan: RenderPlan,
    pub parameters: Vec<QueryParameter>,
}

impl AssembledQuery {
    pub fn to_sql(&self) -> String {
        sql_generator::generate_sql(&self.plan)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub study: Study,
    pub feature1: FeatureType,
    pub feature2: FeatureType,
    pub symbols: Vec<String>,
    pub min_samples: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairRequest {
    pub study: Study,
    pub feature1: FeatureType,
    pub feature2: FeatureType,
    /// Gene symbol, or clinical column name for clinical feature 1
    pub label1: String,
    pub label2: String,
}

/// Split free text such as `"IGF2, ADAM6"` on commas and whitespace.
///
/// Empty entries are dropped and repeats keep their first position.
pub fn parse_symbol_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty())
        .filter(|symbol| seen.insert(symbol.to_string()))
        .map(str::to_string)
        .collect()
}

fn is_numeric_molecular(descriptor: &FeatureDescriptor) -> bool {
    descriptor.data_kind == DataKind::Numeric && !descriptor.is_clinical()
}

/// Checks that need no warehouse metadata: a non-empty gene list and a
/// numeric molecular feature 1.
pub fn validate_scan_request(request: &ScanRequest) -> Result<(), QueryPlannerError> {
    if request.symbols.is_empty() {
        return Err(QueryPlannerError::EmptySymbolList);
    }
    if !is_numeric_molecular(request.feature1.descriptor()) {
        return Err(QueryPlannerError::unsupported_pair(
            request.feature1,
            request.feature2,
            "feature 1 of a scan must be a numeric molecular feature",
        ));
    }
    Ok(())
}

/// Assemble the scan query.
///
/// `clinical_schema` is the clinical table's column list; only consulted when
/// feature 2 is a clinical type.
pub fn plan_scan_query(
    request: &ScanRequest,
    clinical_schema: &[ColumnInfo],
) -> Result<AssembledQuery, QueryPlannerError> {
    validate_scan_request(request)?;

    let descriptor1 = request.feature1.descriptor();
    let descriptor2 = request.feature2.descriptor();

    let statistic = descriptor2.statistic;
    let self_join = request.feature1 == request.feature2;
    let table1 = feature_table_name(1);
    let table2 = feature_table_name(2);

    let clinical_columns = if descriptor2.is_clinical() {
        discover_columns(descriptor2, clinical_schema)
    } else {
        Vec::new()
    };

    let input = feature_table::build_input_table(descriptor1, request.study, &table1);
    let scanned =
        feature_table::build_table(None, descriptor2, request.study, &table2, &clinical_columns)?;
    let summary = pair_aggregation::compose(&table1, &table2, statistic, self_join);

    let plan = statistic::finalize(SUMMARY_CTE, &table1, statistic, request.min_samples)
        .with_ctes(vec![input, scanned, summary]);

    info!(
        "Planned {:?} scan of {} symbol(s): {} vs {} in {}{}",
        statistic,
        request.symbols.len(),
        request.feature1,
        request.feature2,
        request.study,
        if self_join { " (self-join)" } else { "" }
    );

    Ok(AssembledQuery {
        plan,
        parameters: vec![QueryParameter {
            name: PARAMETER_LIST.to_string(),
            values: request.symbols.clone(),
        }],
    })
}

/// Assemble the pair-mode row query for one symbol (or column) per feature.
pub fn plan_pair_query(request: &PairRequest) -> Result<AssembledQuery, QueryPlannerError> {
    let descriptor1 = request.feature1.descriptor();
    let descriptor2 = request.feature2.descriptor();
    if descriptor1.data_kind != DataKind::Numeric {
        return Err(QueryPlannerError::unsupported_pair(
            request.feature1,
            request.feature2,
            "feature 1 of a pair must be numeric",
        ));
    }

    let label1 = request.label1.trim();
    let label2 = request.label2.trim();
    for (label, descriptor) in [(label1, descriptor1), (label2, descriptor2)] {
        if label.is_empty() && !descriptor.is_clinical() {
            return Err(QueryPlannerError::EmptySymbolList);
        }
    }

    let table1 = feature_table_name(1);
    let table2 = feature_table_name(2);
    let first = feature_table::build_table(Some(label1), descriptor1, request.study, &table1, &[])?;
    let second =
        feature_table::build_table(Some(label2), descriptor2, request.study, &table2, &[])?;

    debug!(
        "Planned pair query {} ({}) vs {} ({}) in {}",
        label1, request.feature1, label2, request.feature2, request.study
    );

    Ok(AssembledQuery {
        plan: pair_rows::pair_rows(&table1, &table2, descriptor2).with_ctes(vec![first, second]),
        parameters: Vec::new(),
    })
}
