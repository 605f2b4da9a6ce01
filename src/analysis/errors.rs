use thiserror::Error;

use crate::feature_catalog::FeatureCatalogError;
use crate::query_planner::QueryPlannerError;

/// Assembly-time failures of an analysis request.
///
/// Warehouse failures during execution never show up here; they surface as
/// an absent result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error(transparent)]
    Catalog(#[from] FeatureCatalogError),

    #[error(transparent)]
    Planner(#[from] QueryPlannerError),
}
