use thiserror::Error;

use crate::feature_catalog::{FeatureCatalogError, FeatureType};
use crate::render_plan::RenderBuildError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryPlannerError {
    #[error(transparent)]
    Catalog(#[from] FeatureCatalogError),

    #[error(transparent)]
    Render(#[from] RenderBuildError),

    #[error("Cannot pair {feature1} with {feature2}: {reason}")]
    UnsupportedFeaturePair {
        feature1: FeatureType,
        feature2: FeatureType,
        reason: String,
    },

    #[error("Invalid column name `{0}`: expected a plain SQL identifier")]
    InvalidIdentifier(String),

    #[error("No gene symbols given")]
    EmptySymbolList,

    #[error("No usable {feature} columns found in {table}")]
    MissingClinicalColumns { feature: FeatureType, table: String },
}

impl QueryPlannerError {
    pub fn unsupported_pair(
        feature1: FeatureType,
        feature2: FeatureType,
        reason: impl Into<String>,
    ) -> Self {
        QueryPlannerError::UnsupportedFeaturePair {
            feature1,
            feature2,
            reason: reason.into(),
        }
    }
}
