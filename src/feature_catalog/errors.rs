//! # Feature Catalog Error Types
//!
//! Errors raised while resolving feature types, study codes and clinical
//! table columns. All of them are assembly-time failures: they abort query
//! construction before anything is sent to the warehouse.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FeatureCatalogError {
    #[error("Unknown feature type `{name}`.")]
    UnknownFeatureType { name: String },
    #[error("Unknown study code `{code}` (expected one of the 33 TCGA study codes)")]
    UnknownStudy { code: String },
    #[error("Failed to read schema of table '{table}': {reason}")]
    SchemaIntrospectionFailure { table: String, reason: String },
}

impl FeatureCatalogError {
    pub fn schema_failure(table: impl Into<String>, reason: impl ToString) -> Self {
        FeatureCatalogError::SchemaIntrospectionFailure {
            table: table.into(),
            reason: reason.to_string(),
        }
    }
}
