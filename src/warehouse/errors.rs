use thiserror::Error;

/// Failures talking to the warehouse.
///
/// Submission and materialization failures are execution-time errors: the
/// query façade logs them and hands back no result. Schema introspection
/// failures abort clinical query assembly.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WarehouseError {
    #[error("Query submission failed: {0}")]
    QuerySubmissionFailure(String),

    #[error("Query results could not be materialized: {0}")]
    QueryMaterializationFailure(String),

    #[error("Failed to read schema of table '{table}': {reason}")]
    SchemaIntrospection { table: String, reason: String },

    #[error("Warehouse configuration error: {0}")]
    Configuration(String),
}
