pub mod column_discovery;
pub mod errors;
pub mod feature_registry;
pub mod study;

// Re-export commonly used types
pub use column_discovery::{discover_columns, ClinicalColumn, ColumnInfo};
pub use errors::FeatureCatalogError;
pub use feature_registry::{
    describe, DataKind, FeatureDescriptor, FeatureType, RankStrategy, StatisticKind,
};
pub use study::Study;
