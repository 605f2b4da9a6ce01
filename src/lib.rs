//! Regulome Explorer - feature association queries over the PanCancer Atlas
//!
//! This crate turns a pair of TCGA feature types into a single BigQuery
//! statement that scores every symbol pair:
//! - Feature registry and clinical column discovery
//! - Query assembly over a small SQL AST
//! - SQL generation
//! - Query execution against BigQuery
//! - Significance summaries for a single pair

pub mod utils;

pub mod analysis;
pub mod config;
pub mod feature_catalog;
pub mod presentation;
pub mod query_planner;
pub mod render_plan;
pub mod sql_generator;
pub mod warehouse;
