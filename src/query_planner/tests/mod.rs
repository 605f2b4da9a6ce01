//! Query planner tests that run assembled plans over in-memory tables.
//!
//! Each fixture row carries exactly the source columns the planner reads, so a
//! plan that references anything else fails with `UnknownColumn`.


use serde_json::{json, Value};

use super::AssembledQuery;
use crate::feature_catalog::FeatureType;
use crate::render_plan::evaluator::{evaluate_plan, Dataset, Row};

fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn expression_row(study: &str, symbol: &str, subject: &str, normalized_count: f64) -> Row {
    row(&[
        ("Study", json!(study)),
        ("Symbol", json!(symbol)),
        ("ParticipantBarcode", json!(subject)),
        ("normalized_count", json!(normalized_count)),
    ])
}

fn copy_number_row(symbol: &str, subject: &str, gistic: f64) -> Row {
    row(&[
        ("Study", json!("UCEC")),
        ("Gene_Symbol", json!(symbol)),
        ("ParticipantBarcode", json!(subject)),
        ("GISTIC_Calls", json!(gistic)),
    ])
}

fn mutation_row(symbol: &str, subject: &str, filter: &str) -> Row {
    row(&[
        ("Study", json!("UCEC")),
        ("Hugo_Symbol", json!(symbol)),
        ("ParticipantBarcode", json!(subject)),
        ("FILTER", json!(filter)),
    ])
}

fn clinical_row(subject: &str, columns: &[(&str, Value)]) -> Row {
    let mut fields = row(columns);
    fields.insert("acronym".to_string(), json!("UCEC"));
    fields.insert("bcr_patient_barcode".to_string(), json!(subject));
    fields
}

fn source_table(feature: FeatureType) -> &'static str {
    feature.descriptor().source_table
}

/// Bind the query's parameters and run it over `tables`.
fn run(query: &AssembledQuery, tables: Vec<(&str, Vec<Row>)>) -> Vec<Row> {
    let mut dataset = Dataset::new();
    for (name, rows) in tables {
        dataset = dataset.with_table(name, rows);
    }
    for parameter in &query.parameters {
        dataset = dataset.with_parameter(&parameter.name, json!(parameter.values));
    }
    evaluate_plan(&query.plan, &dataset).expect("plan should evaluate")
}

fn number(row: &Row, column: &str) -> f64 {
    row.get(column)
        .and_then(Value::as_f64)
        .unwrap_or_else(|| panic!("column {} is not numeric in {:?}", column, row))
}

fn text<'a>(row: &'a Row, column: &str) -> &'a str {
    row.get(column)
        .and_then(Value::as_str)
        .unwrap_or_else(|| panic!("column {} is not a string in {:?}", column, row))
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
