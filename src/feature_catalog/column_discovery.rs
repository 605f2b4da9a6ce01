//! Clinical column discovery
//!
//! The clinical feature types have no fixed symbol column: every column of the
//! clinical table is a candidate "symbol". Discovery turns a table schema into
//! one `STRUCT(<name> AS symbol, <value> AS data)` fragment per usable column.
//! The scan-mode table builder packs these into an array and unnests it, which
//! unpivots columns into rows.
//!
//! The schema is an explicit input so discovery stays pure; fetching it from
//! the warehouse is the caller's job (see `warehouse::QueryExecutor::table_schema`).
//!
//! Decision table (identifier columns are always skipped):
//!
//! | data kind   | physical type       | fragment value                          |
//! |-------------|---------------------|-----------------------------------------|
//! | categorical | STRING              | column as-is                            |
//! | categorical | anything else       | skipped                                 |
//! | numeric     | STRING              | cast to NUMERIC when the cell is numeric, else NULL |
//! | numeric     | INTEGER / FLOAT     | column as-is                            |
//! | numeric     | anything else       | skipped                                 |
//! | boolean     | any                 | skipped                                 |

use log::debug;
use serde::{Deserialize, Serialize};

use super::feature_registry::{DataKind, FeatureDescriptor};
use crate::render_plan::render_expr::{Literal, RenderExpr};
use crate::render_plan::StructField;
use crate::utils::cte_naming::{SYMBOL_COLUMN, VALUE_COLUMN};

/// Identifier columns of the clinical table that are never features.
pub const IDENTIFIER_COLUMNS: &[&str] = &[
    "bcr_patient_uuid",
    "bcr_patient_barcode",
    "acronym",
    "patient_id",
];

/// Cells a STRING column must match before the numeric cast is attempted.
pub const NUMERIC_CELL_PATTERN: &str = r"^\d*\.?\d*$";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }

    pub fn physical_type(&self) -> PhysicalType {
        PhysicalType::parse(&self.data_type)
    }
}

/// Warehouse column type, folded to the classes discovery cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalType {
    String,
    Integer,
    Float,
    Other(String),
}

impl PhysicalType {
    /// Accepts both legacy (`INTEGER`, `FLOAT`) and standard SQL (`INT64`,
    /// `FLOAT64`) type names.
    pub fn parse(type_name: &str) -> Self {
        match type_name.trim().to_ascii_uppercase().as_str() {
            "STRING" => PhysicalType::String,
            "INTEGER" | "INT64" => PhysicalType::Integer,
            "FLOAT" | "FLOAT64" => PhysicalType::Float,
            other => PhysicalType::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTreatment {
    /// Column value used directly.
    Direct,
    /// STRING column cast to NUMERIC behind a regex guard.
    GuardedNumericCast,
    Skip,
}

/// Apply the decision table to one column.
pub fn classify_column(kind: DataKind, column: &ColumnInfo) -> ColumnTreatment {
    if IDENTIFIER_COLUMNS.contains(&column.name.as_str()) {
        return ColumnTreatment::Skip;
    }

    match (kind, column.physical_type()) {
        (DataKind::Categorical, PhysicalType::String) => ColumnTreatment::Direct,
        (DataKind::Numeric, PhysicalType::String) => ColumnTreatment::GuardedNumericCast,
        (DataKind::Numeric, PhysicalType::Integer | PhysicalType::Float) => {
            ColumnTreatment::Direct
        }
        _ => ColumnTreatment::Skip,
    }
}

/// One usable clinical column, ready to be unpivoted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalColumn {
    pub name: String,
    pub value: RenderExpr,
}

impl ClinicalColumn {
    /// `STRUCT('<name>' AS symbol, <value> AS data)`
    pub fn fragment(&self) -> RenderExpr {
        RenderExpr::StructLiteral(vec![
            StructField::new(RenderExpr::string(&self.name), SYMBOL_COLUMN),
            StructField::new(self.value.clone(), VALUE_COLUMN),
        ])
    }
}

/// `IF(REGEXP_CONTAINS(col, r"^\d*\.?\d*$"), SAFE_CAST(col AS NUMERIC), NULL)`
fn guarded_numeric_cast(column: &str) -> RenderExpr {
    RenderExpr::scalar(
        "IF",
        vec![
            RenderExpr::scalar(
                "REGEXP_CONTAINS",
                vec![
                    RenderExpr::column(column),
                    RenderExpr::regex(NUMERIC_CELL_PATTERN),
                ],
            ),
            RenderExpr::safe_cast(RenderExpr::column(column), "NUMERIC"),
            RenderExpr::Literal(Literal::Null),
        ],
    )
}

/// Discover the unpivot fragments for a clinical feature type.
///
/// Columns keep their schema order. Non-clinical descriptors yield nothing.
pub fn discover_columns(
    descriptor: &FeatureDescriptor,
    schema: &[ColumnInfo],
) -> Vec<ClinicalColumn> {
    if !descriptor.is_clinical() {
        return Vec::new();
    }

    let columns: Vec<ClinicalColumn> = schema
        .iter()
        .filter_map(|column| {
            let treatment = classify_column(descriptor.data_kind, column);
            debug!(
                "column discovery: {} ({}) -> {:?}",
                column.name, column.data_type, treatment
            );
            match treatment {
                ColumnTreatment::Direct => Some(ClinicalColumn {
                    name: column.name.clone(),
                    value: RenderExpr::column(&column.name),
                }),
                ColumnTreatment::GuardedNumericCast => Some(ClinicalColumn {
                    name: column.name.clone(),
                    value: guarded_numeric_cast(&column.name),
                }),
                ColumnTreatment::Skip => None,
            }
        })
        .collect();

    debug!(
        "Discovered {} {} columns in {}",
        columns.len(),
        descriptor.data_kind,
        descriptor.source_table
    );

    columns
}
