//! Centralized CTE and column naming for generated queries.
//!
//! Every stage of a query refers to the stages before it by name, so all names
//! live here. The pairwise composer, the finalizer and the pair-row query all
//! read the same `(symbol, data, rnkdata, ParticipantBarcode)` columns.
//!
//! Examples:
//! - `feature_table_name(1)` → `"table1"`
//! - `feature_table_name(2)` → `"table2"`

/// Aggregate CTE holding the per-pair sufficient statistics.
pub const SUMMARY_CTE: &str = "summ_table";

pub const SYMBOL_COLUMN: &str = "symbol";
pub const VALUE_COLUMN: &str = "data";
pub const RANK_COLUMN: &str = "rnkdata";
/// Inner-subquery name of the per-subject value before it is re-exposed.
pub const AVERAGED_COLUMN: &str = "avgdata";
pub const SUBJECT_COLUMN: &str = "ParticipantBarcode";

/// Alias of one unnested clinical `STRUCT(symbol, data)` element.
pub const UNPIVOT_ALIAS: &str = "table_columns";
/// Alias of the clinical subquery whose array is unnested.
pub const UNPIVOT_SOURCE_ALIAS: &str = "newtable";

pub const LEFT_ALIAS: &str = "n1";
pub const RIGHT_ALIAS: &str = "n2";
pub const TOTALS_ALIAS: &str = "totals";

/// Name of the array-typed bind parameter carrying the input symbols.
pub const PARAMETER_LIST: &str = "PARAMETERLIST";

/// Generate the CTE name of the feature table in `slot` (1 or 2).
///
/// # Examples
/// ```
/// use regulome_explorer::utils::cte_naming::feature_table_name;
///
/// assert_eq!(feature_table_name(1), "table1");
/// assert_eq!(feature_table_name(2), "table2");
/// ```
pub fn feature_table_name(slot: usize) -> String {
    format!("table{}", slot)
}
