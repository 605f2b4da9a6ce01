//! Rendering of `RenderPlan` values into BigQuery standard SQL.

use crate::render_plan::{RenderPlan, ToSql};

mod to_sql_query;

pub use to_sql_query::quote_string;

/// Render a complete statement.
pub fn generate_sql(plan: &RenderPlan) -> String {
    let sql = plan.to_sql();
    log::debug!("Generated SQL:\n{}", sql);
    sql
}
