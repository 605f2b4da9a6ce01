//! Text output for scan tables and pair summaries.

pub mod pair_summary;
pub mod result_table;

pub use pair_summary::{summarize_pair, PairRow, PairSummary};
pub use result_table::{format_pair_summary, format_table};
