use std::fmt::Write;

use super::pair_summary::{GroupSummary, KruskalWallisOutcome, PairSummary};
use crate::warehouse::TabularResult;

const NULL_CELL: &str = "NULL";

fn format_cell(cell: Option<&str>) -> String {
    match cell {
        None => NULL_CELL.to_string(),
        Some(text) if text.contains('.') => match text.parse::<f64>() {
            Ok(value) => format!("{:.4}", value),
            Err(_) => text.to_string(),
        },
        Some(text) => text.to_string(),
    }
}

fn is_numeric(cell: &str) -> bool {
    cell.parse::<f64>().is_ok()
}

/// Render at most `max_rows` rows as an aligned text table.
///
/// Numbers are right-aligned and rounded to four decimals; a footer counts
/// the rows left out.
pub fn format_table(table: &TabularResult, max_rows: usize) -> String {
    let shown: Vec<Vec<String>> = table
        .rows
        .iter()
        .take(max_rows)
        .map(|row| {
            (0..table.columns.len())
                .map(|i| format_cell(row.get(i).and_then(|c| c.as_deref())))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.len()).collect();
    for row in &shown {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = table
        .columns
        .iter()
        .zip(&widths)
        .map(|(column, width)| format!("{:<width$}", column, width = width))
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("  "));

    for row in &shown {
        let cells: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| {
                if is_numeric(cell) {
                    format!("{:>width$}", cell, width = width)
                } else {
                    format!("{:<width$}", cell, width = width)
                }
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join("  ").trim_end());
    }

    if table.rows.len() > shown.len() {
        let _ = writeln!(out, "... {} more rows", table.rows.len() - shown.len());
    }
    out
}

fn format_p_value(p_value: Option<f64>) -> String {
    match p_value {
        Some(p) if p < 1e-4 => format!("{:.3e}", p),
        Some(p) => format!("{:.4}", p),
        None => "n/a".to_string(),
    }
}

fn format_groups(out: &mut String, groups: &[GroupSummary], center: &str) {
    let width = groups
        .iter()
        .map(|g| g.label.len())
        .max()
        .unwrap_or(0)
        .max("group".len());
    let _ = writeln!(out, "{:<width$}  {:>6}  {:>10}", "group", "count", center, width = width);
    for group in groups {
        let _ = writeln!(
            out,
            "{:<width$}  {:>6}  {:>10.4}",
            group.label,
            group.count,
            group.center,
            width = width
        );
    }
}

/// Printable form of a pair summary.
pub fn format_pair_summary(summary: &PairSummary) -> String {
    let mut out = String::new();
    match summary {
        PairSummary::Spearman(Some(test)) => {
            let _ = writeln!(
                out,
                "Spearman correlation: rho = {:.4}, p-value = {}, n = {}",
                test.coefficient,
                format_p_value(test.p_value),
                test.n
            );
        }
        PairSummary::Spearman(None) => {
            let _ = writeln!(out, "Spearman correlation: not enough paired values");
        }
        PairSummary::WelchT { groups, test } => {
            format_groups(&mut out, groups, "mean");
            match test {
                Some(test) => {
                    let _ = writeln!(
                        out,
                        "Welch's t-test: t = {:.4}, df = {:.2}, p-value = {}",
                        test.statistic,
                        test.degrees_of_freedom,
                        format_p_value(test.p_value)
                    );
                }
                None => {
                    let _ = writeln!(out, "Welch's t-test: both groups need two or more varying values");
                }
            }
        }
        PairSummary::RankBiserial { groups, test } => {
            format_groups(&mut out, groups, "mean");
            match test {
                Some(test) => {
                    let _ = writeln!(
                        out,
                        "Point-biserial correlation of ranks: r = {:.4}, p-value = {}",
                        test.coefficient,
                        format_p_value(test.p_value)
                    );
                }
                None => {
                    let _ = writeln!(out, "Point-biserial correlation: one group is empty");
                }
            }
        }
        PairSummary::KruskalWallis { groups, outcome } => {
            format_groups(&mut out, groups, "median");
            match outcome {
                KruskalWallisOutcome::Computed(test) => {
                    let _ = writeln!(
                        out,
                        "Kruskal-Wallis test: H = {:.4}, groups = {}, p-value = {}",
                        test.statistic,
                        test.groups,
                        format_p_value(test.p_value)
                    );
                }
                KruskalWallisOutcome::InsufficientGroups { qualifying } => {
                    let _ = writeln!(
                        out,
                        "Kruskal-Wallis test: insufficient groups ({} with enough samples, 2 needed)",
                        qualifying
                    );
                }
            }
        }
    }
    out
}
