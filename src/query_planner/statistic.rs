//! Statistic finalizer
//!
//! Turns the sufficient statistics in `summ_table` into the reported score.
//! Every guard (minimum group size, positive variance, at least two
//! categories) sits in a WHERE clause, so failing rows never reach ORDER BY.
//!
//! The two-group statistics only see subjects carrying the feature-2 event
//! (the inner join keeps mutated subjects only). The complement group is
//! recovered by subtracting from per-symbol totals over the same input table:
//!
//! ```text
//! n_0 = n_t - n_1    avg0 = (Σx_t - Σx_1) / n_0
//! var0 = (Σx²_t - Σx²_1 - (Σx_t - Σx_1)² / n_0) / (n_0 - 1)
//! ```
//!
//! Intermediate quotients that can divide by zero before the guards apply use
//! `SAFE_DIVIDE`, which yields NULL and fails the guard.

use crate::feature_catalog::StatisticKind;
use crate::render_plan::render_expr::{Operator, RenderExpr};
use crate::render_plan::{FromSource, Join, JoinType, OrderByItem, RenderPlan, SelectItem};
use crate::utils::cte_naming::{SUBJECT_COLUMN, SYMBOL_COLUMN, TOTALS_ALIAS};

use super::pair_aggregation::{
    CATEGORY, CATEGORY_SUM, CATEGORY_SUM_SQUARES, CORRELATION, GROUP_COUNT, GROUP_SUM,
    GROUP_SUM_SQUARES, PAIR_COUNT, SYMBOL1, SYMBOL2,
};

pub const TSCORE: &str = "tscore";
pub const HSCORE: &str = "Hscore";
pub const COMPLEMENT_COUNT: &str = "n_0";
pub const GROUP_COUNT_COLUMN: &str = "Ngroups";
pub const SAMPLE_COUNT: &str = "Nsamples";

const TOTAL_COUNT: &str = "n_t";
const TOTAL_SUM: &str = "sumx_t";
const TOTAL_SUM_SQUARES: &str = "sumx2_t";

fn col(name: &str) -> RenderExpr {
    RenderExpr::column(name)
}

fn total(name: &str) -> RenderExpr {
    RenderExpr::property(TOTALS_ALIAS, name)
}

fn bin(lhs: RenderExpr, operator: Operator, rhs: RenderExpr) -> RenderExpr {
    RenderExpr::binary(lhs, operator, rhs)
}

fn safe_divide(numerator: RenderExpr, denominator: RenderExpr) -> RenderExpr {
    RenderExpr::scalar("SAFE_DIVIDE", vec![numerator, denominator])
}

fn greater_than(expr: RenderExpr, bound: i64) -> RenderExpr {
    bin(expr, Operator::GreaterThan, RenderExpr::integer(bound))
}

fn square(expr: RenderExpr) -> RenderExpr {
    bin(expr.clone(), Operator::Multiplication, expr)
}

fn symbol_items() -> Vec<SelectItem> {
    vec![
        SelectItem::new(col(SYMBOL1)),
        SelectItem::new(col(SYMBOL2)),
    ]
}

/// Build the final `SELECT` over `aggregate_ref` (the `summ_table` CTE).
///
/// `input_ref` names the scan input table the two-group statistics take their
/// per-symbol totals from.
pub fn finalize(
    aggregate_ref: &str,
    input_ref: &str,
    statistic: StatisticKind,
    min_samples: u32,
) -> RenderPlan {
    let min_samples = i64::from(min_samples);
    match statistic {
        StatisticKind::Correlation => correlation(aggregate_ref, min_samples),
        StatisticKind::WelchT => welch_t(aggregate_ref, input_ref, min_samples),
        StatisticKind::RankBiserial => rank_biserial(aggregate_ref, input_ref, min_samples),
        StatisticKind::KruskalWallis => kruskal_wallis(aggregate_ref, min_samples),
    }
}

fn correlation(aggregate_ref: &str, min_samples: i64) -> RenderPlan {
    let mut items = symbol_items();
    items.push(SelectItem::new(col(PAIR_COUNT)));
    items.push(SelectItem::new(col(CORRELATION)));

    RenderPlan::select_from(items, FromSource::cte(aggregate_ref, None))
        .with_filters(vec![greater_than(col(PAIR_COUNT), min_samples)])
        .with_order_by(vec![OrderByItem::desc(col(CORRELATION))])
}

/// `SELECT symbol, COUNT(ParticipantBarcode) n_t, SUM(x) sumx_t, SUM(x*x) sumx2_t
///  FROM <input> GROUP BY symbol`
fn totals(input_ref: &str, accumulated: &str) -> RenderPlan {
    RenderPlan::select_from(
        vec![
            SelectItem::new(col(SYMBOL_COLUMN)),
            SelectItem::aliased(
                RenderExpr::aggregate("COUNT", vec![col(SUBJECT_COLUMN)]),
                TOTAL_COUNT,
            ),
            SelectItem::aliased(RenderExpr::aggregate("SUM", vec![col(accumulated)]), TOTAL_SUM),
            SelectItem::aliased(
                RenderExpr::aggregate("SUM", vec![square(col(accumulated))]),
                TOTAL_SUM_SQUARES,
            ),
        ],
        FromSource::cte(input_ref, None),
    )
    .with_group_by(vec![col(SYMBOL_COLUMN)])
}

/// Per-group means plus the complement group size, joined against the totals.
fn two_group_decomposition(
    aggregate_ref: &str,
    input_ref: &str,
    accumulated: &str,
    extra: Vec<SelectItem>,
) -> RenderPlan {
    let complement_count = bin(total(TOTAL_COUNT), Operator::Subtraction, col(GROUP_COUNT));
    let complement_sum = bin(total(TOTAL_SUM), Operator::Subtraction, col(GROUP_SUM));

    let mut items = symbol_items();
    items.push(SelectItem::new(col(GROUP_COUNT)));
    items.push(SelectItem::aliased(
        safe_divide(col(GROUP_SUM), col(GROUP_COUNT)),
        "avg1",
    ));
    items.push(SelectItem::aliased(complement_count.clone(), COMPLEMENT_COUNT));
    items.push(SelectItem::aliased(
        safe_divide(complement_sum, complement_count),
        "avg0",
    ));
    items.extend(extra);

    RenderPlan::select_from(items, FromSource::cte(aggregate_ref, None)).with_join(Join::new(
        JoinType::Left,
        FromSource::subquery(totals(input_ref, accumulated), Some(TOTALS_ALIAS)),
        vec![bin(
            RenderExpr::property(aggregate_ref, SYMBOL1),
            Operator::Equal,
            total(SYMBOL_COLUMN),
        )],
    ))
}

fn welch_t(aggregate_ref: &str, input_ref: &str, min_samples: i64) -> RenderPlan {
    let accumulated = StatisticKind::WelchT.accumulated_column();
    let complement_count = bin(total(TOTAL_COUNT), Operator::Subtraction, col(GROUP_COUNT));
    let complement_sum = bin(total(TOTAL_SUM), Operator::Subtraction, col(GROUP_SUM));

    // var1 = (Σx² - (Σx)²/n) / (n - 1)
    let var1 = safe_divide(
        bin(
            col(GROUP_SUM_SQUARES),
            Operator::Subtraction,
            bin(square(col(GROUP_SUM)), Operator::Division, col(GROUP_COUNT)),
        ),
        bin(col(GROUP_COUNT), Operator::Subtraction, RenderExpr::integer(1)),
    );
    let var0 = safe_divide(
        bin(
            bin(
                total(TOTAL_SUM_SQUARES),
                Operator::Subtraction,
                col(GROUP_SUM_SQUARES),
            ),
            Operator::Subtraction,
            safe_divide(square(complement_sum), complement_count.clone()),
        ),
        bin(complement_count, Operator::Subtraction, RenderExpr::integer(1)),
    );

    let inner = two_group_decomposition(
        aggregate_ref,
        input_ref,
        accumulated,
        vec![
            SelectItem::aliased(var1, "var1"),
            SelectItem::aliased(var0, "var0"),
        ],
    );

    // |avg1 - avg0| / sqrt(var1/n_1 + var0/n_0)
    let tscore = bin(
        RenderExpr::scalar(
            "ABS",
            vec![bin(col("avg1"), Operator::Subtraction, col("avg0"))],
        ),
        Operator::Division,
        RenderExpr::scalar(
            "SQRT",
            vec![bin(
                bin(col("var1"), Operator::Division, col(GROUP_COUNT)),
                Operator::Addition,
                bin(col("var0"), Operator::Division, col(COMPLEMENT_COUNT)),
            )],
        ),
    );

    let mut items = symbol_items();
    items.push(SelectItem::new(col(GROUP_COUNT)));
    items.push(SelectItem::new(col(COMPLEMENT_COUNT)));
    items.push(SelectItem::aliased(tscore, TSCORE));

    RenderPlan::select_from(items, FromSource::subquery(inner, None))
        .with_filters(vec![
            greater_than(col(GROUP_COUNT), min_samples),
            greater_than(col(COMPLEMENT_COUNT), min_samples),
            greater_than(col("var1"), 0),
            greater_than(col("var0"), 0),
        ])
        .with_order_by(vec![OrderByItem::desc(col(TSCORE))])
}

fn rank_biserial(aggregate_ref: &str, input_ref: &str, min_samples: i64) -> RenderPlan {
    let accumulated = StatisticKind::RankBiserial.accumulated_column();

    // n·Σx² - (Σx)² over the whole rank distribution of symbol1
    let var_total = bin(
        bin(
            total(TOTAL_COUNT),
            Operator::Multiplication,
            total(TOTAL_SUM_SQUARES),
        ),
        Operator::Subtraction,
        square(total(TOTAL_SUM)),
    );
    let inner = two_group_decomposition(
        aggregate_ref,
        input_ref,
        accumulated,
        vec![SelectItem::aliased(var_total, "var_t")],
    );

    // |avg1 - avg0| * sqrt(n_1 * n_0 / var_t)
    let score = bin(
        RenderExpr::scalar(
            "ABS",
            vec![bin(col("avg1"), Operator::Subtraction, col("avg0"))],
        ),
        Operator::Multiplication,
        RenderExpr::scalar(
            "SQRT",
            vec![bin(
                bin(
                    col(GROUP_COUNT),
                    Operator::Multiplication,
                    col(COMPLEMENT_COUNT),
                ),
                Operator::Division,
                col("var_t"),
            )],
        ),
    );

    let mut items = symbol_items();
    items.push(SelectItem::new(col(GROUP_COUNT)));
    items.push(SelectItem::new(col(COMPLEMENT_COUNT)));
    items.push(SelectItem::aliased(score, CORRELATION));

    RenderPlan::select_from(items, FromSource::subquery(inner, None))
        .with_filters(vec![
            greater_than(col(GROUP_COUNT), min_samples),
            greater_than(col(COMPLEMENT_COUNT), min_samples),
            greater_than(col("var_t"), 0),
        ])
        .with_order_by(vec![OrderByItem::desc(col(CORRELATION))])
}

fn kruskal_wallis(aggregate_ref: &str, min_samples: i64) -> RenderPlan {
    let sum = |expr: RenderExpr| RenderExpr::aggregate("SUM", vec![expr]);

    let inner = RenderPlan::select_from(
        vec![
            SelectItem::new(col(SYMBOL1)),
            SelectItem::new(col(SYMBOL2)),
            SelectItem::aliased(sum(col(PAIR_COUNT)), "N"),
            SelectItem::aliased(sum(col(CATEGORY_SUM)), "sumSi"),
            SelectItem::aliased(sum(col(CATEGORY_SUM_SQUARES)), "sumSqi"),
            SelectItem::aliased(
                sum(bin(
                    square(col(CATEGORY_SUM)),
                    Operator::Division,
                    col(PAIR_COUNT),
                )),
                "sumSi2overni",
            ),
            SelectItem::aliased(
                RenderExpr::aggregate("COUNT", vec![col(CATEGORY)]),
                GROUP_COUNT_COLUMN,
            ),
        ],
        FromSource::cte(aggregate_ref, None),
    )
    .with_filters(vec![greater_than(col(PAIR_COUNT), min_samples)])
    .with_group_by(vec![col(SYMBOL1), col(SYMBOL2)]);

    // S²/N
    let squared_total_over_n = bin(square(col("sumSi")), Operator::Division, col("N"));
    let between = bin(
        col("sumSi2overni"),
        Operator::Subtraction,
        squared_total_over_n.clone(),
    );
    let spread = bin(col("sumSqi"), Operator::Subtraction, squared_total_over_n);

    // H = (N - 1)(Σ Sᵢ²/nᵢ - S²/N) / (Σ Sqᵢ - S²/N)
    let hscore = bin(
        bin(
            bin(col("N"), Operator::Subtraction, RenderExpr::integer(1)),
            Operator::Multiplication,
            between,
        ),
        Operator::Division,
        spread.clone(),
    );

    let mut items = symbol_items();
    items.push(SelectItem::new(col(GROUP_COUNT_COLUMN)));
    items.push(SelectItem::aliased(col("N"), SAMPLE_COUNT));
    items.push(SelectItem::aliased(hscore, HSCORE));

    RenderPlan::select_from(items, FromSource::subquery(inner, None))
        .with_filters(vec![
            greater_than(col(GROUP_COUNT_COLUMN), 1),
            greater_than(spread, 0),
        ])
        .with_order_by(vec![OrderByItem::desc(col(HSCORE))])
}
