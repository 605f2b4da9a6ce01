//! Pairwise aggregation composer
//!
//! Joins table 1 and table 2 on the subject barcode and reduces every
//! (symbol1, symbol2[, category]) group to sufficient statistics. The shape
//! depends on the statistic feature 2 drives:
//!
//! | statistic      | extra group key | aggregates                                  |
//! |----------------|-----------------|---------------------------------------------|
//! | Correlation    | none            | `n`, `CORR(n1.rnkdata, n2.rnkdata)`         |
//! | WelchT         | none            | `n_1`, `SUM(n1.data)`, `SUM(n1.data²)`      |
//! | RankBiserial   | none            | `n_1`, `SUM(n1.rnkdata)`, `SUM(n1.rnkdata²)`|
//! | KruskalWallis  | `category`      | `n`, `SUM(n1.rnkdata)`, `SUM(n1.rnkdata²)`  |
//!
//! Self-pair suppression: scanning a feature against itself pairs the input
//! list with every symbol outside it, then appends one `UNION ALL` pass of the
//! input list against itself restricted to `n1.symbol < n2.symbol`. No row has
//! `symbol1 = symbol2` and each unordered pair is reported once.

use crate::feature_catalog::StatisticKind;
use crate::render_plan::render_expr::{Operator, RenderExpr};
use crate::render_plan::{Cte, FromSource, Join, JoinType, RenderPlan, SelectItem};
use crate::utils::cte_naming::{
    LEFT_ALIAS, PARAMETER_LIST, RANK_COLUMN, RIGHT_ALIAS, SUBJECT_COLUMN, SUMMARY_CTE,
    SYMBOL_COLUMN,
};

pub const SYMBOL1: &str = "symbol1";
pub const SYMBOL2: &str = "symbol2";
pub const CATEGORY: &str = "category";
pub const PAIR_COUNT: &str = "n";
pub const CORRELATION: &str = "correlation";
pub const GROUP_COUNT: &str = "n_1";
pub const GROUP_SUM: &str = "sumx_1";
pub const GROUP_SUM_SQUARES: &str = "sumx2_1";
pub const CATEGORY_SUM: &str = "sumx";
pub const CATEGORY_SUM_SQUARES: &str = "sumx2";

fn left(column: &str) -> RenderExpr {
    RenderExpr::property(LEFT_ALIAS, column)
}

fn right(column: &str) -> RenderExpr {
    RenderExpr::property(RIGHT_ALIAS, column)
}

fn sum(expr: RenderExpr) -> RenderExpr {
    RenderExpr::aggregate("SUM", vec![expr])
}

fn sum_of_squares(column: &str) -> RenderExpr {
    sum(RenderExpr::binary(
        left(column),
        Operator::Multiplication,
        left(column),
    ))
}

fn matched_subjects() -> RenderExpr {
    RenderExpr::aggregate("COUNT", vec![left(SUBJECT_COLUMN)])
}

fn aggregate_items(statistic: StatisticKind) -> Vec<SelectItem> {
    let mut items = vec![
        SelectItem::aliased(left(SYMBOL_COLUMN), SYMBOL1),
        SelectItem::aliased(right(SYMBOL_COLUMN), SYMBOL2),
    ];
    let accumulated = statistic.accumulated_column();
    match statistic {
        StatisticKind::Correlation => {
            items.push(SelectItem::aliased(matched_subjects(), PAIR_COUNT));
            items.push(SelectItem::aliased(
                RenderExpr::aggregate("CORR", vec![left(RANK_COLUMN), right(RANK_COLUMN)]),
                CORRELATION,
            ));
        }
        StatisticKind::WelchT | StatisticKind::RankBiserial => {
            items.push(SelectItem::aliased(matched_subjects(), GROUP_COUNT));
            items.push(SelectItem::aliased(sum(left(accumulated)), GROUP_SUM));
            items.push(SelectItem::aliased(
                sum_of_squares(accumulated),
                GROUP_SUM_SQUARES,
            ));
        }
        StatisticKind::KruskalWallis => {
            items.push(SelectItem::aliased(right(RANK_COLUMN), CATEGORY));
            items.push(SelectItem::aliased(matched_subjects(), PAIR_COUNT));
            items.push(SelectItem::aliased(sum(left(accumulated)), CATEGORY_SUM));
            items.push(SelectItem::aliased(
                sum_of_squares(accumulated),
                CATEGORY_SUM_SQUARES,
            ));
        }
    }
    items
}

fn group_keys(statistic: StatisticKind) -> Vec<RenderExpr> {
    let mut keys = vec![RenderExpr::column(SYMBOL1), RenderExpr::column(SYMBOL2)];
    if statistic == StatisticKind::KruskalWallis {
        keys.push(RenderExpr::column(CATEGORY));
    }
    keys
}

fn joined_pass(
    table1: &str,
    table2: &str,
    statistic: StatisticKind,
    extra_conditions: Vec<RenderExpr>,
) -> RenderPlan {
    let mut on = vec![RenderExpr::binary(
        left(SUBJECT_COLUMN),
        Operator::Equal,
        right(SUBJECT_COLUMN),
    )];
    on.extend(extra_conditions);

    RenderPlan::select_from(
        aggregate_items(statistic),
        FromSource::cte(table1, Some(LEFT_ALIAS)),
    )
    .with_join(Join::new(
        JoinType::Inner,
        FromSource::cte(table2, Some(RIGHT_ALIAS)),
        on,
    ))
    .with_group_by(group_keys(statistic))
}

/// Compose the `summ_table` CTE over `table1` × `table2`.
pub fn compose(table1: &str, table2: &str, statistic: StatisticKind, self_join: bool) -> Cte {
    if !self_join {
        return Cte::new(SUMMARY_CTE, joined_pass(table1, table2, statistic, vec![]));
    }

    let outside_input = vec![
        RenderExpr::binary(left(SYMBOL_COLUMN), Operator::NotEqual, right(SYMBOL_COLUMN)),
        RenderExpr::binary(
            right(SYMBOL_COLUMN),
            Operator::NotIn,
            RenderExpr::scalar("UNNEST", vec![RenderExpr::parameter(PARAMETER_LIST)]),
        ),
    ];
    let within_input = vec![RenderExpr::binary(
        left(SYMBOL_COLUMN),
        Operator::LessThan,
        right(SYMBOL_COLUMN),
    )];

    let plan = joined_pass(table1, table2, statistic, outside_input)
        .union_all(joined_pass(table1, table1, statistic, within_input));
    Cte::new(SUMMARY_CTE, plan)
}
