//! Pair-mode row query: one row per table-1 subject with both features'
//! values, for plotting and the significance summary.

use crate::feature_catalog::FeatureDescriptor;
use crate::render_plan::render_expr::{Operator, RenderExpr};
use crate::render_plan::{FromSource, Join, JoinType, RenderPlan, SelectItem};
use crate::utils::cte_naming::{LEFT_ALIAS, RIGHT_ALIAS, SUBJECT_COLUMN, VALUE_COLUMN};

pub const FIRST_VALUE: &str = "data1";
pub const SECOND_VALUE: &str = "data2";

/// `SELECT n1.data AS data1, <data2> AS data2, n1.ParticipantBarcode
///  FROM table1 AS n1 LEFT JOIN table2 AS n2 ON n1.ParticipantBarcode = n2.ParticipantBarcode`
///
/// For presence-only features `data2` is the 0/1 label "subject appears in
/// table 2"; otherwise it is table 2's value, NULL when the subject is missing.
pub fn pair_rows(table1: &str, table2: &str, feature2: &FeatureDescriptor) -> RenderPlan {
    let second = if feature2.is_presence_only() {
        RenderExpr::scalar(
            "IF",
            vec![
                RenderExpr::operator(
                    Operator::IsNull,
                    vec![RenderExpr::property(RIGHT_ALIAS, SUBJECT_COLUMN)],
                ),
                RenderExpr::integer(0),
                RenderExpr::integer(1),
            ],
        )
    } else {
        RenderExpr::property(RIGHT_ALIAS, VALUE_COLUMN)
    };

    RenderPlan::select_from(
        vec![
            SelectItem::aliased(RenderExpr::property(LEFT_ALIAS, VALUE_COLUMN), FIRST_VALUE),
            SelectItem::aliased(second, SECOND_VALUE),
            SelectItem::new(RenderExpr::property(LEFT_ALIAS, SUBJECT_COLUMN)),
        ],
        FromSource::cte(table1, Some(LEFT_ALIAS)),
    )
    .with_join(Join::new(
        JoinType::Left,
        FromSource::cte(table2, Some(RIGHT_ALIAS)),
        vec![RenderExpr::binary(
            RenderExpr::property(LEFT_ALIAS, SUBJECT_COLUMN),
            Operator::Equal,
            RenderExpr::property(RIGHT_ALIAS, SUBJECT_COLUMN),
        )],
    ))
}
