//! Single-feature table builder
//!
//! Normalizes one feature type into a CTE of uniform shape so the pairwise
//! composer can join any two of them on the subject barcode:
//!
//! - pair mode (one symbol or clinical column): `(symbol, data, ParticipantBarcode)`
//! - scan mode (every symbol): `(symbol, rnkdata, ParticipantBarcode)`
//! - scan input (the caller's gene list): `(symbol, data, rnkdata, ParticipantBarcode)`
//!
//! Molecular sources can hold several measurements per subject and symbol, so
//! their inner select always groups by (subject, symbol). Presence-only
//! (mutation) features carry no `data`/`rnkdata` columns at all.

use log::debug;

use crate::feature_catalog::feature_registry::{mid_rank_expr, RankStrategy, SymbolSource};
use crate::feature_catalog::{ClinicalColumn, FeatureDescriptor, Study};
use crate::render_plan::render_expr::{Column, Operator, RenderExpr};
use crate::render_plan::{Cte, FromSource, Join, JoinType, RenderPlan, SelectItem};
use crate::utils::cte_naming::{
    AVERAGED_COLUMN, PARAMETER_LIST, RANK_COLUMN, SUBJECT_COLUMN, SYMBOL_COLUMN,
    UNPIVOT_ALIAS, UNPIVOT_SOURCE_ALIAS, VALUE_COLUMN,
};

use super::errors::QueryPlannerError;

/// Build the normalized table for one feature.
///
/// With `symbol` set this is a pair-mode table restricted to that gene symbol
/// (or, for clinical types, that column). Without it, a scan-mode table over
/// every symbol; clinical scans unpivot `clinical_columns`.
pub fn build_table(
    symbol: Option<&str>,
    descriptor: &FeatureDescriptor,
    study: Study,
    label: &str,
    clinical_columns: &[ClinicalColumn],
) -> Result<Cte, QueryPlannerError> {
    let plan = match symbol {
        Some(symbol) => pair_table(symbol, descriptor, study)?,
        None if descriptor.is_clinical() => {
            clinical_scan_table(descriptor, study, clinical_columns)?
        }
        None => molecular_scan_table(descriptor, study, SymbolRestriction::NotNull, false),
    };
    debug!(
        "Built {} table {} for {} in {}",
        if symbol.is_some() { "pair" } else { "scan" },
        label,
        descriptor.feature_type,
        study
    );
    Ok(Cte::new(label, plan))
}

/// Scan-mode table 1: the caller's gene list, bound as `@PARAMETERLIST`.
///
/// Keeps both the measured value and its rank; the two-group statistics
/// accumulate one or the other and take their per-symbol totals from here.
pub fn build_input_table(
    descriptor: &FeatureDescriptor,
    study: Study,
    label: &str,
) -> Cte {
    let plan = molecular_scan_table(descriptor, study, SymbolRestriction::InParameterList, true);
    debug!(
        "Built input table {} for {} in {}",
        label, descriptor.feature_type, study
    );
    Cte::new(label, plan)
}

enum SymbolRestriction {
    NotNull,
    InParameterList,
}

fn cohort_filter(descriptor: &FeatureDescriptor, study: Study) -> RenderExpr {
    RenderExpr::binary(
        RenderExpr::column(descriptor.cohort_column),
        Operator::Equal,
        RenderExpr::string(study.code()),
    )
}

fn molecular_symbol_column(descriptor: &FeatureDescriptor) -> RenderExpr {
    match descriptor.symbol {
        SymbolSource::Column(name) => RenderExpr::column(name),
        // Clinical descriptors never reach the molecular paths.
        SymbolSource::ColumnName => RenderExpr::column(SYMBOL_COLUMN),
    }
}

/// `SELECT <symbol> AS symbol[, <value> AS <value_alias>], <subject> AS ParticipantBarcode
///  FROM <table> WHERE <cohort> AND <restriction> [AND <filter>] GROUP BY <subject>, <symbol>`
fn grouped_source(
    descriptor: &FeatureDescriptor,
    study: Study,
    restriction: RenderExpr,
    value_alias: &str,
) -> RenderPlan {
    let symbol = molecular_symbol_column(descriptor);
    let subject = RenderExpr::column(descriptor.subject_id_column);

    let mut items = vec![SelectItem::aliased(symbol.clone(), SYMBOL_COLUMN)];
    if let Some(value) = descriptor.value_expr(None) {
        items.push(SelectItem::aliased(value, value_alias));
    }
    items.push(SelectItem::aliased(subject.clone(), SUBJECT_COLUMN));

    let mut filters = vec![cohort_filter(descriptor, study), restriction];
    filters.extend(descriptor.filter.clone());

    RenderPlan::select_from(items, FromSource::table(descriptor.source_table))
        .with_filters(filters)
        .with_group_by(vec![subject, symbol])
}

fn pair_table(
    symbol: &str,
    descriptor: &FeatureDescriptor,
    study: Study,
) -> Result<RenderPlan, QueryPlannerError> {
    let inner = if descriptor.is_clinical() {
        let column = Column::validated(symbol)
            .map_err(|_| QueryPlannerError::InvalidIdentifier(symbol.to_string()))?;
        // Bound clinical columns always resolve; clinical descriptors are never presence-only.
        let symbol_expr = descriptor
            .symbol_expr(Some(&column.0))
            .unwrap_or_else(|| RenderExpr::string(&column.0));
        let value_expr = descriptor
            .value_expr(Some(&column.0))
            .unwrap_or(RenderExpr::Column(column));
        RenderPlan::select_from(
            vec![
                SelectItem::aliased(symbol_expr, SYMBOL_COLUMN),
                SelectItem::aliased(value_expr, AVERAGED_COLUMN),
                SelectItem::aliased(
                    RenderExpr::column(descriptor.subject_id_column),
                    SUBJECT_COLUMN,
                ),
            ],
            FromSource::table(descriptor.source_table),
        )
        .with_filters(vec![cohort_filter(descriptor, study)])
    } else {
        let restriction = RenderExpr::binary(
            molecular_symbol_column(descriptor),
            Operator::Equal,
            RenderExpr::string(symbol),
        );
        grouped_source(descriptor, study, restriction, AVERAGED_COLUMN)
    };

    let mut items = vec![SelectItem::new(RenderExpr::column(SYMBOL_COLUMN))];
    if !descriptor.is_presence_only() {
        items.push(SelectItem::aliased(
            RenderExpr::column(AVERAGED_COLUMN),
            VALUE_COLUMN,
        ));
    }
    items.push(SelectItem::new(RenderExpr::column(SUBJECT_COLUMN)));

    Ok(RenderPlan::select_from(items, FromSource::subquery(inner, None)))
}

fn molecular_scan_table(
    descriptor: &FeatureDescriptor,
    study: Study,
    restriction: SymbolRestriction,
    keep_value: bool,
) -> RenderPlan {
    let restriction = match restriction {
        SymbolRestriction::NotNull => RenderExpr::operator(
            Operator::IsNotNull,
            vec![molecular_symbol_column(descriptor)],
        ),
        SymbolRestriction::InParameterList => RenderExpr::binary(
            molecular_symbol_column(descriptor),
            Operator::In,
            RenderExpr::scalar("UNNEST", vec![RenderExpr::parameter(PARAMETER_LIST)]),
        ),
    };
    let inner = grouped_source(descriptor, study, restriction, VALUE_COLUMN);

    let mut items = vec![SelectItem::new(RenderExpr::column(SYMBOL_COLUMN))];
    if !descriptor.is_presence_only() {
        if keep_value {
            items.push(SelectItem::new(RenderExpr::column(VALUE_COLUMN)));
        }
        if descriptor.rank == RankStrategy::MidRank {
            items.push(SelectItem::aliased(
                mid_rank_expr(
                    RenderExpr::column(SYMBOL_COLUMN),
                    RenderExpr::column(VALUE_COLUMN),
                ),
                RANK_COLUMN,
            ));
        }
    }
    items.push(SelectItem::new(RenderExpr::column(SUBJECT_COLUMN)));

    RenderPlan::select_from(items, FromSource::subquery(inner, None))
}

/// Clinical scan: pack every discovered column into an array of
/// `STRUCT(symbol, data)` per patient and unnest it, one row per column value.
fn clinical_scan_table(
    descriptor: &FeatureDescriptor,
    study: Study,
    clinical_columns: &[ClinicalColumn],
) -> Result<RenderPlan, QueryPlannerError> {
    if clinical_columns.is_empty() {
        return Err(QueryPlannerError::MissingClinicalColumns {
            feature: descriptor.feature_type,
            table: descriptor.source_table.to_string(),
        });
    }

    let fragments = clinical_columns.iter().map(ClinicalColumn::fragment).collect();
    let inner = RenderPlan::select_from(
        vec![
            SelectItem::aliased(
                RenderExpr::column(descriptor.subject_id_column),
                SUBJECT_COLUMN,
            ),
            SelectItem::aliased(RenderExpr::ArrayLiteral(fragments), UNPIVOT_ALIAS),
        ],
        FromSource::table(descriptor.source_table),
    )
    .with_filters(vec![cohort_filter(descriptor, study)]);

    let unpivoted_symbol = RenderExpr::property(UNPIVOT_ALIAS, SYMBOL_COLUMN);
    let unpivoted_value = RenderExpr::property(UNPIVOT_ALIAS, VALUE_COLUMN);
    let rank = match descriptor.rank {
        RankStrategy::MidRank => Some(mid_rank_expr(
            unpivoted_symbol.clone(),
            unpivoted_value.clone(),
        )),
        RankStrategy::Category => Some(unpivoted_value.clone()),
        RankStrategy::Absent => None,
    };

    let mut items = vec![SelectItem::aliased(
        RenderExpr::property(UNPIVOT_SOURCE_ALIAS, SUBJECT_COLUMN),
        SUBJECT_COLUMN,
    )];
    if let Some(rank) = rank {
        items.push(SelectItem::aliased(rank, RANK_COLUMN));
    }
    items.push(SelectItem::aliased(unpivoted_symbol, SYMBOL_COLUMN));

    let mut filters = vec![RenderExpr::operator(
        Operator::IsNotNull,
        vec![unpivoted_value],
    )];
    filters.extend(descriptor.filter.clone());

    Ok(
        RenderPlan::select_from(items, FromSource::subquery(inner, Some(UNPIVOT_SOURCE_ALIAS)))
            .with_join(Join::new(
                JoinType::Cross,
                FromSource::unnest(
                    RenderExpr::property(UNPIVOT_SOURCE_ALIAS, UNPIVOT_ALIAS),
                    UNPIVOT_ALIAS,
                ),
                vec![],
            ))
            .with_filters(filters),
    )
}
