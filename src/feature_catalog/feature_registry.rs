//! Feature Registry
//!
//! Static description of every feature type the explorer can query: where the
//! data lives, how a row is turned into `(symbol, value, subject)` and which
//! statistic the feature drives when it is the second feature of a pair.
//!
//! The registry is built once on first use and never mutated, so concurrent
//! readers need no synchronisation beyond the `lazy_static` initialisation.
//!
//! Clinical feature types are late-bound: their symbol is the name of a
//! clinical table column and their value is that column's cell. The templates
//! show the unbound form as `COLUMN_NAME`; the table builder substitutes the
//! real column name supplied by the caller or by column discovery.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::FeatureCatalogError;
use crate::render_plan::render_expr::{Operator, RenderExpr};
use crate::render_plan::{OrderByItem, ToSql};
use crate::utils::cte_naming::{RANK_COLUMN, SYMBOL_COLUMN, UNPIVOT_ALIAS, VALUE_COLUMN};

/// Placeholder shown in templates for a late-bound clinical column.
pub const COLUMN_NAME_PLACEHOLDER: &str = "COLUMN_NAME";

/// Sentinel shown in templates for presence-only (mutation) values.
pub const PRESENCE_ONLY_SENTINEL: &str = "#";

/// Regex matching array-like clinical strings such as `[Not Available]`.
pub const ARRAY_LIKE_PATTERN: &str = r"^(\[.*\]$)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Numeric,
    Boolean,
    Categorical,
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataKind::Numeric => "numeric",
            DataKind::Boolean => "boolean",
            DataKind::Categorical => "categorical",
        };
        f.write_str(s)
    }
}

/// Statistic computed when a feature type is the second feature of a pair.
///
/// Each variant fixes the aggregate shape built by the pairwise composer and
/// the closed-form formula applied by the finalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatisticKind {
    /// Spearman correlation of the two rank columns.
    Correlation,
    /// Welch's t-score between mutated and non-mutated subjects.
    WelchT,
    /// Rank-biserial correlation between ranks and mutation status.
    RankBiserial,
    /// Kruskal-Wallis H across clinical categories.
    KruskalWallis,
}

impl StatisticKind {
    pub fn data_kind(&self) -> DataKind {
        match self {
            StatisticKind::Correlation => DataKind::Numeric,
            StatisticKind::WelchT | StatisticKind::RankBiserial => DataKind::Boolean,
            StatisticKind::KruskalWallis => DataKind::Categorical,
        }
    }

    /// Table-1 column accumulated into the sufficient statistics.
    ///
    /// Welch's test works on the measured values; everything else on ranks.
    pub fn accumulated_column(&self) -> &'static str {
        match self {
            StatisticKind::WelchT => VALUE_COLUMN,
            _ => RANK_COLUMN,
        }
    }

    /// Output column the final result is ordered by.
    pub fn score_column(&self) -> &'static str {
        match self {
            StatisticKind::Correlation | StatisticKind::RankBiserial => "correlation",
            StatisticKind::WelchT => "tscore",
            StatisticKind::KruskalWallis => "Hscore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureType {
    GeneExpression,
    SomaticCopyNumber,
    SomaticMutationTTest,
    SomaticMutationSpearman,
    ClinicalNumeric,
    ClinicalCategorical,
}

impl FeatureType {
    pub const ALL: &'static [FeatureType] = &[
        FeatureType::GeneExpression,
        FeatureType::SomaticMutationSpearman,
        FeatureType::SomaticMutationTTest,
        FeatureType::SomaticCopyNumber,
        FeatureType::ClinicalNumeric,
        FeatureType::ClinicalCategorical,
    ];

    /// Display name, also the registry key.
    pub fn name(&self) -> &'static str {
        match self {
            FeatureType::GeneExpression => "Gene Expression",
            FeatureType::SomaticCopyNumber => "Somatic Copy Number",
            FeatureType::SomaticMutationTTest => "Somatic Mutation t-test",
            FeatureType::SomaticMutationSpearman => "Somatic Mutation Spearman",
            FeatureType::ClinicalNumeric => "Clinical Numeric",
            FeatureType::ClinicalCategorical => "Clinical Categorical",
        }
    }

    pub fn is_clinical(&self) -> bool {
        matches!(
            self,
            FeatureType::ClinicalNumeric | FeatureType::ClinicalCategorical
        )
    }

    pub fn descriptor(&self) -> &'static FeatureDescriptor {
        // Every variant is inserted when the registry is built.
        &FEATURE_REGISTRY[self.name()]
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureType {
    type Err = FeatureCatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        describe(s).map(|descriptor| descriptor.feature_type)
    }
}

/// Where a row's symbol comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolSource {
    /// A gene symbol column of the source table.
    Column(&'static str),
    /// The late-bound clinical column name itself, emitted as a string literal.
    ColumnName,
}

/// Where a row's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueSource {
    /// An aggregate over duplicate measurements of one subject and symbol.
    Aggregate(RenderExpr),
    /// The late-bound clinical column's cell.
    ColumnValue,
    /// Presence/absence only; the feature has no value column.
    PresenceOnly,
}

/// How scan-mode tables rank a feature's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankStrategy {
    /// Tie-aware mid-rank: `rank + (tie count - 1) / 2` within each symbol.
    MidRank,
    /// Categories pass through unranked.
    Category,
    Absent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureDescriptor {
    pub feature_type: FeatureType,
    pub source_table: &'static str,
    pub symbol: SymbolSource,
    pub value: ValueSource,
    pub rank: RankStrategy,
    pub subject_id_column: &'static str,
    /// Column holding the study code (`Study` or the clinical `acronym`).
    pub cohort_column: &'static str,
    /// Extra row filter. Clinical filters refer to the unpivoted value column.
    pub filter: Option<RenderExpr>,
    pub data_kind: DataKind,
    pub statistic: StatisticKind,
}

impl FeatureDescriptor {
    pub fn is_clinical(&self) -> bool {
        self.feature_type.is_clinical()
    }

    pub fn is_presence_only(&self) -> bool {
        matches!(self.value, ValueSource::PresenceOnly)
    }

    /// Symbol expression, substituting `column` for the clinical placeholder.
    ///
    /// Returns `None` for a clinical type when no column is bound.
    pub fn symbol_expr(&self, column: Option<&str>) -> Option<RenderExpr> {
        match &self.symbol {
            SymbolSource::Column(name) => Some(RenderExpr::column(name)),
            SymbolSource::ColumnName => column.map(RenderExpr::string),
        }
    }

    /// Value expression, substituting `column` for the clinical placeholder.
    ///
    /// Presence-only features never have one.
    pub fn value_expr(&self, column: Option<&str>) -> Option<RenderExpr> {
        match &self.value {
            ValueSource::Aggregate(expr) => Some(expr.clone()),
            ValueSource::ColumnValue => column.map(RenderExpr::column),
            ValueSource::PresenceOnly => None,
        }
    }

    pub fn symbol_template(&self) -> String {
        match &self.symbol {
            SymbolSource::Column(name) => name.to_string(),
            SymbolSource::ColumnName => format!("'{}'", COLUMN_NAME_PLACEHOLDER),
        }
    }

    pub fn value_template(&self) -> String {
        match &self.value {
            ValueSource::Aggregate(expr) => expr.to_sql(),
            ValueSource::ColumnValue => COLUMN_NAME_PLACEHOLDER.to_string(),
            ValueSource::PresenceOnly => PRESENCE_ONLY_SENTINEL.to_string(),
        }
    }

    pub fn rank_template(&self) -> String {
        match self.rank {
            RankStrategy::MidRank => mid_rank_expr(
                RenderExpr::column(SYMBOL_COLUMN),
                RenderExpr::column(VALUE_COLUMN),
            )
            .to_sql(),
            RankStrategy::Category => format!("{}.{}", UNPIVOT_ALIAS, VALUE_COLUMN),
            RankStrategy::Absent => PRESENCE_ONLY_SENTINEL.to_string(),
        }
    }
}

/// Tie-aware mid-rank of `value` within each `symbol` partition:
/// `RANK() OVER (...) + (COUNT(*) OVER (PARTITION BY symbol, value) - 1) / 2.0`.
pub fn mid_rank_expr(symbol: RenderExpr, value: RenderExpr) -> RenderExpr {
    let rank = RenderExpr::window(
        "RANK",
        vec![],
        vec![symbol.clone()],
        vec![OrderByItem::asc(value.clone())],
    );
    let ties = RenderExpr::window(
        "COUNT",
        vec![RenderExpr::Star],
        vec![symbol, RenderExpr::cast(value, "STRING")],
        vec![],
    );
    RenderExpr::binary(
        rank,
        Operator::Addition,
        RenderExpr::binary(
            RenderExpr::binary(ties, Operator::Subtraction, RenderExpr::integer(1)),
            Operator::Division,
            RenderExpr::float(2.0),
        ),
    )
}

/// Look up a feature type by its display name.
pub fn describe(name: &str) -> Result<&'static FeatureDescriptor, FeatureCatalogError> {
    FEATURE_REGISTRY
        .get(name.trim())
        .ok_or_else(|| FeatureCatalogError::UnknownFeatureType {
            name: name.to_string(),
        })
}

const EXPRESSION_TABLE: &str =
    "pancancer-atlas.Filtered.EBpp_AdjustPANCAN_IlluminaHiSeq_RNASeqV2_genExp_filtered";
const COPY_NUMBER_TABLE: &str = "pancancer-atlas.Filtered.all_CNVR_data_by_gene_filtered";
const MUTATION_TABLE: &str = "pancancer-atlas.Filtered.MC3_MAF_V5_one_per_tumor_sample";
const CLINICAL_TABLE: &str =
    "pancancer-atlas.Filtered.clinical_PANCAN_patient_with_followup_filtered";

const MOLECULAR_SUBJECT: &str = "ParticipantBarcode";
const CLINICAL_SUBJECT: &str = "bcr_patient_barcode";
const MOLECULAR_COHORT: &str = "Study";
const CLINICAL_COHORT: &str = "acronym";

fn is_not_null(column: &str) -> RenderExpr {
    RenderExpr::operator(Operator::IsNotNull, vec![RenderExpr::column(column)])
}

fn build_descriptor(feature_type: FeatureType) -> FeatureDescriptor {
    match feature_type {
        FeatureType::GeneExpression => FeatureDescriptor {
            feature_type,
            source_table: EXPRESSION_TABLE,
            symbol: SymbolSource::Column("Symbol"),
            // AVG(LOG10(normalized_count + 1))
            value: ValueSource::Aggregate(RenderExpr::aggregate(
                "AVG",
                vec![RenderExpr::scalar(
                    "LOG10",
                    vec![RenderExpr::binary(
                        RenderExpr::column("normalized_count"),
                        Operator::Addition,
                        RenderExpr::integer(1),
                    )],
                )],
            )),
            rank: RankStrategy::MidRank,
            subject_id_column: MOLECULAR_SUBJECT,
            cohort_column: MOLECULAR_COHORT,
            filter: Some(is_not_null("normalized_count")),
            data_kind: DataKind::Numeric,
            statistic: StatisticKind::Correlation,
        },
        FeatureType::SomaticCopyNumber => FeatureDescriptor {
            feature_type,
            source_table: COPY_NUMBER_TABLE,
            symbol: SymbolSource::Column("Gene_Symbol"),
            value: ValueSource::Aggregate(RenderExpr::aggregate(
                "AVG",
                vec![RenderExpr::column("GISTIC_Calls")],
            )),
            rank: RankStrategy::MidRank,
            subject_id_column: MOLECULAR_SUBJECT,
            cohort_column: MOLECULAR_COHORT,
            filter: Some(is_not_null("GISTIC_Calls")),
            data_kind: DataKind::Numeric,
            statistic: StatisticKind::Correlation,
        },
        FeatureType::SomaticMutationTTest | FeatureType::SomaticMutationSpearman => {
            FeatureDescriptor {
                feature_type,
                source_table: MUTATION_TABLE,
                symbol: SymbolSource::Column("Hugo_Symbol"),
                value: ValueSource::PresenceOnly,
                rank: RankStrategy::Absent,
                subject_id_column: MOLECULAR_SUBJECT,
                cohort_column: MOLECULAR_COHORT,
                filter: Some(RenderExpr::binary(
                    RenderExpr::column("FILTER"),
                    Operator::Equal,
                    RenderExpr::string("PASS"),
                )),
                data_kind: DataKind::Boolean,
                statistic: if feature_type == FeatureType::SomaticMutationTTest {
                    StatisticKind::WelchT
                } else {
                    StatisticKind::RankBiserial
                },
            }
        }
        FeatureType::ClinicalNumeric => FeatureDescriptor {
            feature_type,
            source_table: CLINICAL_TABLE,
            symbol: SymbolSource::ColumnName,
            value: ValueSource::ColumnValue,
            rank: RankStrategy::MidRank,
            subject_id_column: CLINICAL_SUBJECT,
            cohort_column: CLINICAL_COHORT,
            filter: None,
            data_kind: DataKind::Numeric,
            statistic: StatisticKind::Correlation,
        },
        FeatureType::ClinicalCategorical => FeatureDescriptor {
            feature_type,
            source_table: CLINICAL_TABLE,
            symbol: SymbolSource::ColumnName,
            value: ValueSource::ColumnValue,
            rank: RankStrategy::Category,
            subject_id_column: CLINICAL_SUBJECT,
            cohort_column: CLINICAL_COHORT,
            // TODO: confirm with the data owners whether array-like strings are
            // meant to be dropped or indicate a column that should be excluded.
            filter: Some(RenderExpr::operator(
                Operator::Not,
                vec![RenderExpr::scalar(
                    "REGEXP_CONTAINS",
                    vec![
                        RenderExpr::property(UNPIVOT_ALIAS, VALUE_COLUMN),
                        RenderExpr::regex(ARRAY_LIKE_PATTERN),
                    ],
                )],
            )),
            data_kind: DataKind::Categorical,
            statistic: StatisticKind::KruskalWallis,
        },
    }
}

lazy_static::lazy_static! {
    static ref FEATURE_REGISTRY: HashMap<&'static str, FeatureDescriptor> = FeatureType::ALL
        .iter()
        .map(|feature_type| (feature_type.name(), build_descriptor(*feature_type)))
        .collect();
}
