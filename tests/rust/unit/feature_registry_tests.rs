use regulome_explorer::feature_catalog::column_discovery::{classify_column, ColumnTreatment};
use regulome_explorer::feature_catalog::{
    describe, discover_columns, ColumnInfo, DataKind, FeatureCatalogError, FeatureType,
    RankStrategy, StatisticKind, Study,
};
use regulome_explorer::render_plan::ToSql;
use test_case::test_case;

#[test_case("Gene Expression", StatisticKind::Correlation, DataKind::Numeric; "expression")]
#[test_case("Somatic Copy Number", StatisticKind::Correlation, DataKind::Numeric; "copy number")]
#[test_case("Somatic Mutation t-test", StatisticKind::WelchT, DataKind::Boolean; "mutation t-test")]
#[test_case("Somatic Mutation Spearman", StatisticKind::RankBiserial, DataKind::Boolean; "mutation spearman")]
#[test_case("Clinical Numeric", StatisticKind::Correlation, DataKind::Numeric; "clinical numeric")]
#[test_case("Clinical Categorical", StatisticKind::KruskalWallis, DataKind::Categorical; "clinical categorical")]
fn test_registry_entry(name: &str, statistic: StatisticKind, kind: DataKind) {
    let descriptor = describe(name).unwrap();
    assert_eq!(descriptor.statistic, statistic);
    assert_eq!(descriptor.data_kind, kind);
    assert_eq!(statistic.data_kind(), kind);
    assert_eq!(descriptor.feature_type.name(), name);
    assert_eq!(name.parse::<FeatureType>().unwrap(), descriptor.feature_type);
}

#[test]
fn test_unknown_feature_name() {
    let err = describe("Methylation").unwrap_err();
    assert_eq!(
        err,
        FeatureCatalogError::UnknownFeatureType {
            name: "Methylation".to_string()
        }
    );
}

#[test]
fn test_every_feature_is_registered() {
    assert_eq!(FeatureType::ALL.len(), 6);
    for feature in FeatureType::ALL {
        assert_eq!(feature.descriptor().feature_type, *feature);
    }
}

#[test]
fn test_rank_strategies() {
    assert_eq!(FeatureType::GeneExpression.descriptor().rank, RankStrategy::MidRank);
    assert_eq!(
        FeatureType::SomaticMutationTTest.descriptor().rank,
        RankStrategy::Absent
    );
    assert_eq!(
        FeatureType::ClinicalCategorical.descriptor().rank,
        RankStrategy::Category
    );
}

#[test]
fn test_expression_templates() {
    let descriptor = FeatureType::GeneExpression.descriptor();
    assert_eq!(descriptor.symbol_template(), "Symbol");
    assert_eq!(descriptor.value_template(), "AVG(LOG10(normalized_count + 1))");
    let rank = descriptor.rank_template();
    assert!(rank.starts_with("RANK() OVER (PARTITION BY symbol ORDER BY data"));
    assert!(rank.contains("COUNT(*) OVER (PARTITION BY symbol, CAST(data AS STRING))"));
}

#[test_case("ucec", Study::Ucec; "lower case")]
#[test_case(" BRCA ", Study::Brca; "padded")]
fn test_study_codes(code: &str, study: Study) {
    assert_eq!(code.parse::<Study>().unwrap(), study);
}

#[test]
fn test_unknown_study() {
    assert!(matches!(
        "XYZ".parse::<Study>(),
        Err(FeatureCatalogError::UnknownStudy { .. })
    ));
}

#[test_case(DataKind::Numeric, "age", "INTEGER", ColumnTreatment::Direct; "numeric integer")]
#[test_case(DataKind::Numeric, "weight", "FLOAT64", ColumnTreatment::Direct; "numeric float")]
#[test_case(DataKind::Numeric, "height", "STRING", ColumnTreatment::GuardedNumericCast; "numeric string")]
#[test_case(DataKind::Numeric, "vital", "BOOLEAN", ColumnTreatment::Skip; "numeric other")]
#[test_case(DataKind::Categorical, "stage", "STRING", ColumnTreatment::Direct; "categorical string")]
#[test_case(DataKind::Categorical, "age", "INTEGER", ColumnTreatment::Skip; "categorical integer")]
#[test_case(DataKind::Categorical, "bcr_patient_barcode", "STRING", ColumnTreatment::Skip; "identifier")]
#[test_case(DataKind::Numeric, "acronym", "STRING", ColumnTreatment::Skip; "cohort")]
fn test_column_decision_table(
    kind: DataKind,
    name: &str,
    data_type: &str,
    expected: ColumnTreatment,
) {
    assert_eq!(classify_column(kind, &ColumnInfo::new(name, data_type)), expected);
}

#[test]
fn test_discovered_fragments() {
    let schema = vec![
        ColumnInfo::new("bcr_patient_barcode", "STRING"),
        ColumnInfo::new("age_at_initial_pathologic_diagnosis", "INTEGER"),
        ColumnInfo::new("height", "STRING"),
    ];

    let columns = discover_columns(FeatureType::ClinicalNumeric.descriptor(), &schema);
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["age_at_initial_pathologic_diagnosis", "height"]);

    let guarded = columns[1].fragment().to_sql();
    assert!(guarded.contains("REGEXP_CONTAINS(height"));
    assert!(guarded.contains("SAFE_CAST(height AS NUMERIC)"));
    assert!(guarded.contains("AS symbol"));

    assert!(discover_columns(FeatureType::GeneExpression.descriptor(), &schema).is_empty());
}
