use regulome_explorer::feature_catalog::{ColumnInfo, FeatureType, Study};
use regulome_explorer::query_planner::{
    parse_symbol_list, plan_pair_query, plan_scan_query, PairRequest, QueryPlannerError,
    ScanRequest,
};
use test_case::test_case;

fn scan(feature2: FeatureType) -> ScanRequest {
    ScanRequest {
        study: Study::Brca,
        feature1: FeatureType::GeneExpression,
        feature2,
        symbols: parse_symbol_list("IGF2 ADAM6"),
        min_samples: 30,
    }
}

fn clinical_schema() -> Vec<ColumnInfo> {
    vec![
        ColumnInfo::new("bcr_patient_barcode", "STRING"),
        ColumnInfo::new("acronym", "STRING"),
        ColumnInfo::new("age_at_initial_pathologic_diagnosis", "INTEGER"),
        ColumnInfo::new("histological_type", "STRING"),
    ]
}

#[test_case(FeatureType::SomaticCopyNumber, "ORDER BY correlation DESC"; "copy number")]
#[test_case(FeatureType::SomaticMutationTTest, "ORDER BY tscore DESC"; "welch")]
#[test_case(FeatureType::SomaticMutationSpearman, "ORDER BY correlation DESC"; "rank biserial")]
#[test_case(FeatureType::ClinicalNumeric, "ORDER BY correlation DESC"; "clinical numeric")]
#[test_case(FeatureType::ClinicalCategorical, "ORDER BY Hscore DESC"; "kruskal wallis")]
fn test_scan_ordering_follows_statistic(feature2: FeatureType, order_by: &str) {
    let sql = plan_scan_query(&scan(feature2), &clinical_schema())
        .unwrap()
        .to_sql();
    assert!(sql.starts_with("WITH\ntable1 AS (\n"));
    assert!(sql.trim_end().ends_with(order_by), "{}", sql);
    assert!(sql.contains("'BRCA'"));
}

#[test]
fn test_scan_sql_has_no_inlined_symbols() {
    let sql = plan_scan_query(&scan(FeatureType::SomaticCopyNumber), &[])
        .unwrap()
        .to_sql();
    assert!(sql.contains("@PARAMETERLIST"));
    assert!(!sql.contains("IGF2"));
    assert!(!sql.contains("ADAM6"));
}

#[test]
fn test_self_scan_adds_within_list_pass() {
    let sql = plan_scan_query(&scan(FeatureType::GeneExpression), &[])
        .unwrap()
        .to_sql();
    assert!(sql.contains("n2.symbol NOT IN UNNEST(@PARAMETERLIST)"));
    assert!(sql.contains("UNION ALL"));
}

#[test]
fn test_cross_scan_has_single_pass() {
    let sql = plan_scan_query(&scan(FeatureType::SomaticCopyNumber), &[])
        .unwrap()
        .to_sql();
    assert!(!sql.contains("UNION ALL"));
}

#[test]
fn test_clinical_scan_unpivots_discovered_columns() {
    let sql = plan_scan_query(&scan(FeatureType::ClinicalCategorical), &clinical_schema())
        .unwrap()
        .to_sql();
    assert!(sql.contains("'histological_type' AS symbol"));
    assert!(!sql.contains("'age_at_initial_pathologic_diagnosis' AS symbol"));
    assert!(!sql.contains("'acronym' AS symbol"));
}

#[test]
fn test_pair_query_quotes_labels() {
    let query = plan_pair_query(&PairRequest {
        study: Study::Ucec,
        feature1: FeatureType::GeneExpression,
        feature2: FeatureType::SomaticCopyNumber,
        label1: "IGF2".to_string(),
        label2: "O'Brien".to_string(),
    })
    .unwrap();
    assert!(query.parameters.is_empty());

    let sql = query.to_sql();
    assert!(sql.contains("'IGF2'"));
    assert!(sql.contains(r"'O\'Brien'"));
    assert!(sql.contains("data1"));
    assert!(sql.contains("data2"));
}

#[test]
fn test_pair_rejects_categorical_first_feature() {
    let err = plan_pair_query(&PairRequest {
        study: Study::Ucec,
        feature1: FeatureType::ClinicalCategorical,
        feature2: FeatureType::GeneExpression,
        label1: "histological_type".to_string(),
        label2: "IGF2".to_string(),
    })
    .unwrap_err();
    assert!(matches!(
        err,
        QueryPlannerError::UnsupportedFeaturePair {
            feature1: FeatureType::ClinicalCategorical,
            ..
        }
    ));
}
