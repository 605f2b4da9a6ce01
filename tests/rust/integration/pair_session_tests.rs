use regulome_explorer::feature_catalog::{FeatureType, Study};
use regulome_explorer::presentation::pair_summary::KruskalWallisOutcome;
use regulome_explorer::presentation::{format_pair_summary, PairRow, PairSummary};

use super::mock_warehouse::{outcome, session, table, MockWarehouse};

#[tokio::test]
async fn test_mutation_pair_summary() {
    let mut warehouse = MockWarehouse::new();
    warehouse.expect_table_schema().never();
    warehouse
        .expect_submit()
        .withf(|request| {
            request.parameters.is_empty()
                && request.sql.contains("'IGF2'")
                && request.sql.contains("'TP53'")
        })
        .times(1)
        .returning(|_| {
            Ok(outcome(
                table(
                    &["data1", "data2", "ParticipantBarcode"],
                    &[
                        &[Some("1.0"), Some("0"), Some("TCGA-A1")],
                        &[Some("1.5"), Some("0"), Some("TCGA-A2")],
                        &[Some("2.0"), Some("0"), Some("TCGA-A3")],
                        &[Some("3.0"), Some("1"), Some("TCGA-A4")],
                        &[Some("3.5"), Some("1"), Some("TCGA-A5")],
                        &[Some("4.5"), Some("1"), Some("TCGA-A6")],
                    ],
                ),
                4096,
            ))
        });

    let analysis = session(warehouse)
        .pair(
            Study::Ucec,
            FeatureType::GeneExpression,
            FeatureType::SomaticMutationTTest,
            "IGF2",
            "TP53",
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(analysis.rows.len(), 6);
    assert_eq!(analysis.rows[3], PairRow::new(Some(3.0), Some("1")));
    match &analysis.summary {
        PairSummary::WelchT { groups, test } => {
            assert_eq!(groups[0].count, 3);
            assert_eq!(groups[1].count, 3);
            assert!((groups[0].center - 1.5).abs() < 1e-9);
            assert!(test.as_ref().unwrap().statistic > 0.0);
        }
        other => panic!("unexpected summary {:?}", other),
    }
    assert!(format_pair_summary(&analysis.summary).starts_with("group"));
}

#[tokio::test]
async fn test_categorical_pair_with_small_groups() {
    let mut warehouse = MockWarehouse::new();
    warehouse
        .expect_submit()
        .withf(|request| request.sql.contains("'histological_type' AS symbol"))
        .returning(|_| {
            Ok(outcome(
                table(
                    &["data1", "data2", "ParticipantBarcode"],
                    &[
                        &[Some("2.0"), Some("Serous"), Some("TCGA-B1")],
                        &[Some("3.0"), Some("Endometrioid"), Some("TCGA-B2")],
                        &[Some("5.0"), None, Some("TCGA-B3")],
                    ],
                ),
                0,
            ))
        });

    let analysis = session(warehouse)
        .pair(
            Study::Ucec,
            FeatureType::GeneExpression,
            FeatureType::ClinicalCategorical,
            "IGF2",
            "histological_type",
        )
        .await
        .unwrap()
        .unwrap();

    match analysis.summary {
        PairSummary::KruskalWallis { groups, outcome } => {
            assert_eq!(groups.len(), 2);
            assert_eq!(
                outcome,
                KruskalWallisOutcome::InsufficientGroups { qualifying: 0 }
            );
        }
        other => panic!("unexpected summary {:?}", other),
    }
}
