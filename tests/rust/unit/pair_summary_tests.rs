use regulome_explorer::feature_catalog::FeatureType;
use regulome_explorer::presentation::pair_summary::{
    kruskal_wallis, median, welch_t_test, KruskalWallisOutcome,
};
use regulome_explorer::presentation::{format_pair_summary, summarize_pair, PairRow, PairSummary};

fn numeric_rows(pairs: &[(f64, &str)]) -> Vec<PairRow> {
    pairs
        .iter()
        .map(|(x, y)| PairRow::new(Some(*x), Some(y)))
        .collect()
}

#[test]
fn test_numeric_pair_skips_unparseable_values() {
    let mut rows = numeric_rows(&[(1.0, "10"), (2.0, "20"), (3.0, "15"), (4.0, "40")]);
    rows.push(PairRow::new(Some(5.0), Some("[Not Available]")));
    rows.push(PairRow::new(None, Some("50")));

    match summarize_pair(FeatureType::ClinicalNumeric, &rows, 5) {
        PairSummary::Spearman(Some(test)) => {
            assert_eq!(test.n, 4);
            // ranks (1,2,3,4) vs (1,3,2,4)
            assert!((test.coefficient - 0.8).abs() < 1e-9);
            assert!(test.p_value.unwrap() > 0.05);
        }
        other => panic!("unexpected summary {:?}", other),
    }
}

#[test]
fn test_numeric_pair_without_variation() {
    let rows = numeric_rows(&[(1.0, "3"), (2.0, "3"), (3.0, "3")]);
    let summary = summarize_pair(FeatureType::GeneExpression, &rows, 5);
    assert_eq!(summary, PairSummary::Spearman(None));
    assert!(format_pair_summary(&summary).contains("not enough paired values"));
}

#[test]
fn test_welch_pair_matches_reference() {
    let rows = numeric_rows(&[
        (1.0, "0"),
        (2.0, "0"),
        (4.0, "0"),
        (6.0, "1"),
        (9.0, "1"),
        (9.5, "1"),
    ]);

    match summarize_pair(FeatureType::SomaticMutationTTest, &rows, 5) {
        PairSummary::WelchT { groups, test } => {
            let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
            assert_eq!(labels, vec!["0", "1"]);
            assert_eq!(test, welch_t_test(&[6.0, 9.0, 9.5], &[1.0, 2.0, 4.0]));
            assert!(test.unwrap().statistic > 0.0);
        }
        other => panic!("unexpected summary {:?}", other),
    }
}

#[test]
fn test_welch_needs_two_values_per_group() {
    let rows = numeric_rows(&[(1.0, "0"), (2.0, "0"), (6.0, "1")]);
    let summary = summarize_pair(FeatureType::SomaticMutationTTest, &rows, 5);
    match &summary {
        PairSummary::WelchT { groups, test } => {
            assert_eq!(groups.len(), 2);
            assert!(test.is_none());
        }
        other => panic!("unexpected summary {:?}", other),
    }
    assert!(format_pair_summary(&summary).contains("both groups need two or more"));
}

#[test]
fn test_categorical_pair_computes_h() {
    let rows = numeric_rows(&[
        (1.0, "Stage I"),
        (2.0, "Stage I"),
        (3.0, "Stage I"),
        (4.0, "Stage II"),
        (5.0, "Stage II"),
        (6.0, "Stage II"),
    ]);

    match summarize_pair(FeatureType::ClinicalCategorical, &rows, 2) {
        PairSummary::KruskalWallis { groups, outcome } => {
            assert_eq!(groups[0].center, median(&[1.0, 2.0, 3.0]));
            let expected =
                kruskal_wallis(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
            assert_eq!(outcome, KruskalWallisOutcome::Computed(expected));
        }
        other => panic!("unexpected summary {:?}", other),
    }
}

#[test]
fn test_median() {
    assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    assert!(median(&[]).is_nan());
}
