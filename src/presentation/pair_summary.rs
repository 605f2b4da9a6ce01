//! Significance summary for one symbol pair
//!
//! Works on the raw joined rows of the pair-mode query and reports the test
//! matching the statistic feature 2 drives:
//!
//! - numeric: Spearman rho, p-value from Student's t with n - 2 df
//! - mutation t-test: group means, Welch's t with Welch-Satterthwaite df
//! - mutation Spearman: group means, Pearson r between average ranks and the 0/1 label
//! - categorical: group medians, tie-corrected Kruskal-Wallis H over groups
//!   larger than the minimum sample size, chi-squared p-value

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

use crate::feature_catalog::feature_registry::ARRAY_LIKE_PATTERN;
use crate::feature_catalog::{FeatureType, StatisticKind};

lazy_static::lazy_static! {
    static ref ARRAY_LIKE: Regex = Regex::new(ARRAY_LIKE_PATTERN).unwrap();
}

/// One row of the pair-mode query.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRow {
    pub data1: Option<f64>,
    /// Numeric value, 0/1 mutation label or clinical category, as returned.
    pub data2: Option<String>,
}

impl PairRow {
    pub fn new(data1: Option<f64>, data2: Option<&str>) -> Self {
        Self {
            data1,
            data2: data2.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub label: String,
    pub count: usize,
    /// Mean for the mutation groups, median for clinical categories.
    pub center: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationTest {
    pub n: usize,
    pub coefficient: f64,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WelchTest {
    pub statistic: f64,
    pub degrees_of_freedom: f64,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KruskalWallisTest {
    pub statistic: f64,
    pub groups: usize,
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum KruskalWallisOutcome {
    Computed(KruskalWallisTest),
    /// Fewer than two categories have more than the minimum sample count.
    InsufficientGroups { qualifying: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PairSummary {
    Spearman(Option<CorrelationTest>),
    WelchT {
        groups: Vec<GroupSummary>,
        test: Option<WelchTest>,
    },
    RankBiserial {
        groups: Vec<GroupSummary>,
        test: Option<CorrelationTest>,
    },
    KruskalWallis {
        groups: Vec<GroupSummary>,
        outcome: KruskalWallisOutcome,
    },
}

/// Summarize the pair rows for `feature2`.
pub fn summarize_pair(feature2: FeatureType, rows: &[PairRow], min_samples: usize) -> PairSummary {
    match feature2.descriptor().statistic {
        StatisticKind::Correlation => {
            let (xs, ys): (Vec<f64>, Vec<f64>) = rows
                .iter()
                .filter_map(|row| {
                    let y = row.data2.as_deref()?.trim().parse::<f64>().ok()?;
                    Some((row.data1?, y))
                })
                .unzip();
            PairSummary::Spearman(spearman(&xs, &ys))
        }
        StatisticKind::WelchT => {
            let (mutated, rest) = split_by_label(rows);
            PairSummary::WelchT {
                groups: label_groups(&mutated, &rest),
                test: welch_t_test(&mutated, &rest),
            }
        }
        StatisticKind::RankBiserial => {
            let (mutated, rest) = split_by_label(rows);
            let values: Vec<f64> = mutated.iter().chain(&rest).copied().collect();
            let labels: Vec<f64> = std::iter::repeat(1.0)
                .take(mutated.len())
                .chain(std::iter::repeat(0.0).take(rest.len()))
                .collect();
            PairSummary::RankBiserial {
                groups: label_groups(&mutated, &rest),
                test: correlation_test(&average_ranks(&values), &labels),
            }
        }
        StatisticKind::KruskalWallis => {
            let mut categories: BTreeMap<String, Vec<f64>> = BTreeMap::new();
            for row in rows {
                if let (Some(value), Some(category)) = (row.data1, row.data2.as_deref()) {
                    if !ARRAY_LIKE.is_match(category) {
                        categories.entry(category.to_string()).or_default().push(value);
                    }
                }
            }

            let groups = categories
                .iter()
                .map(|(label, values)| GroupSummary {
                    label: label.clone(),
                    count: values.len(),
                    center: median(values),
                })
                .collect();

            let qualifying: Vec<Vec<f64>> = categories
                .into_values()
                .filter(|values| values.len() > min_samples)
                .collect();
            let outcome = if qualifying.len() < 2 {
                KruskalWallisOutcome::InsufficientGroups {
                    qualifying: qualifying.len(),
                }
            } else {
                match kruskal_wallis(&qualifying) {
                    Some(test) => KruskalWallisOutcome::Computed(test),
                    None => KruskalWallisOutcome::InsufficientGroups {
                        qualifying: qualifying.len(),
                    },
                }
            };
            PairSummary::KruskalWallis { groups, outcome }
        }
    }
}

/// Split feature-1 values into (label 1, label 0) groups.
fn split_by_label(rows: &[PairRow]) -> (Vec<f64>, Vec<f64>) {
    let mut mutated = Vec::new();
    let mut rest = Vec::new();
    for row in rows {
        let Some(value) = row.data1 else { continue };
        let label = row
            .data2
            .as_deref()
            .and_then(|label| label.trim().parse::<f64>().ok())
            .unwrap_or(0.0);
        if label > 0.5 {
            mutated.push(value);
        } else {
            rest.push(value);
        }
    }
    (mutated, rest)
}

fn label_groups(mutated: &[f64], rest: &[f64]) -> Vec<GroupSummary> {
    [("0", rest), ("1", mutated)]
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(label, values)| GroupSummary {
            label: label.to_string(),
            count: values.len(),
            center: mean(values),
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sample_variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() as f64 - 1.0)
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 1-based ranks; ties share the average of the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // positions start..end hold ranks start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &index in &order[start..end] {
            ranks[index] = rank;
        }
        start = end;
    }
    ranks
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let (mx, my) = (mean(xs), mean(ys));
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sxx += (x - mx) * (x - mx);
        syy += (y - my) * (y - my);
        sxy += (x - mx) * (y - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

fn two_sided_t_p_value(t: f64, degrees_of_freedom: f64) -> Option<f64> {
    if t.is_infinite() {
        return Some(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom).ok()?;
    Some(2.0 * (1.0 - dist.cdf(t.abs())))
}

/// Pearson r with the usual t-based two-sided p-value.
pub fn correlation_test(xs: &[f64], ys: &[f64]) -> Option<CorrelationTest> {
    let r = pearson(xs, ys)?;
    let n = xs.len();
    let p_value = if n > 2 {
        let df = (n - 2) as f64;
        two_sided_t_p_value(r * (df / (1.0 - r * r)).sqrt(), df)
    } else {
        None
    };
    Some(CorrelationTest {
        n,
        coefficient: r,
        p_value,
    })
}

pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<CorrelationTest> {
    correlation_test(&average_ranks(xs), &average_ranks(ys))
}

/// Welch's unequal-variance t-test of `a` against `b`.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<WelchTest> {
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let va = sample_variance(a) / a.len() as f64;
    let vb = sample_variance(b) / b.len() as f64;
    let se2 = va + vb;
    if se2 <= 0.0 {
        return None;
    }
    let statistic = (mean(a) - mean(b)) / se2.sqrt();
    let degrees_of_freedom =
        se2 * se2 / (va * va / (a.len() as f64 - 1.0) + vb * vb / (b.len() as f64 - 1.0));
    Some(WelchTest {
        statistic,
        degrees_of_freedom,
        p_value: two_sided_t_p_value(statistic, degrees_of_freedom),
    })
}

/// Kruskal-Wallis H with tie correction; `None` for fewer than two groups
/// or when every value is tied.
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> Option<KruskalWallisTest> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return None;
    }

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let ranks = average_ranks(&pooled);
    let n = pooled.len() as f64;

    let mut offset = 0;
    let mut between = 0.0;
    for group in &groups {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        between += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }
    let h = 12.0 / (n * (n + 1.0)) * between - 3.0 * (n + 1.0);

    let mut sorted = pooled.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mut ties = 0.0;
    let mut start = 0;
    while start < sorted.len() {
        let mut end = start + 1;
        while end < sorted.len() && sorted[end] == sorted[start] {
            end += 1;
        }
        let t = (end - start) as f64;
        ties += t * t * t - t;
        start = end;
    }
    let correction = 1.0 - ties / (n * n * n - n);
    if correction <= 0.0 {
        return None;
    }

    let statistic = h / correction;
    let degrees_of_freedom = (groups.len() - 1) as f64;
    let p_value = ChiSquared::new(degrees_of_freedom)
        .ok()
        .map(|chi2| 1.0 - chi2.cdf(statistic));
    Some(KruskalWallisTest {
        statistic,
        groups: groups.len(),
        p_value,
    })
}
