//! Pairwise rank comparison.
//!
//! Walks every eligible ordered pair of flow instances once and, for each
//! treatment series, checks whether the treatment orders the pair the same
//! way the reference score does. Agreeing pairs feed the ratio statistics
//! (treatment value over baseline measurement), disagreeing pairs feed the
//! inversion statistics.

use super::eligibility::PairEligibility;
use super::stats;
use super::types::*;

/// Errors raised by [`compare`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComparisonError {
    #[error("No flow records to compare")]
    EmptyInput,

    #[error("Series '{series}' has {actual} values, expected {expected}")]
    ShapeMismatch {
        series: String,
        expected: usize,
        actual: usize,
    },

    #[error("Series '{series}' has a non-finite value at index {index}")]
    NonFiniteValue { series: String, index: usize },

    #[error("No eligible pairs among {instances} flow instances")]
    NoEligiblePairs { instances: usize },

    #[error("Undefined ratio for '{treatment}' at index {index}: value {value} over baseline {baseline}")]
    UndefinedRatio {
        treatment: String,
        index: usize,
        value: f64,
        baseline: f64,
    },
}

/// Compare every treatment series against the reference scores.
///
/// `(i, j)` and `(j, i)` are separate pairs, so a symmetric eligibility rule
/// counts every unordered pair twice. Correlations are computed over all
/// instances, not just the eligible ones.
pub fn compare<E>(
    reference: &[FlowRecord],
    treatments: &[TreatmentSeries],
    eligibility: &E,
    options: &CompareOptions,
) -> Result<ComparisonResult, ComparisonError>
where
    E: PairEligibility + ?Sized,
{
    validate_inputs(reference, treatments)?;
    let n = reference.len();

    let mut outcomes: Vec<TreatmentOutcome> = treatments
        .iter()
        .map(|t| TreatmentOutcome::new(&t.name))
        .collect();
    let mut pair_count = 0usize;
    let mut reference_tie_pairs = 0usize;

    let usable: Vec<bool> = (0..n)
        .map(|idx| !options.require_positive_treatments || all_positive(treatments, idx))
        .collect();

    for i in 0..n {
        if !usable[i] {
            continue;
        }
        let ri = reference[i].reference_score;

        for j in eligibility.partners(i, n) {
            if !usable[j] {
                continue;
            }
            let rj = reference[j].reference_score;

            if options.tie_policy == TiePolicy::SkipReferenceTies && ri == rj {
                reference_tie_pairs += 1;
                continue;
            }
            pair_count += 1;

            for (series, outcome) in treatments.iter().zip(outcomes.iter_mut()) {
                let (ti, tj) = (series.values[i], series.values[j]);

                if ti == tj {
                    outcome.tie_count += 1;
                }

                if is_inversion(ri, rj, ti, tj, options.tie_policy) {
                    outcome.inversion_count += 1;
                    outcome.inversion_magnitudes.push((ri - rj).abs());
                } else {
                    for k in [i, j] {
                        record_ratio(
                            outcome,
                            k,
                            series.values[k],
                            reference[k].baseline_rate,
                            options.ratio_policy,
                        )?;
                    }
                }
            }
        }
    }

    if pair_count == 0 {
        return Err(ComparisonError::NoEligiblePairs { instances: n });
    }

    let scores: Vec<f64> = reference.iter().map(|r| r.reference_score).collect();
    let baselines: Vec<f64> = reference.iter().map(|r| r.baseline_rate).collect();
    for (series, outcome) in treatments.iter().zip(outcomes.iter_mut()) {
        outcome.correlation = stats::pearson(&series.values, &scores);
        outcome.baseline_correlation = stats::pearson(&series.values, &baselines);

        log::debug!(
            "{}: {} inversions, {} ties, {} ratio samples, {} undefined ratios over {} pairs",
            outcome.name,
            outcome.inversion_count,
            outcome.tie_count,
            outcome.ratio_samples.len(),
            outcome.undefined_ratio_count,
            pair_count
        );
    }

    Ok(ComparisonResult {
        instance_count: n,
        pair_count,
        reference_tie_pairs,
        treatments: outcomes,
    })
}

fn validate_inputs(
    reference: &[FlowRecord],
    treatments: &[TreatmentSeries],
) -> Result<(), ComparisonError> {
    if reference.is_empty() {
        return Err(ComparisonError::EmptyInput);
    }

    for (index, record) in reference.iter().enumerate() {
        if !record.reference_score.is_finite() {
            return Err(ComparisonError::NonFiniteValue {
                series: "reference".to_string(),
                index,
            });
        }
        if !record.baseline_rate.is_finite() {
            return Err(ComparisonError::NonFiniteValue {
                series: "baseline".to_string(),
                index,
            });
        }
    }

    for series in treatments {
        if series.len() != reference.len() {
            return Err(ComparisonError::ShapeMismatch {
                series: series.name.clone(),
                expected: reference.len(),
                actual: series.len(),
            });
        }
        if let Some(index) = series.values.iter().position(|v| !v.is_finite()) {
            return Err(ComparisonError::NonFiniteValue {
                series: series.name.clone(),
                index,
            });
        }
    }

    Ok(())
}

fn all_positive(treatments: &[TreatmentSeries], idx: usize) -> bool {
    treatments.iter().all(|t| t.values[idx] > 0.0)
}

/// Whether the treatment orders the pair differently from the reference
fn is_inversion(ri: f64, rj: f64, ti: f64, tj: f64, policy: TiePolicy) -> bool {
    let disagree = (ri > rj && ti < tj) || (ri < rj && ti > tj);
    match policy {
        TiePolicy::Strict => disagree || (ri == rj) != (ti == tj),
        TiePolicy::Lenient | TiePolicy::SkipReferenceTies => disagree,
    }
}

fn record_ratio(
    outcome: &mut TreatmentOutcome,
    index: usize,
    value: f64,
    baseline: f64,
    policy: RatioPolicy,
) -> Result<(), ComparisonError> {
    if value == 0.0 && baseline == 0.0 {
        outcome.ratio_samples.push(1.0);
    } else if baseline > 0.0 {
        outcome.ratio_samples.push(value / baseline);
    } else {
        match policy {
            RatioPolicy::Exclude => {
                log::trace!(
                    "{}: skipping undefined ratio at index {} ({} / {})",
                    outcome.name,
                    index,
                    value,
                    baseline
                );
                outcome.undefined_ratio_count += 1;
            }
            RatioPolicy::Reject => {
                return Err(ComparisonError::UndefinedRatio {
                    treatment: outcome.name.clone(),
                    index,
                    value,
                    baseline,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::eligibility::FlowGroups;

    fn same_flow(records: &[FlowRecord]) -> impl Fn(usize, usize) -> bool + '_ {
        move |i, j| i != j && records[i].flow_id == records[j].flow_id
    }

    fn two_records() -> Vec<FlowRecord> {
        vec![FlowRecord::new(1, 100.0, 50.0), FlowRecord::new(1, 80.0, 40.0)]
    }

    #[test]
    fn test_full_disagreement() {
        let reference = two_records();
        let treatments = vec![TreatmentSeries::new("T", vec![60.0, 70.0])];
        let result = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap();

        assert_eq!(result.pair_count, 2);
        let t = &result.treatments[0];
        assert_eq!(t.inversion_count, 2);
        assert_eq!(t.inversion_rate(result.pair_count), 1.0);
        assert!(t.ratio_samples.is_empty());
        assert_eq!(t.inversion_magnitudes, vec![20.0, 20.0]);
    }

    #[test]
    fn test_full_agreement_ratios() {
        let reference = two_records();
        let treatments = vec![TreatmentSeries::new("T", vec![80.0, 60.0])];
        let result = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap();

        let t = &result.treatments[0];
        assert_eq!(t.inversion_count, 0);
        assert_eq!(t.ratio_samples, vec![1.6, 1.5, 1.5, 1.6]);
        let summary = t.summarize(result.pair_count);
        assert!((summary.ratio.unwrap().mean - 1.55).abs() < 1e-12);
        assert!(summary.inversion_magnitude.is_none());
    }

    #[test]
    fn test_both_zero_ratio_is_one() {
        let reference = vec![FlowRecord::new(1, 10.0, 0.0), FlowRecord::new(1, 5.0, 20.0)];
        let treatments = vec![TreatmentSeries::new("T", vec![0.0, 10.0])];
        let result = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        );
        // 10 > 5 but 0 < 10: both orderings invert, nothing reaches the ratio branch
        assert_eq!(result.unwrap().treatments[0].ratio_samples.len(), 0);

        let treatments = vec![TreatmentSeries::new("T", vec![0.0, 0.0])];
        let result = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap();
        let t = &result.treatments[0];
        assert_eq!(t.tie_count, 2);
        assert_eq!(t.ratio_samples, vec![1.0, 0.0, 0.0, 1.0]);
        assert_eq!(t.undefined_ratio_count, 0);
    }

    #[test]
    fn test_undefined_ratio_excluded() {
        let reference = vec![FlowRecord::new(1, 10.0, 0.0), FlowRecord::new(1, 5.0, 20.0)];
        let treatments = vec![TreatmentSeries::new("T", vec![30.0, 10.0])];
        let result = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap();

        let t = &result.treatments[0];
        assert_eq!(t.undefined_ratio_count, 2);
        assert_eq!(t.ratio_samples, vec![0.5, 0.5]);
        assert!(t.ratio_samples.iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_undefined_ratio_rejected() {
        let reference = vec![FlowRecord::new(1, 10.0, 0.0), FlowRecord::new(1, 5.0, 20.0)];
        let treatments = vec![TreatmentSeries::new("T", vec![30.0, 10.0])];
        let options = CompareOptions {
            ratio_policy: RatioPolicy::Reject,
            ..CompareOptions::default()
        };
        let err = compare(&reference, &treatments, &same_flow(&reference), &options).unwrap_err();
        assert_eq!(
            err,
            ComparisonError::UndefinedRatio {
                treatment: "T".to_string(),
                index: 0,
                value: 30.0,
                baseline: 0.0,
            }
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let reference = two_records();
        let treatments = vec![
            TreatmentSeries::new("A", vec![1.0, 2.0]),
            TreatmentSeries::new("B", vec![1.0]),
        ];
        let err = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ComparisonError::ShapeMismatch {
                series: "B".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_empty_and_no_pairs() {
        let none = |_: usize, _: usize| false;
        let err = compare(&[], &[], &none, &CompareOptions::default()).unwrap_err();
        assert_eq!(err, ComparisonError::EmptyInput);

        let reference = two_records();
        let err = compare(&reference, &[], &none, &CompareOptions::default()).unwrap_err();
        assert_eq!(err, ComparisonError::NoEligiblePairs { instances: 2 });
    }

    #[test]
    fn test_non_finite_rejected() {
        let reference = two_records();
        let treatments = vec![TreatmentSeries::new("T", vec![1.0, f64::NAN])];
        let err = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ComparisonError::NonFiniteValue {
                series: "T".to_string(),
                index: 1,
            }
        );
    }

    #[test]
    fn test_tie_policies() {
        // reference tie, treatment differs
        let reference = vec![FlowRecord::new(1, 90.0, 10.0), FlowRecord::new(1, 90.0, 10.0)];
        let treatments = vec![TreatmentSeries::new("T", vec![5.0, 7.0])];
        let rule = same_flow(&reference);

        let lenient = compare(&reference, &treatments, &rule, &CompareOptions::default()).unwrap();
        assert_eq!(lenient.treatments[0].inversion_count, 0);
        assert_eq!(lenient.treatments[0].ratio_samples.len(), 4);

        let strict = CompareOptions {
            tie_policy: TiePolicy::Strict,
            ..CompareOptions::default()
        };
        let strict = compare(&reference, &treatments, &rule, &strict).unwrap();
        assert_eq!(strict.treatments[0].inversion_count, 2);
        assert_eq!(strict.treatments[0].inversion_magnitudes, vec![0.0, 0.0]);

        let skip = CompareOptions {
            tie_policy: TiePolicy::SkipReferenceTies,
            ..CompareOptions::default()
        };
        let err = compare(&reference, &treatments, &rule, &skip).unwrap_err();
        assert_eq!(err, ComparisonError::NoEligiblePairs { instances: 2 });
    }

    #[test]
    fn test_skip_reference_ties_counts_skipped_pairs() {
        let reference = vec![
            FlowRecord::new(1, 90.0, 10.0),
            FlowRecord::new(1, 90.0, 10.0),
            FlowRecord::new(1, 70.0, 10.0),
        ];
        let treatments = vec![TreatmentSeries::new("T", vec![5.0, 7.0, 1.0])];
        let options = CompareOptions {
            tie_policy: TiePolicy::SkipReferenceTies,
            ..CompareOptions::default()
        };
        let result = compare(&reference, &treatments, &same_flow(&reference), &options).unwrap();
        assert_eq!(result.reference_tie_pairs, 2);
        assert_eq!(result.pair_count, 4);
        assert_eq!(result.treatments[0].inversion_count, 0);
    }

    #[test]
    fn test_require_positive_treatments() {
        let reference = vec![
            FlowRecord::new(1, 90.0, 10.0),
            FlowRecord::new(1, 80.0, 10.0),
            FlowRecord::new(1, 70.0, 10.0),
        ];
        let treatments = vec![
            TreatmentSeries::new("A", vec![9.0, 8.0, 7.0]),
            TreatmentSeries::new("B", vec![9.0, 0.0, 7.0]),
        ];
        let options = CompareOptions {
            require_positive_treatments: true,
            ..CompareOptions::default()
        };
        let result = compare(&reference, &treatments, &same_flow(&reference), &options).unwrap();
        // index 1 is dropped, leaving (0, 2) and (2, 0)
        assert_eq!(result.pair_count, 2);
    }

    #[test]
    fn test_flow_groups_with_stride() {
        let reference = vec![
            FlowRecord::new(0, 100.0, 10.0),
            FlowRecord::new(3, 80.0, 10.0),
            FlowRecord::new(1, 60.0, 10.0),
        ];
        let treatments = vec![TreatmentSeries::new("T", vec![1.0, 2.0, 3.0])];
        let groups = FlowGroups::from_records(&reference, Some(3));
        let result = compare(&reference, &treatments, &groups, &CompareOptions::default()).unwrap();

        // only 0 -> 3 is grouped
        assert_eq!(result.pair_count, 1);
        assert_eq!(result.treatments[0].inversion_count, 1);
        assert_eq!(result.treatments[0].inversion_magnitudes, vec![20.0]);
    }

    #[test]
    fn test_correlations() {
        let reference = vec![
            FlowRecord::new(1, 10.0, 1.0),
            FlowRecord::new(1, 20.0, 2.0),
            FlowRecord::new(1, 30.0, 3.0),
        ];
        let treatments = vec![
            TreatmentSeries::new("up", vec![1.0, 2.0, 3.0]),
            TreatmentSeries::new("flat", vec![5.0, 5.0, 5.0]),
        ];
        let result = compare(
            &reference,
            &treatments,
            &same_flow(&reference),
            &CompareOptions::default(),
        )
        .unwrap();

        let up = result.treatment("up").unwrap();
        assert!((up.correlation.unwrap() - 1.0).abs() < 1e-12);
        assert!((up.baseline_correlation.unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(result.treatment("flat").unwrap().correlation, None);
    }
}
