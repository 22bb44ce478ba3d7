//! Core data types for pairwise rank comparison.

use serde::{Deserialize, Serialize};

use super::stats::{self, Summary};

/// One flow instance as measured by the reference run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub flow_id: i64,
    /// Quality metric of the instance (e.g. rounded SSIM score)
    pub reference_score: f64,
    /// Ground-truth measurement for the same instance
    pub baseline_rate: f64,
}

impl FlowRecord {
    pub fn new(flow_id: i64, reference_score: f64, baseline_rate: f64) -> Self {
        Self {
            flow_id,
            reference_score,
            baseline_rate,
        }
    }
}

/// Values produced by one estimation method, aligned by position with the
/// reference records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl TreatmentSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// How ties inside a pair are treated by the inversion test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Only strict disagreement inverts; tied pairs go to the ratio branch
    #[default]
    Lenient,
    /// A pair also inverts when exactly one of the two series is tied
    Strict,
    /// Pairs with tied reference scores are left out entirely
    SkipReferenceTies,
}

/// What to do with a sample whose baseline is zero but whose treatment is not
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioPolicy {
    /// Skip the sample and count it in `undefined_ratio_count`
    #[default]
    Exclude,
    /// Fail the comparison with `ComparisonError::UndefinedRatio`
    Reject,
}

/// Knobs for a single comparison pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareOptions {
    #[serde(default)]
    pub tie_policy: TiePolicy,
    #[serde(default)]
    pub ratio_policy: RatioPolicy,
    /// Only consider pairs where every treatment value of both instances is > 0
    #[serde(default)]
    pub require_positive_treatments: bool,
}

/// Per-treatment accumulators of one comparison pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOutcome {
    pub name: String,
    pub inversion_count: usize,
    pub tie_count: usize,
    /// `|ref[i] - ref[j]|` for every inverted pair
    pub inversion_magnitudes: Vec<f64>,
    /// treatment / baseline, recorded for both instances of non-inverted pairs
    pub ratio_samples: Vec<f64>,
    pub undefined_ratio_count: usize,
    /// Pearson correlation against the reference scores
    pub correlation: Option<f64>,
    /// Pearson correlation against the baseline measurements
    pub baseline_correlation: Option<f64>,
}

impl TreatmentOutcome {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inversion_count: 0,
            tie_count: 0,
            inversion_magnitudes: Vec::new(),
            ratio_samples: Vec::new(),
            undefined_ratio_count: 0,
            correlation: None,
            baseline_correlation: None,
        }
    }

    pub fn inversion_rate(&self, pair_count: usize) -> f64 {
        fraction(self.inversion_count, pair_count)
    }

    pub fn tie_rate(&self, pair_count: usize) -> f64 {
        fraction(self.tie_count, pair_count)
    }

    /// Collapse the raw samples into the row a reporter prints
    pub fn summarize(&self, pair_count: usize) -> TreatmentSummary {
        TreatmentSummary {
            name: self.name.clone(),
            inversion_count: self.inversion_count,
            inversion_rate: self.inversion_rate(pair_count),
            tie_rate: self.tie_rate(pair_count),
            ratio: Summary::of(&self.ratio_samples),
            inversion_magnitude: Summary::of(&self.inversion_magnitudes),
            correlation: self.correlation,
            baseline_correlation: self.baseline_correlation,
            undefined_ratio_count: self.undefined_ratio_count,
        }
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Result of one comparison pass over all eligible ordered pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub instance_count: usize,
    /// Eligible ordered pairs; `(i, j)` and `(j, i)` both count
    pub pair_count: usize,
    /// Eligible pairs dropped under `TiePolicy::SkipReferenceTies`
    pub reference_tie_pairs: usize,
    pub treatments: Vec<TreatmentOutcome>,
}

impl ComparisonResult {
    pub fn treatment(&self, name: &str) -> Option<&TreatmentOutcome> {
        self.treatments.iter().find(|t| t.name == name)
    }

    pub fn summaries(&self) -> Vec<TreatmentSummary> {
        self.treatments
            .iter()
            .map(|t| t.summarize(self.pair_count))
            .collect()
    }
}

/// Reporter row for one treatment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentSummary {
    pub name: String,
    pub inversion_count: usize,
    pub inversion_rate: f64,
    pub tie_rate: f64,
    pub ratio: Option<Summary>,
    pub inversion_magnitude: Option<Summary>,
    pub correlation: Option<f64>,
    pub baseline_correlation: Option<f64>,
    pub undefined_ratio_count: usize,
}

/// Mean and spread of one input series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub name: String,
    pub summary: Option<Summary>,
}

impl SeriesStats {
    pub fn of(name: impl Into<String>, values: &[f64]) -> Self {
        Self {
            name: name.into(),
            summary: stats::Summary::of(values),
        }
    }
}

/// Outcome of analysing one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricStatus {
    Completed {
        instance_count: usize,
        pair_count: usize,
        reference_tie_pairs: usize,
        treatments: Vec<TreatmentSummary>,
    },
    NoData {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub metric: String,
    #[serde(flatten)]
    pub status: MetricStatus,
}

impl MetricReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, MetricStatus::Failed { .. })
    }
}

/// Metadata about the analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_timestamp: String,
    pub config_path: String,
    pub group_stride: Option<i64>,
    pub tie_policy: TiePolicy,
    pub ratio_policy: RatioPolicy,
    pub total_metrics: usize,
}

/// Complete report written by the `compare` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullAnalysisReport {
    pub metadata: AnalysisMetadata,
    pub metrics: Vec<MetricReport>,
}
