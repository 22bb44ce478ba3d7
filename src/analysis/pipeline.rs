//! Per-metric driver: load the configured columns, run the comparison and
//! turn the outcome into a report entry.
//!
//! Metrics are independent of each other. A failure while loading or
//! comparing one metric is recorded in that metric's report and does not
//! stop the others.

use std::path::PathBuf;

use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use super::comparator::{compare, ComparisonError};
use super::eligibility::FlowGroups;
use super::types::*;
use crate::config::{Config, MetricConfig, TOPOLOGY_DESTINATION_COLUMN, TOPOLOGY_SOURCE_COLUMN};
use crate::loader::{self, Rounding};

/// Aligned inputs of one metric
#[derive(Debug, Clone)]
pub struct MetricInputs {
    pub reference: Vec<FlowRecord>,
    pub treatments: Vec<TreatmentSeries>,
    pub endpoints: Option<Vec<(i64, i64)>>,
}

/// Zip the three per-instance columns into flow records
pub fn build_records(
    flow_ids: &[i64],
    scores: &[f64],
    baselines: &[f64],
) -> Result<Vec<FlowRecord>, ComparisonError> {
    for (series, len) in [("reference", scores.len()), ("baseline", baselines.len())] {
        if len != flow_ids.len() {
            return Err(ComparisonError::ShapeMismatch {
                series: series.to_string(),
                expected: flow_ids.len(),
                actual: len,
            });
        }
    }

    Ok(flow_ids
        .iter()
        .zip(scores)
        .zip(baselines)
        .map(|((&id, &score), &baseline)| FlowRecord::new(id, score, baseline))
        .collect())
}

/// Read every file a metric needs, in parallel
pub fn load_metric_inputs(
    config: &Config,
    metric: &MetricConfig,
    rounding: Rounding,
) -> Result<MetricInputs> {
    let sources = &config.sources;
    let flow_source = sources.flow_id_source();

    let (scores, (baselines, flow_ids)) = rayon::join(
        || loader::read_column(&sources.reference, metric.reference_column, rounding),
        || {
            rayon::join(
                || loader::read_column(&sources.baseline, metric.baseline_column, rounding),
                || loader::read_id_column(&flow_source.path, flow_source.column),
            )
        },
    );
    let scores = scores.context("Failed to load reference scores")?;
    let baselines = baselines.context("Failed to load baseline measurements")?;
    let flow_ids = flow_ids.context("Failed to load flow ids")?;

    let treatments: Vec<TreatmentSeries> = sources
        .treatments
        .par_iter()
        .map(|source| {
            loader::read_column(&source.path, metric.treatment_column, rounding)
                .map(|values| TreatmentSeries::new(source.name.as_str(), values))
                .with_context(|| format!("Failed to load treatment '{}'", source.name))
        })
        .collect::<Result<_>>()?;

    let endpoints = match (&sources.topology, sources.match_endpoints) {
        (Some(path), true) => Some(
            loader::read_endpoints(path, TOPOLOGY_SOURCE_COLUMN, TOPOLOGY_DESTINATION_COLUMN)
                .context("Failed to load topology")?,
        ),
        _ => None,
    };

    let reference = build_records(&flow_ids, &scores, &baselines)?;

    log::debug!(
        "{}: loaded {} instances and {} treatments",
        metric.name,
        reference.len(),
        treatments.len()
    );

    Ok(MetricInputs {
        reference,
        treatments,
        endpoints,
    })
}

/// Run the comparison for a single metric.
///
/// A comparison without eligible pairs is reported as `NoData`; every other
/// problem is returned as an error.
pub fn run_metric(config: &Config, metric: &MetricConfig) -> Result<MetricReport> {
    let inputs = load_metric_inputs(config, metric, config.rounding())?;

    let mut groups = FlowGroups::from_records(&inputs.reference, config.general.group_stride);
    if let Some(endpoints) = inputs.endpoints {
        groups = groups.with_endpoints(endpoints)?;
    }
    log::debug!(
        "{}: {} flow groups, stride {:?}",
        metric.name,
        groups.group_count(),
        groups.stride()
    );

    let options = config.compare_options(metric);
    let status = match compare(&inputs.reference, &inputs.treatments, &groups, &options) {
        Ok(result) => {
            log::info!(
                "{}: compared {} pairs over {} instances",
                metric.name,
                result.pair_count,
                result.instance_count
            );
            MetricStatus::Completed {
                instance_count: result.instance_count,
                pair_count: result.pair_count,
                reference_tie_pairs: result.reference_tie_pairs,
                treatments: result.summaries(),
            }
        }
        Err(err @ ComparisonError::NoEligiblePairs { .. }) => {
            log::warn!("{}: {}", metric.name, err);
            MetricStatus::NoData {
                reason: err.to_string(),
            }
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Comparison failed for metric '{}'", metric.name));
        }
    };

    Ok(MetricReport {
        metric: metric.name.clone(),
        status,
    })
}

/// Run every selected metric; per-metric failures end up in the reports.
///
/// Only an unknown metric name in `only` is an error.
pub fn run_all(config: &Config, only: &[String]) -> Result<Vec<MetricReport>> {
    let metrics = config.selected_metrics(only)?;
    log::info!("Running {} metrics...", metrics.len());

    let reports = metrics
        .par_iter()
        .map(|metric| match run_metric(config, metric) {
            Ok(report) => report,
            Err(e) => {
                log::error!("{}: {:#}", metric.name, e);
                MetricReport {
                    metric: metric.name.clone(),
                    status: MetricStatus::Failed {
                        error: format!("{:#}", e),
                    },
                }
            }
        })
        .collect();

    Ok(reports)
}

/// Mean and spread of the reference, baseline and every treatment series of a metric.
///
/// Values are summarized as written; `round_values` only applies to comparisons.
pub fn summarize_series(config: &Config, metric: &MetricConfig) -> Result<Vec<SeriesStats>> {
    let inputs = load_metric_inputs(config, metric, Rounding::None)?;

    let scores: Vec<f64> = inputs.reference.iter().map(|r| r.reference_score).collect();
    let baselines: Vec<f64> = inputs.reference.iter().map(|r| r.baseline_rate).collect();

    let mut series = vec![
        SeriesStats::of("reference", &scores),
        SeriesStats::of("baseline", &baselines),
    ];
    series.extend(
        inputs
            .treatments
            .iter()
            .map(|t| SeriesStats::of(t.name.as_str(), &t.values)),
    );
    Ok(series)
}

/// Summarize every selected metric; a metric that fails to load is logged
/// and returned as an error next to the others.
///
/// Only an unknown metric name in `only` is an error.
pub fn summarize_all(
    config: &Config,
    only: &[String],
) -> Result<Vec<(String, Result<Vec<SeriesStats>>)>> {
    let metrics = config.selected_metrics(only)?;

    let summaries = metrics
        .par_iter()
        .map(|metric| {
            let series = summarize_series(config, metric)
                .with_context(|| format!("Failed to summarize metric '{}'", metric.name));
            if let Err(e) = &series {
                log::error!("{}: {:#}", metric.name, e);
            }
            (metric.name.clone(), series)
        })
        .collect();

    Ok(summaries)
}

/// Record count of one configured input file
#[derive(Debug, Clone, Serialize)]
pub struct InputFileInfo {
    pub label: String,
    pub path: PathBuf,
    pub records: usize,
}

/// Count the records of every configured input file
pub fn inventory(config: &Config) -> Result<Vec<InputFileInfo>> {
    let sources = &config.sources;
    let mut files: Vec<(String, PathBuf)> = vec![
        ("reference".to_string(), sources.reference.clone()),
        ("baseline".to_string(), sources.baseline.clone()),
    ];
    if let Some(flow_ids) = &sources.flow_ids {
        files.push(("flow_ids".to_string(), flow_ids.path.clone()));
    }
    if let Some(topology) = &sources.topology {
        files.push(("topology".to_string(), topology.clone()));
    }
    files.extend(
        sources
            .treatments
            .iter()
            .map(|t| (format!("treatment {}", t.name), t.path.clone())),
    );

    let infos: Vec<InputFileInfo> = files
        .into_par_iter()
        .map(|(label, path)| -> Result<InputFileInfo> {
            let records = loader::count_records(&path)
                .with_context(|| format!("Failed to read {} input", label))?;
            Ok(InputFileInfo {
                label,
                path,
                records,
            })
        })
        .collect::<Result<_>>()?;

    if let Some(first) = infos.first() {
        for info in &infos[1..] {
            if info.records != first.records {
                log::warn!(
                    "{} has {} records but {} has {}",
                    info.label,
                    info.records,
                    first.label,
                    first.records
                );
            }
        }
    }

    Ok(infos)
}
