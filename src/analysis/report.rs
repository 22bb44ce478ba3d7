//! Report generation for comparison results.
//!
//! Generates a JSON report, a tab-separated table and a stdout summary.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

use super::stats::{round_to, Summary};
use super::types::*;

/// Header of the tab-separated report
pub const TSV_HEADER: [&str; 8] = [
    "metric",
    "treatment",
    "inversion_rate",
    "mean_ratio",
    "std_ratio",
    "mean_inversion_magnitude",
    "std_inversion_magnitude",
    "correlation",
];

/// Generate JSON report
pub fn generate_json_report(report: &FullAnalysisReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .context("Failed to serialize report to JSON")?;

    fs::write(output_path, json)
        .with_context(|| format!("Failed to write JSON report to {}", output_path.display()))?;

    log::info!("JSON report written to {}", output_path.display());
    Ok(())
}

/// One line per treatment of every completed metric
pub fn render_tsv(report: &FullAnalysisReport) -> String {
    let mut lines: Vec<String> = vec![TSV_HEADER.join("\t")];

    for metric in &report.metrics {
        let MetricStatus::Completed { treatments, .. } = &metric.status else {
            continue;
        };
        for t in treatments {
            let (mean_ratio, std_ratio) = summary_cells(t.ratio.as_ref());
            let (mean_mag, std_mag) = summary_cells(t.inversion_magnitude.as_ref());
            lines.push(
                [
                    metric.metric.clone(),
                    t.name.clone(),
                    format!("{}", round_to(t.inversion_rate, 3)),
                    mean_ratio,
                    std_ratio,
                    mean_mag,
                    std_mag,
                    optional_cell(t.correlation),
                ]
                .join("\t"),
            );
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');
    content
}

fn summary_cells(summary: Option<&Summary>) -> (String, String) {
    match summary {
        Some(s) => (
            format!("{}", round_to(s.mean, 2)),
            format!("{}", round_to(s.std_dev, 2)),
        ),
        None => ("NA".to_string(), "NA".to_string()),
    }
}

fn optional_cell(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", round_to(v, 2)),
        None => "NA".to_string(),
    }
}

/// Generate the tab-separated table
pub fn generate_tsv_report(report: &FullAnalysisReport, output_path: &Path) -> Result<()> {
    fs::write(output_path, render_tsv(report))
        .with_context(|| format!("Failed to write TSV report to {}", output_path.display()))?;

    log::info!("TSV report written to {}", output_path.display());
    Ok(())
}

/// Print a summary to stdout
pub fn print_summary(report: &FullAnalysisReport) {
    println!("\n=== RANK COMPARISON SUMMARY ===\n");
    println!("Analysis Date: {}", report.metadata.analysis_timestamp);
    println!("Config: {}", report.metadata.config_path);
    match report.metadata.group_stride {
        Some(stride) => println!("Group stride: {}", stride),
        None => println!("Group stride: none"),
    }
    println!(
        "Tie policy: {:?}, ratio policy: {:?}",
        report.metadata.tie_policy, report.metadata.ratio_policy
    );

    for metric in &report.metrics {
        println!("\n{}:", metric.metric.to_uppercase());
        match &metric.status {
            MetricStatus::Completed {
                instance_count,
                pair_count,
                reference_tie_pairs,
                treatments,
            } => {
                println!("  Instances: {}", instance_count);
                println!("  Eligible pairs: {}", pair_count);
                if *reference_tie_pairs > 0 {
                    println!("  Skipped reference ties: {}", reference_tie_pairs);
                }
                for t in treatments {
                    println!("  {}:", t.name);
                    println!(
                        "    Inversion rate: {:.3} ({} pairs)",
                        t.inversion_rate, t.inversion_count
                    );
                    println!("    Tie rate: {:.2}", t.tie_rate);
                    if let Some(ratio) = &t.ratio {
                        println!("    Ratio: {:.2} +/- {:.2}", ratio.mean, ratio.std_dev);
                    }
                    if let Some(mag) = &t.inversion_magnitude {
                        println!(
                            "    Inversion magnitude: {:.2} +/- {:.2}",
                            mag.mean, mag.std_dev
                        );
                    }
                    println!("    Correlation: {}", optional_cell(t.correlation));
                    if t.undefined_ratio_count > 0 {
                        println!("    Undefined ratios skipped: {}", t.undefined_ratio_count);
                    }
                }
            }
            MetricStatus::NoData { reason } => println!("  No data: {}", reason),
            MetricStatus::Failed { error } => println!("  FAILED: {}", error),
        }
    }

    println!();
}

/// Print per-series mean and standard deviation of one metric
pub fn print_series_summary(metric: &str, series: &[SeriesStats]) {
    println!("\n{}:", metric.to_uppercase());
    for s in series {
        match &s.summary {
            Some(summary) => println!(
                "  {:<16} mean {:>10.2}  std {:>10.2}  (n={})",
                s.name, summary.mean, summary.std_dev, summary.count
            ),
            None => println!("  {:<16} no values", s.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> FullAnalysisReport {
        let summary = |mean, std_dev| Summary {
            count: 4,
            mean,
            std_dev,
            min: 0.0,
            max: 2.0,
        };
        FullAnalysisReport {
            metadata: AnalysisMetadata {
                analysis_timestamp: "2026-01-01T00:00:00+00:00".to_string(),
                config_path: "flowrank.yaml".to_string(),
                group_stride: Some(3),
                tie_policy: TiePolicy::Lenient,
                ratio_policy: RatioPolicy::Exclude,
                total_metrics: 3,
            },
            metrics: vec![
                MetricReport {
                    metric: "throughput".to_string(),
                    status: MetricStatus::Completed {
                        instance_count: 2,
                        pair_count: 2,
                        reference_tie_pairs: 0,
                        treatments: vec![TreatmentSummary {
                            name: "AFTER".to_string(),
                            inversion_count: 0,
                            inversion_rate: 0.0,
                            tie_rate: 0.0,
                            ratio: Some(summary(1.55, 0.05)),
                            inversion_magnitude: None,
                            correlation: Some(0.98765),
                            baseline_correlation: None,
                            undefined_ratio_count: 0,
                        }],
                    },
                },
                MetricReport {
                    metric: "delay".to_string(),
                    status: MetricStatus::Failed {
                        error: "missing column".to_string(),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_render_tsv() {
        let tsv = render_tsv(&sample_report());
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], TSV_HEADER.join("\t"));
        assert_eq!(lines[1], "throughput\tAFTER\t0\t1.55\t0.05\tNA\tNA\t0.99");
    }

    #[test]
    fn test_json_report_roundtrip_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        generate_json_report(&sample_report(), &path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["metrics"][0]["status"], "completed");
        assert_eq!(json["metrics"][1]["status"], "failed");
        assert_eq!(json["metadata"]["tie_policy"], "lenient");
    }
}
