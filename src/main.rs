//! Rank comparison CLI for network simulation results.
//!
//! Compares estimator outputs against reference quality scores and
//! simulator measurements for each configured metric.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Context, Result};

use flowrank::analysis::{self, pipeline, report, AnalysisMetadata, FullAnalysisReport};
use flowrank::config::Config;
use flowrank::config_loader;

#[derive(Parser, Debug)]
#[command(name = "flowrank")]
#[command(about = "Rank-inversion analysis for network simulation results")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the analysis configuration YAML file
    #[arg(short, long, default_value = "flowrank.yaml")]
    config: PathBuf,

    /// Output directory for reports
    #[arg(short, long, default_value = "analysis_output")]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of parallel workers (0 = auto-detect)
    #[arg(short = 'j', long, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare every treatment against the reference scores
    Compare {
        /// Only run these metrics (repeatable)
        #[arg(short, long)]
        metric: Vec<String>,
    },

    /// Show mean and standard deviation of every input series
    Summary {
        /// Only summarize these metrics (repeatable)
        #[arg(short, long)]
        metric: Vec<String>,
    },

    /// Validate the configuration and count input records
    Check,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    // Set thread pool size
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = config_loader::load_config(&cli.config)?;

    match cli.command {
        Commands::Compare { metric } => run_compare(&cli.config, &cli.output, &config, &metric)?,
        Commands::Summary { metric } => {
            let summaries = pipeline::summarize_all(&config, &metric)?;
            let total = summaries.len();
            let mut failed = 0;
            for (name, series) in summaries {
                match series {
                    Ok(series) => report::print_series_summary(&name, &series),
                    // already logged by summarize_all
                    Err(_) => failed += 1,
                }
            }
            println!();
            if total > 0 && failed == total {
                bail!("Every metric failed to summarize");
            }
        }
        Commands::Check => {
            println!("\n=== FLOWRANK INPUT CHECK ===\n");
            println!("Config: {}", cli.config.display());
            println!(
                "Metrics: {}",
                config
                    .metrics
                    .iter()
                    .map(|m| m.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!();
            for info in pipeline::inventory(&config)? {
                println!("  {:<24} {:>8} records  {}", info.label, info.records, info.path.display());
            }
            println!();
        }
    }

    Ok(())
}

fn run_compare(config_path: &Path, output_dir: &Path, config: &Config, only: &[String]) -> Result<()> {
    log::info!("Running comparison...");
    let metrics = analysis::run_all(config, only)?;

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let all_failed = !metrics.is_empty() && metrics.iter().all(|m| m.is_failed());

    let report = FullAnalysisReport {
        metadata: create_metadata(config_path, config, metrics.len()),
        metrics,
    };

    analysis::generate_json_report(&report, &output_dir.join("comparison_report.json"))?;
    analysis::generate_tsv_report(&report, &output_dir.join("comparison_report.tsv"))?;
    analysis::report::print_summary(&report);

    if all_failed {
        bail!("Every metric failed; see {}", output_dir.join("comparison_report.json").display());
    }

    log::info!("Analysis complete. Reports written to {}", output_dir.display());
    Ok(())
}

fn create_metadata(config_path: &Path, config: &Config, total_metrics: usize) -> AnalysisMetadata {
    AnalysisMetadata {
        analysis_timestamp: chrono::Utc::now().to_rfc3339(),
        config_path: config_path.display().to_string(),
        group_stride: config.general.group_stride,
        tie_policy: config.general.tie_policy,
        ratio_policy: config.general.ratio_policy,
        total_metrics,
    }
}
