use crate::config::Config;
use color_eyre::eyre::{Context, Result};
use log::info;
use std::fs::File;
use std::path::Path;

/// Load, resolve and validate the analysis configuration from a YAML file.
///
/// Relative input paths are taken relative to the directory holding the
/// configuration file.
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .with_context(|| format!("Failed to open configuration {}", config_path.display()))?;

    let mut config: Config = serde_yaml::from_reader(file)
        .with_context(|| format!("Failed to parse configuration {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base_dir);

    config.validate()?;

    info!(
        "Configured {} treatments and {} metrics",
        config.sources.treatments.len(),
        config.metrics.len()
    );

    Ok(config)
}
