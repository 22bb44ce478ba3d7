use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::analysis::types::{CompareOptions, RatioPolicy, TiePolicy};
use crate::loader::Rounding;

/// Column of the baseline file holding the flow id when `flow_ids` is not set
pub const DEFAULT_FLOW_ID_COLUMN: usize = 1;
/// Columns of the topology file
pub const TOPOLOGY_SOURCE_COLUMN: usize = 0;
pub const TOPOLOGY_DESTINATION_COLUMN: usize = 1;

/// Analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    pub sources: SourceFiles,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<MetricConfig>,
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.general.group_stride.is_some_and(|s| s < 0) {
            return Err(ValidationError::InvalidGeneral(
                "group_stride cannot be negative".to_string(),
            ));
        }

        self.sources.validate()?;

        if self.metrics.is_empty() {
            return Err(ValidationError::InvalidMetric(
                "at least one metric must be configured".to_string(),
            ));
        }
        let mut names = HashSet::new();
        for metric in &self.metrics {
            if metric.name.trim().is_empty() {
                return Err(ValidationError::InvalidMetric(
                    "metric name cannot be empty".to_string(),
                ));
            }
            if !names.insert(metric.name.as_str()) {
                return Err(ValidationError::InvalidMetric(format!(
                    "duplicate metric '{}'",
                    metric.name
                )));
            }
        }

        Ok(())
    }

    /// Make every relative source path relative to `base_dir`
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };

        resolve(&mut self.sources.reference);
        resolve(&mut self.sources.baseline);
        if let Some(flow_ids) = self.sources.flow_ids.as_mut() {
            resolve(&mut flow_ids.path);
        }
        if let Some(topology) = self.sources.topology.as_mut() {
            resolve(topology);
        }
        for treatment in &mut self.sources.treatments {
            resolve(&mut treatment.path);
        }
    }

    pub fn metric(&self, name: &str) -> Option<&MetricConfig> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Metrics named in `only`, or all of them when `only` is empty
    pub fn selected_metrics(&self, only: &[String]) -> Result<Vec<&MetricConfig>, ValidationError> {
        if only.is_empty() {
            return Ok(self.metrics.iter().collect());
        }
        only.iter()
            .map(|name| {
                self.metric(name)
                    .ok_or_else(|| ValidationError::UnknownMetric(name.clone()))
            })
            .collect()
    }

    pub fn rounding(&self) -> Rounding {
        if self.general.round_values {
            Rounding::Nearest
        } else {
            Rounding::None
        }
    }

    pub fn compare_options(&self, metric: &MetricConfig) -> CompareOptions {
        CompareOptions {
            tie_policy: self.general.tie_policy,
            ratio_policy: self.general.ratio_policy,
            require_positive_treatments: metric.require_positive_treatments,
        }
    }
}

/// Settings shared by every metric
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Flow id offset that also groups two instances; usually the source count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_stride: Option<i64>,
    #[serde(default = "default_round_values")]
    pub round_values: bool,
    #[serde(default)]
    pub tie_policy: TiePolicy,
    #[serde(default)]
    pub ratio_policy: RatioPolicy,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            group_stride: None,
            round_values: default_round_values(),
            tie_policy: TiePolicy::default(),
            ratio_policy: RatioPolicy::default(),
        }
    }
}

fn default_round_values() -> bool {
    true
}

/// Input files of one analysis run
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceFiles {
    /// Quality scores (e.g. video evaluation output)
    pub reference: PathBuf,
    /// Ground-truth measurements of the unmodified run
    pub baseline: PathBuf,
    /// Where flow ids are read from; defaults to the baseline file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_ids: Option<ColumnSource>,
    /// Per-instance source/destination file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topology: Option<PathBuf>,
    /// Only compare instances with identical source and destination
    #[serde(default)]
    pub match_endpoints: bool,
    pub treatments: Vec<TreatmentSource>,
}

impl SourceFiles {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.reference.as_os_str().is_empty() {
            return Err(ValidationError::InvalidSources(
                "reference path cannot be empty".to_string(),
            ));
        }
        if self.baseline.as_os_str().is_empty() {
            return Err(ValidationError::InvalidSources(
                "baseline path cannot be empty".to_string(),
            ));
        }
        if self.treatments.is_empty() {
            return Err(ValidationError::InvalidSources(
                "at least one treatment must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for treatment in &self.treatments {
            if treatment.name.trim().is_empty() {
                return Err(ValidationError::InvalidSources(
                    "treatment name cannot be empty".to_string(),
                ));
            }
            if treatment.path.as_os_str().is_empty() {
                return Err(ValidationError::InvalidSources(format!(
                    "treatment '{}' has an empty path",
                    treatment.name
                )));
            }
            if !names.insert(treatment.name.as_str()) {
                return Err(ValidationError::InvalidSources(format!(
                    "duplicate treatment '{}'",
                    treatment.name
                )));
            }
        }

        if self.match_endpoints && self.topology.is_none() {
            return Err(ValidationError::InvalidSources(
                "match_endpoints requires a topology file".to_string(),
            ));
        }

        Ok(())
    }

    /// File and column holding the flow ids
    pub fn flow_id_source(&self) -> ColumnSource {
        self.flow_ids.clone().unwrap_or_else(|| ColumnSource {
            path: self.baseline.clone(),
            column: DEFAULT_FLOW_ID_COLUMN,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnSource {
    pub path: PathBuf,
    pub column: usize,
}

/// Output file of one estimation method
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TreatmentSource {
    pub name: String,
    pub path: PathBuf,
}

/// Column selection for one metric
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MetricConfig {
    pub name: String,
    pub reference_column: usize,
    pub baseline_column: usize,
    pub treatment_column: usize,
    #[serde(default)]
    pub require_positive_treatments: bool,
}

impl MetricConfig {
    pub fn new(
        name: &str,
        reference_column: usize,
        baseline_column: usize,
        treatment_column: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            reference_column,
            baseline_column,
            treatment_column,
            require_positive_treatments: false,
        }
    }
}

/// Throughput, packet loss and delay as laid out by the simulator and estimators
pub fn default_metrics() -> Vec<MetricConfig> {
    vec![
        MetricConfig::new("throughput", 0, 2, 0),
        MetricConfig::new("packet_loss", 3, 3, 1),
        MetricConfig {
            require_positive_treatments: true,
            ..MetricConfig::new("delay", 3, 4, 2)
        },
    ]
}

/// Validation errors for configuration
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid general configuration: {0}")]
    InvalidGeneral(String),
    #[error("Invalid sources configuration: {0}")]
    InvalidSources(String),
    #[error("Invalid metric configuration: {0}")]
    InvalidMetric(String),
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}
