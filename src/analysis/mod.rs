//! Rank comparison of estimator outputs against reference quality scores.
//!
//! This module provides the pairwise comparator, the eligibility rules that
//! decide which flow instances are compared, and the reporting around it.

pub mod types;
pub mod stats;
pub mod eligibility;
pub mod comparator;
pub mod pipeline;
pub mod report;

pub use types::*;
pub use comparator::{compare, ComparisonError};
pub use eligibility::{FlowGroups, PairEligibility};
pub use pipeline::{run_all, run_metric, summarize_all, summarize_series};
pub use report::{generate_json_report, generate_tsv_report};
