//! # FlowRank - Rank-inversion analysis for network simulation results
//!
//! This library compares the per-flow outputs of network estimators against
//! a reference quality score (for example the SSIM of a video streamed over
//! the flow) and against the ground-truth measurements of the simulator.
//!
//! ## Overview
//!
//! For every pair of related flow instances the comparator asks whether an
//! estimator orders the two instances the same way the reference score
//! does. From one pass over all pairs it derives:
//!
//! - **Inversion rate**: share of pairs the estimator orders the wrong way
//! - **Inversion magnitude**: reference score gap of the inverted pairs
//! - **Ratio**: estimator value over measured value for agreeing pairs
//! - **Correlation**: Pearson correlation with the reference scores
//!
//! ## Architecture
//!
//! - `config`: typed YAML configuration and validation
//! - `config_loader`: configuration file loading
//! - `loader`: whitespace-delimited measurement files
//! - `analysis`: comparator, eligibility rules, per-metric driver and reports
//!
//! ## Example Usage
//!
//! ```rust
//! use flowrank::analysis::{compare, CompareOptions, FlowGroups, FlowRecord, TreatmentSeries};
//!
//! let reference = vec![
//!     FlowRecord::new(1, 100.0, 50.0),
//!     FlowRecord::new(1, 80.0, 40.0),
//! ];
//! let treatments = vec![TreatmentSeries::new("AFTER", vec![80.0, 60.0])];
//! let groups = FlowGroups::from_records(&reference, None);
//!
//! let result = compare(&reference, &treatments, &groups, &CompareOptions::default())?;
//! assert_eq!(result.pair_count, 2);
//! assert_eq!(result.treatments[0].inversion_count, 0);
//! # Ok::<(), flowrank::analysis::ComparisonError>(())
//! ```
//!
//! ## Error Handling
//!
//! The comparator and the loader return typed errors (`thiserror`); the
//! configuration and driver layers use `color_eyre` for error reporting
//! with context.

pub mod config;
pub mod config_loader;
pub mod loader;
pub mod analysis;
