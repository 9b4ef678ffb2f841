//! # Workflows Module
//!
//! Composite makers that chain stage makers into multi-job flows.
//!
//! ## Architecture
//!
//! - **Double Optimization** ([`double_opt`]) - An optional pre-optimization followed
//!   by a final optimization on its result
//! - **Optimization + Frequencies** ([`frequency_opt`]) - One optimization and one
//!   frequency calculation, with references to the vibrational analysis
//! - **Frequency Flattening** ([`flattening`]) - Repeated optimization/frequency pairs,
//!   perturbing along the lowest imaginary mode until it disappears
//! - **Configuration** ([`config`]) - Validation errors, the flattening builder and the
//!   TOML-loadable [`WorkflowConfig`](config::WorkflowConfig)
//!
//! Every composite only builds the graph. Wiring between stages goes through
//! deferred output references, so nothing here needs a stage to have run.

pub mod config;
pub mod double_opt;
pub mod flattening;
pub mod frequency_opt;
