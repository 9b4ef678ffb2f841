//! # qcflow
//!
//! Composable quantum-chemistry workflows: makers that assemble optimization and
//! frequency jobs into graphs whose later jobs consume the not-yet-computed
//! outputs of earlier ones.
//!
//! ## Architectural Philosophy
//!
//! The library is split into layers with a strict dependency direction.
//!
//! - **[`core`]: The Foundation.** Structures, values, stage kinds and the job graph
//!   itself (`Job`, `Flow`, deferred `OutputReference`s and `Input`s), plus XYZ file I/O.
//!
//! - **[`makers`]: The Building Blocks.** Configurable factories that build one job
//!   per call (`StageMaker`) behind the common [`Maker`](makers::Maker) trait.
//!
//! - **[`workflows`]: The Public API.** Composite makers such as double optimization
//!   and frequency flattening, and the TOML-loadable `WorkflowConfig`.
//!
//! - **[`engine`]: The Runtime.** A reference executor that orders jobs, evaluates
//!   convergence guards and hands each job to a pluggable `StageExecutor`.

pub mod core;
pub mod engine;
pub mod makers;
pub mod workflows;
