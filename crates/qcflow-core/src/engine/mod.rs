//! # Engine Module
//!
//! A reference execution engine for job graphs.
//!
//! ## Overview
//!
//! The graph layer never runs anything. This module takes a finished root
//! [`Flow`](crate::core::graph::flow::Flow), orders its jobs by their references,
//! evaluates run-time guards, materializes deferred inputs and hands each job to a
//! [`StageExecutor`](executor::StageExecutor), the seam where a real chemistry
//! engine plugs in.
//!
//! ## Architecture
//!
//! - **Execution** ([`runner`]) - The [`run`](runner::run) entry point
//! - **Executor Contract** ([`executor`]) - What a chemistry engine receives and returns
//! - **Results** ([`report`]) - Published outputs and per-job outcomes
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress events
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod error;
pub mod executor;
pub(crate) mod plan;
pub mod progress;
pub mod report;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;
