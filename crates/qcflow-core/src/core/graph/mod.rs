//! # Graph Module
//!
//! Build-time representation of workflows: jobs whose inputs are deferred
//! references into the outputs of other jobs, and flows that group them.
//!
//! Nothing here executes a job. Building a graph only allocates descriptors and
//! wires references; the [`engine`](crate::engine) is the only component that
//! turns a reference into a concrete [`Value`](crate::core::models::value::Value).
//!
//! - [`reference`] - `OutputReference` and field-path projection
//! - [`input`] - Literal, referenced and transformed job inputs
//! - [`job`] - `Job` and run-time `Guard`s
//! - [`flow`] - `Flow`, nested flows and designated outputs
//! - [`error`] - Wiring and resolution errors

pub mod error;
pub mod flow;
pub mod input;
pub mod job;
pub mod reference;
