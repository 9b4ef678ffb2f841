//! # Makers Module
//!
//! A maker is a configurable factory that turns a starting structure (concrete
//! or deferred) and an optional previous calculation directory into a job or a
//! flow. Makers are the composable unit: composite makers in
//! [`workflows`](crate::workflows) hold other makers and chain what they build.

pub mod stage;

use crate::core::graph::error::GraphError;
use crate::core::graph::input::Input;
use crate::workflows::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum MakerError {
    #[error("Invalid maker configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to wire job graph: {0}")]
    Graph(#[from] GraphError),
}

/// A factory for a job or a flow.
pub trait Maker {
    /// What `make` builds: a [`Job`](crate::core::graph::job::Job) for stage
    /// makers, a [`Flow`](crate::core::graph::flow::Flow) for composites.
    type Output;

    fn name(&self) -> &str;

    /// Builds the graph fragment without executing anything.
    ///
    /// `structure` and `prev_dir` may be literals or references into outputs
    /// of jobs built earlier.
    fn make(&self, structure: Input, prev_dir: Option<Input>) -> Result<Self::Output, MakerError>;
}
