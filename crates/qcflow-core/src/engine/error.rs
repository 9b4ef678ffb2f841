use crate::core::graph::error::{GraphError, ResolutionError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid job graph: {0}")]
    Graph(#[from] GraphError),

    #[error("Failed to resolve inputs of job '{job}': {source}")]
    Resolution {
        job: String,
        #[source]
        source: ResolutionError,
    },

    #[error("Guard of job '{job}' evaluated to a {found}, expected a bool")]
    InvalidGuard { job: String, found: &'static str },

    #[error("Job '{job}' failed: {message}")]
    Execution { job: String, message: String },

    #[error("Job '{job}' published a {found} instead of an output map")]
    MalformedOutput { job: String, found: &'static str },

    #[error("Job '{job}' did not publish declared output field '{field}'")]
    IncompleteOutput { job: String, field: &'static str },
}

impl EngineError {
    pub(crate) fn resolution(job: &str, source: ResolutionError) -> Self {
        Self::Resolution {
            job: job.to_string(),
            source,
        }
    }
}
