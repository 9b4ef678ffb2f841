use super::reference::FieldPath;
use crate::core::models::ids::JobId;
use crate::core::models::vibrations::VibrationError;
use thiserror::Error;

/// Errors raised while wiring jobs into flows.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum GraphError {
    #[error("Job '{job}' does not declare an output field named '{field}'")]
    UndeclaredField { job: String, field: String },

    #[error("Flow '{flow}' references job {job} which is not part of the flow or its ancestors")]
    DanglingReference { flow: String, job: JobId },

    #[error("Job {0} appears more than once in the flow")]
    DuplicateJob(JobId),

    #[error("Flow '{0}' contains a dependency cycle")]
    Cycle(String),
}

/// Errors raised while materializing a deferred input against published
/// job outputs.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum ResolutionError {
    #[error("Output of job {0} has not been published")]
    Unresolved(JobId),

    #[error("Field path '{path}' of job {job} does not exist")]
    MissingField { job: JobId, path: FieldPath },

    #[error("Index {index} is out of bounds in '{path}' of job {job} (length {len})")]
    IndexOutOfBounds {
        job: JobId,
        path: FieldPath,
        index: usize,
        len: usize,
    },

    #[error("Expected a {expected} but found a {found} in {context}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
        context: String,
    },

    #[error("Lowest vibrational frequency is not a finite number ({0})")]
    NonFiniteFrequency(f64),

    #[error("Perturbation failed: {0}")]
    Perturbation(#[from] VibrationError),
}
