use crate::core::models::ids::JobId;
use crate::core::models::stage::{StageKind, StageSettings};
use crate::core::models::structure::Structure;
use crate::core::models::value::Value;
use std::path::Path;
use thiserror::Error;

/// Everything a chemistry engine needs to run one job, with every deferred
/// input already materialized.
#[derive(Debug, Clone, Copy)]
pub struct StageRequest<'a> {
    pub job_id: JobId,
    pub name: &'a str,
    pub kind: StageKind,
    pub settings: &'a StageSettings,
    pub structure: &'a Structure,
    pub prev_dir: Option<&'a Path>,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExecutionError {
    message: String,
}

impl ExecutionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Runs single calculations on behalf of the engine.
///
/// The returned value must be a [`Value::Map`] holding at least every field
/// of `request.kind.output_schema()`; the engine refuses to publish anything
/// less.
pub trait StageExecutor {
    fn execute(&self, request: &StageRequest<'_>) -> Result<Value, ExecutionError>;
}

impl<F> StageExecutor for F
where
    F: Fn(&StageRequest<'_>) -> Result<Value, ExecutionError>,
{
    fn execute(&self, request: &StageRequest<'_>) -> Result<Value, ExecutionError> {
        self(request)
    }
}
