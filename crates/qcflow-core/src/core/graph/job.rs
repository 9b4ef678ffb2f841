use super::error::GraphError;
use super::input::Input;
use super::reference::OutputReference;
use crate::core::models::ids::JobId;
use crate::core::models::stage::{OutputSchema, StageKind, StageSettings};
use serde::Serialize;

/// A run-time condition attached to a job.
///
/// When `condition` evaluates to `false` the job is not executed and its
/// output becomes the output addressed by `fallback`, so consumers downstream
/// of a skipped job still resolve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Guard {
    pub condition: Input,
    pub fallback: OutputReference,
}

impl Guard {
    pub fn new(condition: Input, fallback: OutputReference) -> Self {
        Self {
            condition,
            fallback,
        }
    }
}

/// A single deferred calculation.
///
/// A job only describes work: its inputs may be references into outputs of
/// jobs that have not run, and its own output is reachable through
/// [`Job::output`] before anything executes. Apart from the name suffix added
/// by composite makers, a job does not change after construction.
#[derive(Debug, Serialize)]
pub struct Job {
    id: JobId,
    name: String,
    kind: StageKind,
    settings: StageSettings,
    structure: Input,
    prev_dir: Option<Input>,
    guard: Option<Guard>,
}

impl Job {
    pub fn new(
        name: &str,
        kind: StageKind,
        settings: StageSettings,
        structure: Input,
        prev_dir: Option<Input>,
    ) -> Self {
        Self {
            id: JobId::new(),
            name: name.to_string(),
            kind,
            settings,
            structure,
            prev_dir,
            guard: None,
        }
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `suffix` to the job name (e.g. `" 2"` for the second stage).
    pub fn append_to_name(&mut self, suffix: &str) {
        self.name.push_str(suffix);
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn settings(&self) -> &StageSettings {
        &self.settings
    }

    pub fn structure(&self) -> &Input {
        &self.structure
    }

    pub fn prev_dir(&self) -> Option<&Input> {
        self.prev_dir.as_ref()
    }

    pub fn guard(&self) -> Option<&Guard> {
        self.guard.as_ref()
    }

    pub fn schema(&self) -> OutputSchema {
        self.kind.output_schema()
    }

    /// Reference to this job's whole output.
    pub fn output(&self) -> OutputReference {
        OutputReference::root(self.id, &self.name, self.schema())
    }

    /// Reference to one declared field of this job's output.
    pub fn output_field(&self, field: &str) -> Result<OutputReference, GraphError> {
        self.output().field(field)
    }

    /// Every reference this job consumes, including its guard.
    pub fn references(&self) -> Vec<&OutputReference> {
        let mut found = self.structure.references();
        if let Some(prev_dir) = &self.prev_dir {
            found.extend(prev_dir.references());
        }
        if let Some(guard) = &self.guard {
            found.extend(guard.condition.references());
            found.push(&guard.fallback);
        }
        found
    }
}
