use crate::core::graph::error::ResolutionError;
use crate::core::graph::flow::FlowOutput;
use crate::core::graph::reference::{OutputReference, ReferenceResolver};
use crate::core::models::ids::JobId;
use crate::core::models::value::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Published job outputs. An entry is only ever inserted whole.
#[derive(Debug, Default, Clone)]
pub struct OutputStore {
    outputs: HashMap<JobId, Arc<Value>>,
}

impl OutputStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn publish(&mut self, job: JobId, output: Arc<Value>) {
        self.outputs.insert(job, output);
    }

    pub fn get(&self, job: JobId) -> Option<&Arc<Value>> {
        self.outputs.get(&job)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// The value addressed by `reference` as a shareable handle. Whole
    /// outputs are shared, projections are copied.
    pub(crate) fn share(&self, reference: &OutputReference) -> Result<Arc<Value>, ResolutionError> {
        if reference.is_root() {
            return self
                .get(reference.job_id())
                .cloned()
                .ok_or(ResolutionError::Unresolved(reference.job_id()));
        }
        self.resolve(reference).map(|value| Arc::new(value.clone()))
    }
}

impl ReferenceResolver for OutputStore {
    fn output_of(&self, job: JobId) -> Result<&Value, ResolutionError> {
        self.outputs
            .get(&job)
            .map(Arc::as_ref)
            .ok_or(ResolutionError::Unresolved(job))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Completed,
    /// The guard failed and the output of `fallback` was forwarded.
    Skipped { fallback: JobId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub state: JobState,
}

/// Outcome of running a flow: what happened to each job, in execution order,
/// and every published output.
#[derive(Debug, Clone)]
pub struct ExecutionReport {
    flow_name: String,
    records: Vec<JobRecord>,
    outputs: OutputStore,
}

impl ExecutionReport {
    pub(crate) fn new(flow_name: &str, records: Vec<JobRecord>, outputs: OutputStore) -> Self {
        Self {
            flow_name: flow_name.to_string(),
            records,
            outputs,
        }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow_name
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn record(&self, name: &str) -> Option<&JobRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn executed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.state == JobState::Completed)
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.records.len() - self.executed_count()
    }

    pub fn outputs(&self) -> &OutputStore {
        &self.outputs
    }

    pub fn output(&self, job: JobId) -> Option<&Arc<Value>> {
        self.outputs.get(job)
    }

    pub fn resolve(&self, reference: &OutputReference) -> Result<&Value, ResolutionError> {
        self.outputs.resolve(reference)
    }

    /// Materializes a flow's designated output; mappings become
    /// [`Value::Map`]s with the same keys.
    pub fn resolve_output(&self, output: &FlowOutput) -> Result<Value, ResolutionError> {
        match output {
            FlowOutput::Reference(reference) => self.resolve(reference).cloned(),
            FlowOutput::Mapping(entries) => entries
                .iter()
                .map(|(key, entry)| Ok((key.clone(), self.resolve_output(entry)?)))
                .collect::<Result<BTreeMap<_, _>, ResolutionError>>()
                .map(Value::Map),
        }
    }
}
