use super::error::GraphError;
use super::job::Job;
use super::reference::OutputReference;
use crate::core::models::ids::JobId;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// A flow's designated output: one reference, or named outputs keyed by role.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlowOutput {
    Reference(OutputReference),
    Mapping(BTreeMap<String, FlowOutput>),
}

impl FlowOutput {
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, OutputReference)>) -> Self {
        FlowOutput::Mapping(
            entries
                .into_iter()
                .map(|(key, reference)| (key.into(), FlowOutput::Reference(reference)))
                .collect(),
        )
    }

    pub fn as_reference(&self) -> Option<&OutputReference> {
        match self {
            FlowOutput::Reference(reference) => Some(reference),
            FlowOutput::Mapping(_) => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&FlowOutput> {
        match self {
            FlowOutput::Mapping(entries) => entries.get(key),
            FlowOutput::Reference(_) => None,
        }
    }

    /// Keys of a mapping output; empty for a single reference.
    pub fn keys(&self) -> Vec<&str> {
        match self {
            FlowOutput::Mapping(entries) => entries.keys().map(String::as_str).collect(),
            FlowOutput::Reference(_) => Vec::new(),
        }
    }

    pub fn references(&self) -> Vec<&OutputReference> {
        match self {
            FlowOutput::Reference(reference) => vec![reference],
            FlowOutput::Mapping(entries) => entries.values().flat_map(|o| o.references()).collect(),
        }
    }
}

impl From<OutputReference> for FlowOutput {
    fn from(reference: OutputReference) -> Self {
        FlowOutput::Reference(reference)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case", tag = "node")]
pub enum FlowNode {
    Job(Job),
    Flow(Flow),
}

impl From<Job> for FlowNode {
    fn from(job: Job) -> Self {
        FlowNode::Job(job)
    }
}

impl From<Flow> for FlowNode {
    fn from(flow: Flow) -> Self {
        FlowNode::Flow(flow)
    }
}

/// An ordered group of jobs and nested flows with one designated output.
///
/// Node order is build order. The true execution order follows from the
/// references between jobs.
#[derive(Debug, Serialize)]
pub struct Flow {
    name: String,
    nodes: Vec<FlowNode>,
    output: FlowOutput,
}

impl Flow {
    /// Assembles a flow.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateJob`] if a job occurs twice in the subtree.
    /// - [`GraphError::DanglingReference`] if the designated output points at a
    ///   job outside the subtree.
    pub fn new(
        name: &str,
        nodes: Vec<FlowNode>,
        output: impl Into<FlowOutput>,
    ) -> Result<Self, GraphError> {
        let flow = Self {
            name: name.to_string(),
            nodes,
            output: output.into(),
        };
        let members = flow.member_ids()?;
        if let Some(dangling) = flow
            .output
            .references()
            .into_iter()
            .find(|r| !members.contains(&r.job_id()))
        {
            return Err(GraphError::DanglingReference {
                flow: flow.name.clone(),
                job: dangling.job_id(),
            });
        }
        Ok(flow)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn output(&self) -> &FlowOutput {
        &self.output
    }

    /// All jobs of this flow and its nested flows, in build order.
    pub fn jobs(&self) -> Vec<&Job> {
        let mut jobs = Vec::new();
        self.collect_jobs(&mut jobs);
        jobs
    }

    fn collect_jobs<'a>(&'a self, jobs: &mut Vec<&'a Job>) {
        for node in &self.nodes {
            match node {
                FlowNode::Job(job) => jobs.push(job),
                FlowNode::Flow(flow) => flow.collect_jobs(jobs),
            }
        }
    }

    pub fn job_count(&self) -> usize {
        self.jobs().len()
    }

    pub fn find_job(&self, name: &str) -> Option<&Job> {
        self.jobs().into_iter().find(|job| job.name() == name)
    }

    fn member_ids(&self) -> Result<HashSet<JobId>, GraphError> {
        let mut members = HashSet::new();
        for job in self.jobs() {
            if !members.insert(job.id()) {
                return Err(GraphError::DuplicateJob(job.id()));
            }
        }
        Ok(members)
    }

    /// Checks that every job input in the tree points at a job of the tree.
    ///
    /// Call this on a root flow: references from a nested flow into its
    /// ancestors are only resolvable from the root.
    pub fn validate_references(&self) -> Result<(), GraphError> {
        let members = self.member_ids()?;
        for job in self.jobs() {
            if let Some(dangling) = job
                .references()
                .into_iter()
                .find(|r| !members.contains(&r.job_id()))
            {
                return Err(GraphError::DanglingReference {
                    flow: self.name.clone(),
                    job: dangling.job_id(),
                });
            }
        }
        Ok(())
    }
}
