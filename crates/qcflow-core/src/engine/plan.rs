use crate::core::graph::error::GraphError;
use crate::core::graph::flow::Flow;
use crate::core::graph::job::Job;
use crate::core::models::ids::JobId;
use slotmap::{SecondaryMap, SlotMap, new_key_type};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

new_key_type! {
    pub(crate) struct NodeKey;
}

/// The jobs of a root flow in an order where every job follows the jobs it
/// references. Independent jobs keep their build order.
#[derive(Debug)]
pub(crate) struct ExecutionPlan<'f> {
    jobs: SlotMap<NodeKey, &'f Job>,
    order: Vec<NodeKey>,
}

impl<'f> ExecutionPlan<'f> {
    pub(crate) fn new(flow: &'f Flow) -> Result<Self, GraphError> {
        flow.validate_references()?;

        let mut jobs = SlotMap::with_key();
        let mut keys_by_id: HashMap<JobId, NodeKey> = HashMap::new();
        let mut position: SecondaryMap<NodeKey, usize> = SecondaryMap::new();
        for (index, job) in flow.jobs().into_iter().enumerate() {
            let key = jobs.insert(job);
            keys_by_id.insert(job.id(), key);
            position.insert(key, index);
        }

        let mut dependents: SecondaryMap<NodeKey, Vec<NodeKey>> = SecondaryMap::new();
        let mut in_degree: SecondaryMap<NodeKey, usize> = SecondaryMap::new();
        for key in jobs.keys() {
            dependents.insert(key, Vec::new());
            in_degree.insert(key, 0);
        }

        for (key, job) in &jobs {
            let mut seen = HashSet::new();
            for reference in job.references() {
                let dependency = keys_by_id.get(&reference.job_id()).copied().ok_or_else(|| {
                    GraphError::DanglingReference {
                        flow: flow.name().to_string(),
                        job: reference.job_id(),
                    }
                })?;
                if !seen.insert(dependency) {
                    continue;
                }
                if let Some(list) = dependents.get_mut(dependency) {
                    list.push(key);
                }
                if let Some(degree) = in_degree.get_mut(key) {
                    *degree += 1;
                }
            }
        }

        let mut key_at: Vec<NodeKey> = vec![NodeKey::default(); jobs.len()];
        for (key, &index) in &position {
            key_at[index] = key;
        }

        let mut ready: BTreeSet<usize> = in_degree
            .iter()
            .filter(|&(_, &degree)| degree == 0)
            .map(|(key, _)| position[key])
            .collect();
        let mut order = Vec::with_capacity(jobs.len());
        while let Some(index) = ready.pop_first() {
            let key = key_at[index];
            order.push(key);
            for &dependent in &dependents[key] {
                let degree = &mut in_degree[dependent];
                *degree -= 1;
                if *degree == 0 {
                    ready.insert(position[dependent]);
                }
            }
        }

        if order.len() != jobs.len() {
            return Err(GraphError::Cycle(flow.name().to_string()));
        }
        debug!(flow = flow.name(), jobs = order.len(), "Planned execution order.");
        Ok(Self { jobs, order })
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    /// Jobs in execution order.
    pub(crate) fn ordered_jobs(&self) -> impl Iterator<Item = &'f Job> + '_ {
        self.order.iter().map(|&key| self.jobs[key])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::flow::FlowNode;
    use crate::core::graph::input::Input;
    use crate::core::graph::job::Guard;
    use crate::core::models::stage::{StageKind, StageSettings, fields};
    use crate::core::models::structure::{Site, Structure};
    use crate::core::models::value::Value;
    use nalgebra::Point3;

    fn neon() -> Structure {
        Structure::new(vec![Site::new("Ne", Point3::origin())])
    }

    fn job(name: &str, structure: Input) -> Job {
        Job::new(
            name,
            StageKind::Optimization,
            StageSettings::default(),
            structure,
            None,
        )
    }

    fn names(plan: &ExecutionPlan<'_>) -> Vec<String> {
        plan.ordered_jobs().map(|j| j.name().to_string()).collect()
    }

    #[test]
    fn dependencies_run_before_dependents_regardless_of_build_order() {
        let first = job("first", neon().into());
        let second = job(
            "second",
            first.output_field(fields::OPTIMIZED_STRUCTURE).unwrap().into(),
        );
        let output = second.output();
        let flow = Flow::new("reversed", vec![second.into(), first.into()], output).unwrap();

        let plan = ExecutionPlan::new(&flow).unwrap();
        assert_eq!(names(&plan), vec!["first", "second"]);
    }

    #[test]
    fn independent_jobs_keep_build_order() {
        let a = job("a", neon().into());
        let b = job("b", neon().into());
        let c = job("c", neon().into());
        let output = c.output();
        let flow = Flow::new("siblings", vec![a.into(), b.into(), c.into()], output).unwrap();

        let plan = ExecutionPlan::new(&flow).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(names(&plan), vec!["a", "b", "c"]);
    }

    #[test]
    fn nested_flows_are_flattened() {
        let inner_job = job("inner", neon().into());
        let inner_output = inner_job.output();
        let inner = Flow::new("inner flow", vec![inner_job.into()], inner_output.clone()).unwrap();
        let outer_job = job(
            "outer",
            inner_output.field(fields::OPTIMIZED_STRUCTURE).unwrap().into(),
        );
        let output = outer_job.output();
        let nodes: Vec<FlowNode> = vec![outer_job.into(), inner.into()];
        let root = Flow::new("root", nodes, output).unwrap();

        let plan = ExecutionPlan::new(&root).unwrap();
        assert_eq!(names(&plan), vec!["inner", "outer"]);
    }

    #[test]
    fn dangling_reference_is_rejected() {
        let outsider = job("outsider", neon().into());
        let consumer = job(
            "consumer",
            outsider.output_field(fields::OPTIMIZED_STRUCTURE).unwrap().into(),
        );
        let output = consumer.output();
        let flow = Flow::new("incomplete", vec![consumer.into()], output).unwrap();

        assert!(matches!(
            ExecutionPlan::new(&flow),
            Err(GraphError::DanglingReference { .. })
        ));
    }

    #[test]
    fn guard_fallback_closing_a_loop_is_a_cycle() {
        let start = job("start", neon().into());
        let follow = job(
            "follow",
            start.output_field(fields::OPTIMIZED_STRUCTURE).unwrap().into(),
        );
        let start = start.with_guard(Guard::new(Input::from(Value::from(true)), follow.output()));
        let output = follow.output();
        let flow = Flow::new("loop", vec![start.into(), follow.into()], output).unwrap();

        assert!(matches!(
            ExecutionPlan::new(&flow),
            Err(GraphError::Cycle(name)) if name == "loop"
        ));
    }
}
