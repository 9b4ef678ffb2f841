//! Frequency flattening: optimize, compute frequencies, and while the lowest
//! frequency is negative, displace the geometry along that mode and repeat.
//!
//! The loop cannot be run while the graph is built because the frequencies do
//! not exist yet, and the graph must be complete before execution starts. The
//! maker therefore unrolls `max_iterations` optimize/frequency pairs up front.
//! Every pair after the first is guarded by "the previous lowest frequency is
//! negative"; once a pair converges, the guards of the remaining pairs fail
//! and the engine forwards the converged outputs through them without running
//! anything.

use super::config::ConfigError;
use crate::core::graph::flow::{Flow, FlowNode, FlowOutput};
use crate::core::graph::input::Input;
use crate::core::graph::job::Guard;
use crate::core::graph::reference::OutputReference;
use crate::core::models::stage::{StageKind, fields};
use crate::makers::stage::StageMaker;
use crate::makers::{Maker, MakerError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

pub const OPT_LATEST: &str = "opt_latest";
pub const FREQ_LATEST: &str = "freq_latest";

const DEFAULT_MAX_ITERATIONS: usize = 10;
/// Largest accepted iteration cap. Every iteration is unrolled into the graph.
pub const MAX_ITERATIONS_LIMIT: usize = 1000;
const DEFAULT_SCALE: f64 = 1.0;

/// Repeated optimization + frequency calculation with perturbation along the
/// lowest (imaginary) mode until it becomes non-negative or the iteration cap
/// is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FrequencyFlatteningOptMaker {
    pub name: String,
    pub opt_maker: StageMaker,
    /// Must build frequency jobs.
    pub freq_maker: StageMaker,
    /// Multiplier applied to the lowest mode's per-site displacement.
    pub scale: f64,
    /// Upper bound on optimize/frequency pairs, including the first.
    pub max_iterations: usize,
}

impl Default for FrequencyFlatteningOptMaker {
    fn default() -> Self {
        Self {
            name: "frequency flattening opt".to_string(),
            opt_maker: StageMaker::opt(),
            freq_maker: StageMaker::freq(),
            scale: DEFAULT_SCALE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Whole-output references of one optimize/frequency pair.
#[derive(Debug, Clone)]
struct Iteration {
    opt: OutputReference,
    freq: OutputReference,
}

impl FrequencyFlatteningOptMaker {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                parameter: "max_iterations",
                reason: "at least one optimization/frequency iteration is required".to_string(),
            });
        }
        if self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(ConfigError::InvalidValue {
                parameter: "max_iterations",
                reason: format!(
                    "at most {MAX_ITERATIONS_LIMIT} iterations can be unrolled, got {}",
                    self.max_iterations
                ),
            });
        }
        if !self.scale.is_finite() {
            return Err(ConfigError::InvalidValue {
                parameter: "scale",
                reason: format!("must be a finite number, got {}", self.scale),
            });
        }
        if self.freq_maker.kind != StageKind::Frequency {
            return Err(ConfigError::InvalidValue {
                parameter: "freq_maker",
                reason: format!(
                    "expected a frequency maker but got a {} maker",
                    self.freq_maker.kind
                ),
            });
        }
        Ok(())
    }

    /// Builds one pair and appends its jobs to `nodes`. Pairs after the first
    /// carry `guard`: the run-time condition plus the pair to forward when it
    /// fails.
    fn build_pair(
        &self,
        iteration: usize,
        structure: Input,
        prev_dir: Option<Input>,
        guard: Option<(&Input, &Iteration)>,
        nodes: &mut Vec<FlowNode>,
    ) -> Result<Iteration, MakerError> {
        let suffix = format!(" {iteration}");

        let mut opt = self.opt_maker.make(structure, prev_dir)?;
        opt.append_to_name(&suffix);

        let mut freq = self.freq_maker.make(
            opt.output_field(fields::OPTIMIZED_STRUCTURE)?.into(),
            Some(opt.output_field(fields::CALCULATION_DIRECTORY)?.into()),
        )?;
        freq.append_to_name(&suffix);

        if let Some((condition, previous)) = guard {
            opt = opt.with_guard(Guard::new(condition.clone(), previous.opt.clone()));
            freq = freq.with_guard(Guard::new(condition.clone(), previous.freq.clone()));
        }

        let current = Iteration {
            opt: opt.output(),
            freq: freq.output(),
        };
        debug!(iteration, opt = opt.name(), freq = freq.name(), "Unrolled iteration.");
        nodes.push(opt.into());
        nodes.push(freq.into());
        Ok(current)
    }

    /// Builds the pair that follows `previous`.
    ///
    /// Its structure is the previous optimized geometry, displaced along the
    /// previous lowest mode only if that mode is imaginary. Its directory is
    /// the previous optimization's directory.
    fn next_pair(
        &self,
        iteration: usize,
        previous: &Iteration,
        nodes: &mut Vec<FlowNode>,
    ) -> Result<Iteration, MakerError> {
        let frequencies = previous.freq.field(fields::VIBRATIONAL_FREQUENCIES)?;
        let still_searching = Input::still_searching(frequencies.clone());
        let structure = Input::perturb_along_lowest_mode(
            previous.opt.field(fields::OPTIMIZED_STRUCTURE)?,
            previous.freq.field(fields::VIBRATIONAL_MODES)?,
            frequencies,
            self.scale,
        );
        let prev_dir = previous.opt.field(fields::CALCULATION_DIRECTORY)?;

        self.build_pair(
            iteration,
            structure,
            Some(prev_dir.into()),
            Some((&still_searching, previous)),
            nodes,
        )
    }
}

impl Maker for FrequencyFlatteningOptMaker {
    type Output = Flow;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, name = "frequency_flattening_maker", fields(flow = %self.name))]
    fn make(&self, structure: Input, prev_dir: Option<Input>) -> Result<Flow, MakerError> {
        self.validate()?;

        let mut nodes = Vec::new();
        let first = self.build_pair(1, structure, prev_dir, None, &mut nodes)?;
        let latest = (2..=self.max_iterations).try_fold(first, |previous, iteration| {
            self.next_pair(iteration, &previous, &mut nodes)
        })?;

        let output = FlowOutput::mapping([(OPT_LATEST, latest.opt), (FREQ_LATEST, latest.freq)]);
        let flow = Flow::new(&self.name, nodes, output)?;
        info!(
            iterations = self.max_iterations,
            jobs = flow.job_count(),
            scale = self.scale,
            "Built frequency flattening flow."
        );
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::error::ResolutionError;
    use crate::core::graph::job::Job;
    use crate::core::models::structure::{Site, Structure};
    use crate::core::models::value::Value;
    use crate::engine::error::EngineError;
    use crate::engine::progress::ProgressReporter;
    use crate::engine::report::{ExecutionReport, JobState};
    use crate::engine::runner::run;
    use crate::engine::testing::ScriptedExecutor;
    use nalgebra::{Point3, Vector3};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn ethylene_fragment() -> Structure {
        Structure::new(vec![
            Site::new("C", Point3::new(0.0, 0.0, 0.667)),
            Site::new("C", Point3::new(0.0, 0.0, -0.667)),
        ])
    }

    fn maker(max_iterations: usize) -> FrequencyFlatteningOptMaker {
        FrequencyFlatteningOptMaker {
            max_iterations,
            ..FrequencyFlatteningOptMaker::default()
        }
    }

    fn names(flow: &Flow) -> Vec<&str> {
        flow.jobs().iter().map(|j| j.name()).collect()
    }

    fn output_ref<'a>(flow: &'a Flow, key: &str) -> &'a OutputReference {
        flow.output().get(key).and_then(FlowOutput::as_reference).unwrap()
    }

    #[test]
    fn single_iteration_builds_one_unguarded_pair() {
        let flow = maker(1).make(ethylene_fragment().into(), None).unwrap();
        let jobs = flow.jobs();

        assert_eq!(names(&flow), vec!["opt 1", "freq 1"]);
        assert!(jobs.iter().all(|j| j.guard().is_none()));
        assert_eq!(flow.output().keys(), vec![FREQ_LATEST, OPT_LATEST]);
        assert_eq!(output_ref(&flow, OPT_LATEST), &jobs[0].output());
        assert_eq!(output_ref(&flow, FREQ_LATEST), &jobs[1].output());
    }

    #[test]
    fn unrolls_exactly_max_iterations_pairs() {
        for n in 1..=6 {
            let flow = maker(n).make(ethylene_fragment().into(), None).unwrap();
            assert_eq!(flow.job_count(), 2 * n);
        }
    }

    #[test]
    fn three_iterations_are_numbered_and_terminal_output_is_last_pair() {
        let flow = maker(3).make(ethylene_fragment().into(), None).unwrap();
        let jobs = flow.jobs();

        assert_eq!(
            names(&flow),
            vec!["opt 1", "freq 1", "opt 2", "freq 2", "opt 3", "freq 3"]
        );
        assert_eq!(output_ref(&flow, OPT_LATEST), &jobs[4].output());
        assert_eq!(output_ref(&flow, FREQ_LATEST), &jobs[5].output());
        assert!(flow.validate_references().is_ok());
    }

    #[test]
    fn later_iterations_are_guarded_by_previous_frequencies() {
        let flow = maker(2).make(ethylene_fragment().into(), None).unwrap();
        let jobs: Vec<&Job> = flow.jobs();
        let (opt1, freq1, opt2, freq2) = (jobs[0], jobs[1], jobs[2], jobs[3]);

        let expected_condition = Input::still_searching(
            freq1
                .output_field(fields::VIBRATIONAL_FREQUENCIES)
                .unwrap(),
        );
        let opt_guard = opt2.guard().unwrap();
        assert_eq!(opt_guard.condition, expected_condition);
        assert_eq!(opt_guard.fallback, opt1.output());

        let freq_guard = freq2.guard().unwrap();
        assert_eq!(freq_guard.condition, expected_condition);
        assert_eq!(freq_guard.fallback, freq1.output());
    }

    #[test]
    fn later_optimization_consumes_deferred_perturbation() {
        let flow = maker(2).make(ethylene_fragment().into(), None).unwrap();
        let jobs = flow.jobs();
        let (opt1, freq1, opt2) = (jobs[0], jobs[1], jobs[2]);

        let expected = Input::perturb_along_lowest_mode(
            opt1.output_field(fields::OPTIMIZED_STRUCTURE).unwrap(),
            freq1.output_field(fields::VIBRATIONAL_MODES).unwrap(),
            freq1.output_field(fields::VIBRATIONAL_FREQUENCIES).unwrap(),
            1.0,
        );
        assert_eq!(opt2.structure(), &expected);
        assert_eq!(
            opt2.prev_dir().and_then(Input::as_reference),
            Some(&opt1.output_field(fields::CALCULATION_DIRECTORY).unwrap())
        );
    }

    #[test]
    fn zero_iterations_fail_before_any_job_is_built() {
        let err = maker(0).make(ethylene_fragment().into(), None).unwrap_err();
        assert!(matches!(
            err,
            MakerError::Config(ConfigError::InvalidValue {
                parameter: "max_iterations",
                ..
            })
        ));
    }

    #[test]
    fn oversized_iteration_cap_is_rejected_before_unrolling() {
        assert!(maker(MAX_ITERATIONS_LIMIT).validate().is_ok());

        for cap in [MAX_ITERATIONS_LIMIT + 1, usize::MAX / 2 + 1, usize::MAX] {
            let err = maker(cap).make(ethylene_fragment().into(), None).unwrap_err();
            assert!(matches!(
                err,
                MakerError::Config(ConfigError::InvalidValue {
                    parameter: "max_iterations",
                    ..
                })
            ));
        }
    }

    #[test]
    fn non_finite_scale_is_rejected() {
        let maker = FrequencyFlatteningOptMaker {
            scale: f64::INFINITY,
            ..FrequencyFlatteningOptMaker::default()
        };
        assert!(matches!(
            maker.validate(),
            Err(ConfigError::InvalidValue {
                parameter: "scale",
                ..
            })
        ));
    }

    #[test]
    fn defaults_follow_documented_values() {
        let maker = FrequencyFlatteningOptMaker::default();
        assert_eq!(maker.max_iterations, 10);
        assert_eq!(maker.scale, 1.0);
        assert_eq!(maker.name(), "frequency flattening opt");
    }

    fn latest_frequencies(flow: &Flow, report: &ExecutionReport) -> Value {
        let freq_latest = output_ref(flow, FREQ_LATEST)
            .field(fields::VIBRATIONAL_FREQUENCIES)
            .unwrap();
        report.resolve(&freq_latest).unwrap().clone()
    }

    #[test]
    fn imaginary_modes_drive_every_unrolled_iteration() {
        let flow = maker(3).make(ethylene_fragment().into(), None).unwrap();
        let shift = Vector3::new(0.05, 0.0, 0.1);
        let executor = ScriptedExecutor::new(vec![vec![-12.3, 40.0], vec![-4.0, 60.0], vec![15.0]])
            .with_mode_displacement(shift);

        let report = run(&flow, &executor, &ProgressReporter::new()).unwrap();

        assert_eq!(
            executor.call_names(),
            vec!["opt 1", "freq 1", "opt 2", "freq 2", "opt 3", "freq 3"]
        );
        assert_eq!(report.skipped_count(), 0);
        assert_eq!(latest_frequencies(&flow, &report), Value::from(vec![15.0]));

        let expected = ethylene_fragment().perturbed(&[shift, shift], 1.0).unwrap();
        let opt2 = &executor.calls()[2];
        assert_eq!(opt2.structure, expected);
        assert_eq!(opt2.prev_dir, Some(PathBuf::from("/scratch/opt_1")));
    }

    #[test]
    fn positive_lowest_frequency_short_circuits_remaining_iterations() {
        let flow = maker(3).make(ethylene_fragment().into(), None).unwrap();
        let executor = ScriptedExecutor::new(vec![vec![5.0, 80.0]]);

        let report = run(&flow, &executor, &ProgressReporter::new()).unwrap();

        assert_eq!(executor.call_names(), vec!["opt 1", "freq 1"]);
        assert_eq!(report.executed_count(), 2);
        assert_eq!(report.skipped_count(), 4);

        let jobs = flow.jobs();
        assert_eq!(
            report.record("opt 2").map(|r| r.state),
            Some(JobState::Skipped {
                fallback: jobs[0].id()
            })
        );
        let freq1 = report.output(jobs[1].id()).unwrap();
        let freq_latest = report.output(output_ref(&flow, FREQ_LATEST).job_id()).unwrap();
        assert!(Arc::ptr_eq(freq1, freq_latest));
        assert_eq!(latest_frequencies(&flow, &report), Value::from(vec![5.0, 80.0]));
    }

    #[test]
    fn convergence_midway_carries_converged_pair_to_the_output() {
        let flow = maker(4).make(ethylene_fragment().into(), None).unwrap();
        let executor = ScriptedExecutor::new(vec![vec![-12.3], vec![3.0]]);

        let report = run(&flow, &executor, &ProgressReporter::new()).unwrap();

        assert_eq!(report.executed_count(), 4);
        assert_eq!(report.skipped_count(), 4);
        assert_eq!(latest_frequencies(&flow, &report), Value::from(vec![3.0]));

        let resolved = report.resolve_output(flow.output()).unwrap();
        let opt_dir = resolved.as_map().unwrap()[OPT_LATEST].as_map().unwrap()
            [fields::CALCULATION_DIRECTORY]
            .as_path()
            .map(PathBuf::from);
        assert_eq!(opt_dir, Some(PathBuf::from("/scratch/opt_2")));
    }

    #[test]
    fn zero_scale_leaves_geometry_unchanged() {
        let flow = FrequencyFlatteningOptMaker {
            scale: 0.0,
            ..maker(2)
        }
        .make(ethylene_fragment().into(), None)
        .unwrap();
        let executor = ScriptedExecutor::new(vec![vec![-30.0], vec![10.0]]);

        run(&flow, &executor, &ProgressReporter::new()).unwrap();

        assert_eq!(executor.calls()[2].structure, ethylene_fragment());
    }

    #[test]
    fn non_finite_lowest_frequency_stops_execution() {
        let flow = maker(2).make(ethylene_fragment().into(), None).unwrap();
        let executor = ScriptedExecutor::new(vec![vec![f64::NAN]]);

        let err = run(&flow, &executor, &ProgressReporter::new()).unwrap_err();

        assert!(matches!(
            err,
            EngineError::Resolution {
                source: ResolutionError::NonFiniteFrequency(_),
                ..
            }
        ));
        assert_eq!(executor.call_names(), vec!["opt 1", "freq 1"]);
    }
}
