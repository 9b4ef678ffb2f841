use super::error::EngineError;
use super::executor::{StageExecutor, StageRequest};
use super::plan::ExecutionPlan;
use super::progress::{Progress, ProgressReporter};
use super::report::{ExecutionReport, JobRecord, JobState, OutputStore};
use crate::core::graph::error::ResolutionError;
use crate::core::graph::flow::Flow;
use crate::core::graph::job::{Guard, Job};
use crate::core::graph::input::Input;
use crate::core::models::value::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Executes every job of a root flow.
///
/// Jobs run one at a time in dependency order. A guarded job whose condition
/// is false is not executed and its inputs are not materialized; it publishes
/// the output of its guard's fallback instead. A job's output becomes visible
/// to later jobs only after every field its stage declares is present.
///
/// # Errors
///
/// Stops at the first failure: an invalid graph, an input that cannot be
/// resolved, a failed or incomplete stage.
#[instrument(skip_all, name = "flow_run", fields(flow = %flow.name()))]
pub fn run(
    flow: &Flow,
    executor: &impl StageExecutor,
    reporter: &ProgressReporter<'_>,
) -> Result<ExecutionReport, EngineError> {
    let plan = ExecutionPlan::new(flow)?;
    info!(jobs = plan.len(), "Starting flow execution.");
    reporter.report(Progress::FlowStart {
        name: flow.name().to_string(),
        total_jobs: plan.len(),
    });

    let mut store = OutputStore::new();
    let mut records = Vec::with_capacity(plan.len());

    for (position, job) in plan.ordered_jobs().enumerate() {
        if let Some(guard) = job.guard() {
            if !guard_holds(job, guard, &store)? {
                let output = store
                    .share(&guard.fallback)
                    .map_err(|e| EngineError::resolution(job.name(), e))?;
                publish(&mut store, job, output)?;
                debug!(job = job.name(), fallback = guard.fallback.job_name(), "Guard failed; forwarding output.");
                reporter.report(Progress::JobSkipped {
                    name: job.name().to_string(),
                    fallback: guard.fallback.job_name().to_string(),
                });
                records.push(JobRecord {
                    id: job.id(),
                    name: job.name().to_string(),
                    state: JobState::Skipped {
                        fallback: guard.fallback.job_id(),
                    },
                });
                continue;
            }
        }

        reporter.report(Progress::JobStart {
            name: job.name().to_string(),
            position,
        });
        let output = execute_job(job, executor, &store)?;
        publish(&mut store, job, Arc::new(output))?;
        reporter.report(Progress::JobFinish {
            name: job.name().to_string(),
        });
        records.push(JobRecord {
            id: job.id(),
            name: job.name().to_string(),
            state: JobState::Completed,
        });
    }

    let report = ExecutionReport::new(flow.name(), records, store);
    info!(
        executed = report.executed_count(),
        skipped = report.skipped_count(),
        "Flow execution finished."
    );
    reporter.report(Progress::FlowFinish {
        executed: report.executed_count(),
        skipped: report.skipped_count(),
    });
    Ok(report)
}

fn guard_holds(job: &Job, guard: &Guard, store: &OutputStore) -> Result<bool, EngineError> {
    let condition = guard
        .condition
        .materialize(store)
        .map_err(|e| EngineError::resolution(job.name(), e))?;
    condition.as_bool().ok_or_else(|| EngineError::InvalidGuard {
        job: job.name().to_string(),
        found: condition.kind(),
    })
}

fn execute_job(
    job: &Job,
    executor: &impl StageExecutor,
    store: &OutputStore,
) -> Result<Value, EngineError> {
    let structure = match materialize(job, job.structure(), store)? {
        Value::Structure(structure) => structure,
        other => {
            return Err(EngineError::resolution(
                job.name(),
                mismatch("structure", &other, "structure input"),
            ));
        }
    };
    let prev_dir = job
        .prev_dir()
        .map(|input| match materialize(job, input, store)? {
            Value::Path(path) => Ok(path),
            Value::Text(text) => Ok(PathBuf::from(text)),
            other => Err(EngineError::resolution(
                job.name(),
                mismatch("path", &other, "previous calculation directory"),
            )),
        })
        .transpose()?;

    let request = StageRequest {
        job_id: job.id(),
        name: job.name(),
        kind: job.kind(),
        settings: job.settings(),
        structure: &structure,
        prev_dir: prev_dir.as_deref(),
    };
    debug!(job = job.name(), kind = %job.kind(), sites = structure.len(), "Executing job.");
    executor
        .execute(&request)
        .map_err(|e| EngineError::Execution {
            job: job.name().to_string(),
            message: e.to_string(),
        })
}

fn materialize(job: &Job, input: &Input, store: &OutputStore) -> Result<Value, EngineError> {
    input
        .materialize(store)
        .map_err(|e| EngineError::resolution(job.name(), e))
}

fn mismatch(expected: &'static str, found: &Value, context: &str) -> ResolutionError {
    ResolutionError::TypeMismatch {
        expected,
        found: found.kind(),
        context: context.to_string(),
    }
}

/// Checks `output` against the job's declared schema and publishes it whole.
fn publish(store: &mut OutputStore, job: &Job, output: Arc<Value>) -> Result<(), EngineError> {
    let fields = output.as_map().ok_or_else(|| EngineError::MalformedOutput {
        job: job.name().to_string(),
        found: output.kind(),
    })?;
    if let Some(missing) = job
        .schema()
        .fields()
        .iter()
        .find(|field| !fields.contains_key(**field))
    {
        return Err(EngineError::IncompleteOutput {
            job: job.name().to_string(),
            field: *missing,
        });
    }
    store.publish(job.id(), output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::flow::FlowNode;
    use crate::core::graph::input::Input;
    use crate::core::models::stage::{StageKind, StageSettings, fields};
    use crate::core::models::structure::{Site, Structure};
    use crate::engine::executor::ExecutionError;
    use crate::engine::testing::ScriptedExecutor;
    use nalgebra::Point3;
    use std::sync::Mutex;

    fn hydrogen() -> Structure {
        Structure::new(vec![
            Site::new("H", Point3::origin()),
            Site::new("H", Point3::new(0.0, 0.0, 0.74)),
        ])
    }

    fn stage(name: &str, kind: StageKind, structure: Input, prev_dir: Option<Input>) -> Job {
        Job::new(name, kind, StageSettings::default(), structure, prev_dir)
    }

    fn opt_then_freq() -> Flow {
        let opt = stage("opt", StageKind::Optimization, hydrogen().into(), None);
        let freq = stage(
            "freq",
            StageKind::Frequency,
            opt.output_field(fields::OPTIMIZED_STRUCTURE).unwrap().into(),
            Some(opt.output_field(fields::CALCULATION_DIRECTORY).unwrap().into()),
        );
        let output = freq.output();
        Flow::new("opt+freq", vec![opt.into(), freq.into()], output).unwrap()
    }

    #[test]
    fn chained_jobs_receive_materialized_inputs() {
        let flow = opt_then_freq();
        let executor = ScriptedExecutor::new(vec![vec![250.0]]);

        let report = run(&flow, &executor, &ProgressReporter::new()).unwrap();

        let calls = executor.calls();
        assert_eq!(executor.call_names(), vec!["opt", "freq"]);
        assert_eq!(calls[0].prev_dir, None);
        assert_eq!(calls[1].structure, hydrogen());
        assert_eq!(calls[1].prev_dir, Some(PathBuf::from("/scratch/opt")));
        assert_eq!(report.executed_count(), 2);

        let frequencies = flow
            .output()
            .as_reference()
            .unwrap()
            .field(fields::VIBRATIONAL_FREQUENCIES)
            .unwrap();
        assert_eq!(
            report.resolve(&frequencies).unwrap(),
            &Value::from(vec![250.0])
        );
    }

    #[test]
    fn progress_events_follow_execution() {
        let flow = opt_then_freq();
        let executor = ScriptedExecutor::new(vec![]);
        let events = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            events.lock().unwrap().push(event);
        }));

        run(&flow, &executor, &reporter).unwrap();
        drop(reporter);

        let events = events.into_inner().unwrap();
        assert_eq!(
            events.first(),
            Some(&Progress::FlowStart {
                name: "opt+freq".to_string(),
                total_jobs: 2
            })
        );
        assert!(events.contains(&Progress::JobStart {
            name: "freq".to_string(),
            position: 1
        }));
        assert_eq!(
            events.last(),
            Some(&Progress::FlowFinish {
                executed: 2,
                skipped: 0
            })
        );
    }

    #[test]
    fn failed_guard_forwards_fallback_without_executing() {
        let first = stage("opt 1", StageKind::Optimization, hydrogen().into(), None);
        let second = stage(
            "opt 2",
            StageKind::Optimization,
            first.output_field(fields::OPTIMIZED_STRUCTURE).unwrap().into(),
            None,
        )
        .with_guard(Guard::new(Input::literal(false), first.output()));
        let (first_id, second_id) = (first.id(), second.id());
        let output = second.output();
        let flow = Flow::new("guarded", vec![first.into(), second.into()], output).unwrap();
        let executor = ScriptedExecutor::new(vec![]);

        let report = run(&flow, &executor, &ProgressReporter::new()).unwrap();

        assert_eq!(executor.call_names(), vec!["opt 1"]);
        assert_eq!(
            report.record("opt 2").map(|r| r.state),
            Some(JobState::Skipped { fallback: first_id })
        );
        assert!(Arc::ptr_eq(
            report.output(first_id).unwrap(),
            report.output(second_id).unwrap()
        ));
    }

    #[test]
    fn skipped_job_does_not_materialize_its_inputs() {
        let first = stage("opt 1", StageKind::Optimization, hydrogen().into(), None);
        let unresolvable = Input::perturb_along_lowest_mode(
            Input::literal(Value::Null),
            Input::literal(Value::Null),
            Input::literal(Value::Null),
            1.0,
        );
        let second = stage("opt 2", StageKind::Optimization, unresolvable, None)
            .with_guard(Guard::new(Input::literal(false), first.output()));
        let output = second.output();
        let flow = Flow::new("lazy", vec![first.into(), second.into()], output).unwrap();

        let report = run(&flow, &ScriptedExecutor::new(vec![]), &ProgressReporter::new());
        assert!(report.is_ok());
    }

    #[test]
    fn non_boolean_guard_is_rejected() {
        let first = stage("opt 1", StageKind::Optimization, hydrogen().into(), None);
        let second = stage("opt 2", StageKind::Optimization, hydrogen().into(), None)
            .with_guard(Guard::new(Input::literal(3.0), first.output()));
        let output = second.output();
        let flow = Flow::new("odd guard", vec![first.into(), second.into()], output).unwrap();

        let err = run(&flow, &ScriptedExecutor::new(vec![]), &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidGuard { found: "number", .. }));
    }

    #[test]
    fn incomplete_output_is_not_published() {
        let flow = opt_then_freq();
        let executor = ScriptedExecutor::new(vec![]).omitting(fields::VIBRATIONAL_MODES);

        let err = run(&flow, &executor, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(
            err,
            EngineError::IncompleteOutput { ref job, field } if job == "freq" && field == fields::VIBRATIONAL_MODES
        ));
    }

    #[test]
    fn executor_failure_names_the_job() {
        let flow = opt_then_freq();
        let executor = ScriptedExecutor::new(vec![]).failing_on("opt");

        let err = run(&flow, &executor, &ProgressReporter::new()).unwrap_err();
        assert_eq!(err.to_string(), "Job 'opt' failed: SCF did not converge");
        assert_eq!(executor.call_names(), vec!["opt"]);
    }

    fn refuse(request: &StageRequest<'_>) -> Result<Value, ExecutionError> {
        Err(ExecutionError::new(format!("no engine for {}", request.kind)))
    }

    #[test]
    fn functions_can_act_as_executors() {
        let flow = opt_then_freq();
        let err = run(&flow, &refuse, &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::Execution { .. }));
    }

    #[test]
    fn literal_prev_dir_may_be_text() {
        let job = stage(
            "sp",
            StageKind::SinglePoint,
            hydrogen().into(),
            Some(Input::literal("/scratch/earlier")),
        );
        let output = job.output();
        let flow = Flow::new("single", vec![FlowNode::Job(job)], output).unwrap();
        let executor = ScriptedExecutor::new(vec![]);

        run(&flow, &executor, &ProgressReporter::new()).unwrap();
        assert_eq!(
            executor.calls()[0].prev_dir,
            Some(PathBuf::from("/scratch/earlier"))
        );
    }
}
