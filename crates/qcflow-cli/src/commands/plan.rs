use crate::cli::PlanArgs;
use crate::config::{PartialPlanConfig, PlanConfig};
use crate::error::{CliError, Result};
use qcflow::core::graph::flow::{Flow, FlowNode, FlowOutput};
use qcflow::core::graph::input::Input;
use qcflow::core::io::traits::StructureFile;
use qcflow::core::io::xyz::XyzFile;
use qcflow::core::models::structure::Structure;
use qcflow::core::models::value::Value;
use qcflow::makers::MakerError;
use std::io::{self, Write};
use tracing::info;

pub fn run(args: PlanArgs) -> Result<()> {
    let partial_config = PartialPlanConfig::from_file(&args.config)?;
    info!("Merging configuration from file and CLI arguments...");
    let config = partial_config.merge_with_cli(&args)?;

    info!("Loading input structure from {:?}", &args.input);
    let structure = XyzFile::read_from_path(&args.input).map_err(|e| CliError::FileParsing {
        path: args.input.clone(),
        source: e.into(),
    })?;

    let flow = build_flow(&config, structure)?;
    info!(
        "Built workflow '{}' with {} job(s).",
        flow.name(),
        flow.job_count()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        write_json(&flow, &mut out)
    } else {
        write_text(&flow, &mut out).map_err(CliError::Io)
    }
}

pub fn build_flow(config: &PlanConfig, structure: Structure) -> Result<Flow> {
    let prev_dir = config.prev_dir.clone().map(Input::from);
    let flow = config.workflow.make(structure.into(), prev_dir)?;
    flow.validate_references().map_err(MakerError::from)?;
    Ok(flow)
}

pub fn write_json(flow: &Flow, out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, flow).map_err(|e| CliError::Other(e.into()))?;
    writeln!(out)?;
    Ok(())
}

pub fn write_text(flow: &Flow, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Flow '{}' ({} jobs)", flow.name(), flow.job_count())?;
    write_nodes(flow, 1, out)?;
    writeln!(out, "Output:")?;
    write_output(flow.output(), 1, out)
}

fn write_nodes(flow: &Flow, depth: usize, out: &mut impl Write) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    for node in flow.nodes() {
        match node {
            FlowNode::Job(job) => {
                writeln!(out, "{indent}- {} [{}]", job.name(), job.kind())?;
                writeln!(out, "{indent}    structure: {}", describe(job.structure()))?;
                if let Some(prev_dir) = job.prev_dir() {
                    writeln!(out, "{indent}    prev-dir: {}", describe(prev_dir))?;
                }
                if let Some(guard) = job.guard() {
                    writeln!(
                        out,
                        "{indent}    runs if: {}, else forwards '{}'",
                        describe(&guard.condition),
                        guard.fallback.job_name()
                    )?;
                }
            }
            FlowNode::Flow(inner) => {
                writeln!(out, "{indent}+ {} ({} jobs)", inner.name(), inner.job_count())?;
                write_nodes(inner, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

fn write_output(output: &FlowOutput, depth: usize, out: &mut impl Write) -> io::Result<()> {
    let indent = "  ".repeat(depth);
    match output {
        FlowOutput::Reference(reference) => writeln!(out, "{indent}{reference}"),
        FlowOutput::Mapping(entries) => {
            for (key, entry) in entries {
                match entry {
                    FlowOutput::Reference(reference) => writeln!(out, "{indent}{key}: {reference}")?,
                    FlowOutput::Mapping(_) => {
                        writeln!(out, "{indent}{key}:")?;
                        write_output(entry, depth + 1, out)?;
                    }
                }
            }
            Ok(())
        }
    }
}

fn describe(input: &Input) -> String {
    match input {
        Input::Literal { value } => match value {
            Value::Structure(structure) => format!("structure with {} sites", structure.len()),
            Value::Path(path) => path.display().to_string(),
            other => format!("{} literal", other.kind()),
        },
        Input::Reference { reference } => reference.to_string(),
        Input::StillSearching { frequencies } => {
            format!("lowest of ({}) < 0", describe(frequencies))
        }
        Input::PerturbAlongLowestMode {
            structure,
            modes,
            frequencies,
            scale,
        } => format!(
            "({}) displaced by {scale} x first of ({}) while lowest of ({}) < 0",
            describe(structure),
            describe(modes),
            describe(frequencies)
        ),
    }
}
