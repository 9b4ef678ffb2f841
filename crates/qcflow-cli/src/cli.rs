use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "qcflow CLI - Build and inspect quantum-chemistry workflow graphs (double optimization, frequency flattening) from TOML configurations.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the configured workflow for a structure and print its job graph.
    Plan(PlanArgs),
    /// Print the default configuration of a workflow type as TOML.
    ShowConfig(ShowConfigArgs),
}

/// Arguments for the `plan` subcommand.
#[derive(Args, Debug)]
pub struct PlanArgs {
    // --- Core Arguments ---
    /// Path to the workflow configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Path to the starting structure (XYZ format).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory of a previous calculation to restart from.
    #[arg(long, value_name = "DIR")]
    pub prev_dir: Option<PathBuf>,

    /// Print the graph as JSON instead of a text tree.
    #[arg(long)]
    pub json: bool,

    // --- Workflow Overrides ---
    /// Override the flow name from the config file.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Override the iteration cap of a frequency flattening workflow.
    #[arg(long, value_name = "INT")]
    pub max_iterations: Option<usize>,

    /// Override the mode displacement scale of a frequency flattening workflow.
    #[arg(long, value_name = "FLOAT")]
    pub scale: Option<f64>,

    /// Drop the pre-optimization of a double optimization workflow.
    #[arg(long)]
    pub skip_first_stage: bool,
}

/// Arguments for the `show-config` subcommand.
#[derive(Args, Debug)]
pub struct ShowConfigArgs {
    /// Workflow type whose defaults are printed.
    #[arg(short = 't', long = "type", value_enum, value_name = "TYPE")]
    pub workflow_type: WorkflowType,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowType {
    DoubleOpt,
    FrequencyOpt,
    FrequencyFlatteningOpt,
}
