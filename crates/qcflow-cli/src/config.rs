use crate::cli::PlanArgs;
use crate::error::{CliError, Result};
use qcflow::workflows::config::WorkflowConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A plan configuration file: the workflow definition under `[workflow]` plus
/// plan-level options that command-line arguments may override.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct PartialPlanConfig {
    pub workflow: WorkflowConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_first_stage: Option<bool>,
}

/// The configuration `plan` builds from, after merging.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    pub workflow: WorkflowConfig,
    pub prev_dir: Option<PathBuf>,
}

impl PartialPlanConfig {
    pub fn new(workflow: WorkflowConfig) -> Self {
        Self {
            workflow,
            prev_dir: None,
            skip_first_stage: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| CliError::Other(e.into()))
    }

    /// Applies command-line overrides and validates the result.
    pub fn merge_with_cli(self, args: &PlanArgs) -> Result<PlanConfig> {
        let mut workflow = self.workflow;
        let kind = workflow.kind();

        if let Some(name) = &args.name {
            match &mut workflow {
                WorkflowConfig::DoubleOpt(maker) => maker.name = name.clone(),
                WorkflowConfig::FrequencyOpt(maker) => maker.name = name.clone(),
                WorkflowConfig::FrequencyFlatteningOpt(maker) => maker.name = name.clone(),
            }
        }

        if args.max_iterations.is_some() || args.scale.is_some() {
            let WorkflowConfig::FrequencyFlatteningOpt(maker) = &mut workflow else {
                return Err(CliError::Argument(format!(
                    "--max-iterations and --scale only apply to frequency-flattening-opt workflows, not {kind}"
                )));
            };
            if let Some(max_iterations) = args.max_iterations {
                maker.max_iterations = max_iterations;
            }
            if let Some(scale) = args.scale {
                maker.scale = scale;
            }
        }

        if args.skip_first_stage || self.skip_first_stage == Some(true) {
            let WorkflowConfig::DoubleOpt(maker) = &mut workflow else {
                return Err(CliError::Argument(format!(
                    "skip-first-stage only applies to double-opt workflows, not {kind}"
                )));
            };
            maker.opt_maker1 = None;
        }

        workflow.validate().map_err(CliError::Config)?;

        Ok(PlanConfig {
            workflow,
            prev_dir: args.prev_dir.clone().or(self.prev_dir),
        })
    }
}
