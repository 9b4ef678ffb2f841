use crate::cli::{ShowConfigArgs, WorkflowType};
use crate::config::PartialPlanConfig;
use crate::error::Result;
use qcflow::workflows::config::WorkflowConfig;
use qcflow::workflows::double_opt::DoubleOptMaker;
use qcflow::workflows::flattening::FrequencyFlatteningOptMaker;
use qcflow::workflows::frequency_opt::FrequencyOptMaker;
use tracing::info;

pub fn default_config(workflow_type: WorkflowType) -> WorkflowConfig {
    match workflow_type {
        WorkflowType::DoubleOpt => WorkflowConfig::DoubleOpt(DoubleOptMaker::default()),
        WorkflowType::FrequencyOpt => WorkflowConfig::FrequencyOpt(FrequencyOptMaker::default()),
        WorkflowType::FrequencyFlatteningOpt => {
            WorkflowConfig::FrequencyFlatteningOpt(FrequencyFlatteningOptMaker::default())
        }
    }
}

pub fn render(workflow_type: WorkflowType) -> Result<String> {
    PartialPlanConfig::new(default_config(workflow_type)).to_toml_string()
}

pub fn run(args: ShowConfigArgs) -> Result<()> {
    info!("Rendering default configuration for {:?}.", args.workflow_type);
    print!("{}", render(args.workflow_type)?);
    Ok(())
}
