use crate::core::graph::flow::{Flow, FlowNode};
use crate::core::graph::input::Input;
use crate::core::models::stage::fields;
use crate::makers::stage::StageMaker;
use crate::makers::{Maker, MakerError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Two chained optimizations: the second starts from the first one's
/// optimized geometry and calculation directory.
///
/// With `opt_maker1` set to `None` the flow degenerates to a single,
/// unsuffixed optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DoubleOptMaker {
    /// Name of the flow.
    pub name: String,
    /// Pre-optimization; defaults to a fresh optimization maker.
    pub opt_maker1: Option<StageMaker>,
    /// Final optimization; defaults to a fresh optimization maker.
    pub opt_maker2: StageMaker,
}

impl Default for DoubleOptMaker {
    fn default() -> Self {
        Self {
            name: "double opt".to_string(),
            opt_maker1: Some(StageMaker::opt()),
            opt_maker2: StageMaker::opt(),
        }
    }
}

impl DoubleOptMaker {
    /// Uses independent copies of `opt_maker` for both stages.
    pub fn from_opt_maker(opt_maker: &StageMaker) -> Self {
        Self {
            opt_maker1: Some(opt_maker.clone()),
            opt_maker2: opt_maker.clone(),
            ..Self::default()
        }
    }

    pub fn without_first_stage(mut self) -> Self {
        self.opt_maker1 = None;
        self
    }
}

impl Maker for DoubleOptMaker {
    type Output = Flow;

    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip_all, name = "double_opt_maker", fields(flow = %self.name))]
    fn make(&self, structure: Input, prev_dir: Option<Input>) -> Result<Flow, MakerError> {
        let mut nodes: Vec<FlowNode> = Vec::with_capacity(2);

        let (structure, prev_dir, staged) = match &self.opt_maker1 {
            Some(first_maker) => {
                let mut opt1 = first_maker.make(structure, prev_dir)?;
                opt1.append_to_name(" 1");
                let next_structure: Input = opt1.output_field(fields::OPTIMIZED_STRUCTURE)?.into();
                let next_prev_dir: Input = opt1.output_field(fields::CALCULATION_DIRECTORY)?.into();
                nodes.push(opt1.into());
                (next_structure, Some(next_prev_dir), true)
            }
            None => (structure, prev_dir, false),
        };

        let mut opt2 = self.opt_maker2.make(structure, prev_dir)?;
        if staged {
            opt2.append_to_name(" 2");
        }
        let output = opt2.output();
        nodes.push(opt2.into());

        info!(jobs = nodes.len(), "Built double optimization flow.");
        Ok(Flow::new(&self.name, nodes, output)?)
    }
}
