use super::config::ConfigError;
use crate::core::graph::flow::{Flow, FlowOutput};
use crate::core::graph::input::Input;
use crate::core::graph::reference::OutputReference;
use crate::core::models::stage::{StageKind, fields};
use crate::makers::stage::StageMaker;
use crate::makers::{Maker, MakerError};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// An optimization followed by a frequency calculation on the optimized
/// geometry. The flow output maps `"opt"` and `"freq"` to the two stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FrequencyOptMaker {
    pub name: String,
    pub opt_maker: StageMaker,
    /// Must build frequency jobs.
    pub freq_maker: StageMaker,
}

impl Default for FrequencyOptMaker {
    fn default() -> Self {
        Self {
            name: "frequency flattening opt".to_string(),
            opt_maker: StageMaker::opt(),
            freq_maker: StageMaker::freq(),
        }
    }
}

/// The flow built by [`FrequencyOptMaker`] together with references to the
/// vibrational analysis of its frequency stage.
#[derive(Debug)]
pub struct FrequencyOptFlow {
    pub flow: Flow,
    pub modes: OutputReference,
    pub frequencies: OutputReference,
}

impl FrequencyOptMaker {
    pub fn validate(&self) -> Result<(), ConfigError> {
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

    /// Builds the flow and also returns references to the frequency stage's
    /// vibrational modes and frequencies.
    #[instrument(skip_all, name = "frequency_opt_maker", fields(flow = %self.name))]
    pub fn build(
        &self,
        structure: Input,
        prev_dir: Option<Input>,
    ) -> Result<FrequencyOptFlow, MakerError> {
        self.validate()?;

        let mut opt = self.opt_maker.make(structure, prev_dir)?;
        opt.append_to_name(" 1");

        let mut freq = self.freq_maker.make(
            opt.output_field(fields::OPTIMIZED_STRUCTURE)?.into(),
            Some(opt.output_field(fields::CALCULATION_DIRECTORY)?.into()),
        )?;
        freq.append_to_name(" 1");

        let modes = freq.output_field(fields::VIBRATIONAL_MODES)?;
        let frequencies = freq.output_field(fields::VIBRATIONAL_FREQUENCIES)?;
        let output = FlowOutput::mapping([("opt", opt.output()), ("freq", freq.output())]);

        let flow = Flow::new(&self.name, vec![opt.into(), freq.into()], output)?;
        info!(jobs = flow.job_count(), "Built optimization + frequency flow.");
        Ok(FrequencyOptFlow {
            flow,
            modes,
            frequencies,
        })
    }
}

impl Maker for FrequencyOptMaker {
    type Output = Flow;

    fn name(&self) -> &str {
        &self.name
    }

    fn make(&self, structure: Input, prev_dir: Option<Input>) -> Result<Flow, MakerError> {
        self.build(structure, prev_dir).map(|built| built.flow)
    }
}
