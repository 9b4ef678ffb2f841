use super::double_opt::DoubleOptMaker;
use super::flattening::FrequencyFlatteningOptMaker;
use super::frequency_opt::FrequencyOptMaker;
use crate::core::graph::flow::Flow;
use crate::core::graph::input::Input;
use crate::makers::stage::StageMaker;
use crate::makers::{Maker, MakerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },

    #[error("Failed to parse workflow configuration: {0}")]
    Parse(String),

    #[error("Failed to serialize workflow configuration: {0}")]
    Serialize(String),
}

#[derive(Default)]
pub struct FrequencyFlatteningOptMakerBuilder {
    name: Option<String>,
    opt_maker: Option<StageMaker>,
    freq_maker: Option<StageMaker>,
    scale: Option<f64>,
    max_iterations: Option<usize>,
}

impl FrequencyFlatteningOptMakerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn opt_maker(mut self, maker: StageMaker) -> Self {
        self.opt_maker = Some(maker);
        self
    }
    pub fn freq_maker(mut self, maker: StageMaker) -> Self {
        self.freq_maker = Some(maker);
        self
    }
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }
    pub fn max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    /// Fills unset parameters from [`FrequencyFlatteningOptMaker::default`]
    /// and validates the result.
    pub fn build(self) -> Result<FrequencyFlatteningOptMaker, ConfigError> {
        let defaults = FrequencyFlatteningOptMaker::default();
        let maker = FrequencyFlatteningOptMaker {
            name: self.name.unwrap_or(defaults.name),
            opt_maker: self.opt_maker.unwrap_or(defaults.opt_maker),
            freq_maker: self.freq_maker.unwrap_or(defaults.freq_maker),
            scale: self.scale.unwrap_or(defaults.scale),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
        };
        maker.validate()?;
        Ok(maker)
    }
}

/// A stored workflow definition: which composite to build and its parameters.
///
/// ```toml
/// type = "frequency-flattening-opt"
/// max-iterations = 5
/// scale = 0.5
///
/// [freq-maker]
/// kind = "frequency"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkflowConfig {
    DoubleOpt(DoubleOptMaker),
    FrequencyOpt(FrequencyOptMaker),
    FrequencyFlatteningOpt(FrequencyFlatteningOptMaker),
}

impl WorkflowConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// The `type` tag of this configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DoubleOpt(_) => "double-opt",
            Self::FrequencyOpt(_) => "frequency-opt",
            Self::FrequencyFlatteningOpt(_) => "frequency-flattening-opt",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::DoubleOpt(maker) => maker.name(),
            Self::FrequencyOpt(maker) => maker.name(),
            Self::FrequencyFlatteningOpt(maker) => maker.name(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::DoubleOpt(_) => Ok(()),
            Self::FrequencyOpt(maker) => maker.validate(),
            Self::FrequencyFlatteningOpt(maker) => maker.validate(),
        }
    }

    pub fn make(&self, structure: Input, prev_dir: Option<Input>) -> Result<Flow, MakerError> {
        match self {
            Self::DoubleOpt(maker) => maker.make(structure, prev_dir),
            Self::FrequencyOpt(maker) => maker.make(structure, prev_dir),
            Self::FrequencyFlatteningOpt(maker) => maker.make(structure, prev_dir),
        }
    }
}
