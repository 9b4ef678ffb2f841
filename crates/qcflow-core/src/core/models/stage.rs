use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Output field names declared by stage jobs.
pub mod fields {
    pub const OPTIMIZED_STRUCTURE: &str = "optimized_structure";
    pub const CALCULATION_DIRECTORY: &str = "calculation_directory";
    pub const FINAL_ENERGY: &str = "final_energy";
    pub const VIBRATIONAL_MODES: &str = "vibrational_modes";
    pub const VIBRATIONAL_FREQUENCIES: &str = "vibrational_frequencies";
    pub const FORCES: &str = "forces";
}

const COMMON_FIELDS: &[&str] = &[
    fields::OPTIMIZED_STRUCTURE,
    fields::CALCULATION_DIRECTORY,
    fields::FINAL_ENERGY,
];

const FREQUENCY_FIELDS: &[&str] = &[
    fields::OPTIMIZED_STRUCTURE,
    fields::CALCULATION_DIRECTORY,
    fields::FINAL_ENERGY,
    fields::VIBRATIONAL_MODES,
    fields::VIBRATIONAL_FREQUENCIES,
];

const FORCE_FIELDS: &[&str] = &[
    fields::OPTIMIZED_STRUCTURE,
    fields::CALCULATION_DIRECTORY,
    fields::FINAL_ENERGY,
    fields::FORCES,
];

/// The kind of calculation a stage job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    Optimization,
    Frequency,
    SinglePoint,
    Force,
    TransitionState,
}

impl StageKind {
    /// The default job name for makers of this kind.
    pub fn default_name(&self) -> &'static str {
        match self {
            StageKind::Optimization => "opt",
            StageKind::Frequency => "freq",
            StageKind::SinglePoint => "single point",
            StageKind::Force => "force",
            StageKind::TransitionState => "transition state",
        }
    }

    pub fn output_schema(&self) -> OutputSchema {
        match self {
            StageKind::Frequency => OutputSchema(FREQUENCY_FIELDS),
            StageKind::Force => OutputSchema(FORCE_FIELDS),
            StageKind::Optimization | StageKind::SinglePoint | StageKind::TransitionState => {
                OutputSchema(COMMON_FIELDS)
            }
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

/// The set of top-level fields a job promises to publish once it has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct OutputSchema(&'static [&'static str]);

impl OutputSchema {
    pub fn declares(&self, field: &str) -> bool {
        self.0.iter().any(|declared| *declared == field)
    }

    pub fn fields(&self) -> &'static [&'static str] {
        self.0
    }
}

/// Solver settings carried by a stage maker and snapshotted into each job.
///
/// The graph layer treats these as opaque; only the stage executor
/// interprets them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct StageSettings {
    pub method: Option<String>,
    pub basis_set: Option<String>,
    pub max_scf_cycles: Option<u32>,
    pub geom_opt_max_cycles: Option<u32>,
    pub overrides: BTreeMap<String, String>,
}
