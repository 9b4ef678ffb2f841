use super::{Maker, MakerError};
use crate::core::graph::input::Input;
use crate::core::graph::job::Job;
use crate::core::models::stage::{StageKind, StageSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Maker for a single calculation (optimization, frequency, ...).
///
/// The job it builds declares the output fields of its [`StageKind`], so
/// composites can only wire fields the stage will actually publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StageMaker {
    pub kind: StageKind,
    /// Job name; defaults to the kind's name (e.g. "opt", "freq").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: StageSettings,
}

impl StageMaker {
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            name: None,
            settings: StageSettings::default(),
        }
    }

    pub fn opt() -> Self {
        Self::new(StageKind::Optimization)
    }

    pub fn freq() -> Self {
        Self::new(StageKind::Frequency)
    }

    pub fn single_point() -> Self {
        Self::new(StageKind::SinglePoint)
    }

    pub fn force() -> Self {
        Self::new(StageKind::Force)
    }

    pub fn transition_state() -> Self {
        Self::new(StageKind::TransitionState)
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_settings(mut self, settings: StageSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl Maker for StageMaker {
    type Output = Job;

    fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| self.kind.default_name())
    }

    fn make(&self, structure: Input, prev_dir: Option<Input>) -> Result<Job, MakerError> {
        let job = Job::new(
            self.name(),
            self.kind,
            self.settings.clone(),
            structure,
            prev_dir,
        );
        debug!(job = job.name(), id = %job.id(), kind = %self.kind, "Built stage job.");
        Ok(job)
    }
}
