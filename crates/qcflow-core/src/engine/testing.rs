//! A scripted stage executor for engine and workflow tests.

use super::executor::{ExecutionError, StageExecutor, StageRequest};
use crate::core::models::stage::{StageKind, fields};
use crate::core::models::structure::Structure;
use crate::core::models::value::Value;
use nalgebra::Vector3;
use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::path::PathBuf;

/// One call the executor received.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedCall {
    pub name: String,
    pub structure: Structure,
    pub prev_dir: Option<PathBuf>,
}

/// Echoes the input geometry as the optimized geometry and answers
/// frequency jobs from a queue of scripted spectra. Every mode displaces each
/// site by `mode_displacement`.
pub(crate) struct ScriptedExecutor {
    spectra: RefCell<VecDeque<Vec<f64>>>,
    calls: RefCell<Vec<RecordedCall>>,
    mode_displacement: Vector3<f64>,
    fail_on: Option<String>,
    omit_field: Option<&'static str>,
}

impl ScriptedExecutor {
    pub fn new(spectra: Vec<Vec<f64>>) -> Self {
        Self {
            spectra: RefCell::new(spectra.into()),
            calls: RefCell::new(Vec::new()),
            mode_displacement: Vector3::new(0.0, 0.0, 0.1),
            fail_on: None,
            omit_field: None,
        }
    }

    pub fn with_mode_displacement(mut self, displacement: Vector3<f64>) -> Self {
        self.mode_displacement = displacement;
        self
    }

    /// Makes the job named `name` fail.
    pub fn failing_on(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    /// Drops `field` from every output.
    pub fn omitting(mut self, field: &'static str) -> Self {
        self.omit_field = Some(field);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.borrow().clone()
    }

    pub fn call_names(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c.name.clone()).collect()
    }
}

impl StageExecutor for ScriptedExecutor {
    fn execute(&self, request: &StageRequest<'_>) -> Result<Value, ExecutionError> {
        self.calls.borrow_mut().push(RecordedCall {
            name: request.name.to_string(),
            structure: request.structure.clone(),
            prev_dir: request.prev_dir.map(PathBuf::from),
        });
        if self.fail_on.as_deref() == Some(request.name) {
            return Err(ExecutionError::new("SCF did not converge"));
        }

        let mut output = BTreeMap::new();
        output.insert(
            fields::OPTIMIZED_STRUCTURE.to_string(),
            Value::from(request.structure.clone()),
        );
        output.insert(
            fields::CALCULATION_DIRECTORY.to_string(),
            Value::from(PathBuf::from("/scratch").join(request.name.replace(' ', "_"))),
        );
        output.insert(fields::FINAL_ENERGY.to_string(), Value::from(-76.4));

        match request.kind {
            StageKind::Frequency => {
                let spectrum = self
                    .spectra
                    .borrow_mut()
                    .pop_front()
                    .unwrap_or_else(|| vec![100.0]);
                let mode: Vec<Value> = (0..request.structure.len())
                    .map(|_| Value::from(self.mode_displacement))
                    .collect();
                let modes: Vec<Value> = spectrum.iter().map(|_| Value::List(mode.clone())).collect();
                output.insert(fields::VIBRATIONAL_MODES.to_string(), Value::List(modes));
                output.insert(
                    fields::VIBRATIONAL_FREQUENCIES.to_string(),
                    Value::from(spectrum),
                );
            }
            StageKind::Force => {
                let forces: Vec<Value> = (0..request.structure.len())
                    .map(|_| Value::from(Vector3::<f64>::zeros()))
                    .collect();
                output.insert(fields::FORCES.to_string(), Value::List(forces));
            }
            _ => {}
        }

        if let Some(field) = self.omit_field {
            output.remove(field);
        }
        Ok(Value::Map(output))
    }
}
