use super::error::ResolutionError;
use super::reference::{OutputReference, ReferenceResolver};
use crate::core::models::structure::Structure;
use crate::core::models::value::Value;
use crate::core::models::vibrations::{self, lowest_frequency};
use nalgebra::Vector3;
use serde::Serialize;
use std::path::PathBuf;

/// Something a job consumes: a concrete value, a reference into another
/// job's output, or a transform over other inputs that can only be evaluated
/// once those outputs exist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind")]
pub enum Input {
    Literal {
        value: Value,
    },
    Reference {
        reference: OutputReference,
    },
    /// `true` while the lowest of `frequencies` is negative.
    StillSearching {
        frequencies: Box<Input>,
    },
    /// `structure` displaced along the lowest mode by `scale * mode[i]` when
    /// `frequencies` are unconverged, otherwise `structure` unchanged.
    PerturbAlongLowestMode {
        structure: Box<Input>,
        modes: Box<Input>,
        frequencies: Box<Input>,
        scale: f64,
    },
}

impl Input {
    pub fn literal(value: impl Into<Value>) -> Self {
        Input::Literal {
            value: value.into(),
        }
    }

    pub fn still_searching(frequencies: impl Into<Input>) -> Self {
        Input::StillSearching {
            frequencies: Box::new(frequencies.into()),
        }
    }

    pub fn perturb_along_lowest_mode(
        structure: impl Into<Input>,
        modes: impl Into<Input>,
        frequencies: impl Into<Input>,
        scale: f64,
    ) -> Self {
        Input::PerturbAlongLowestMode {
            structure: Box::new(structure.into()),
            modes: Box::new(modes.into()),
            frequencies: Box::new(frequencies.into()),
            scale,
        }
    }

    pub fn as_reference(&self) -> Option<&OutputReference> {
        match self {
            Input::Reference { reference } => Some(reference),
            _ => None,
        }
    }

    /// Every output reference this input depends on, depth first.
    pub fn references(&self) -> Vec<&OutputReference> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found
    }

    fn collect_references<'a>(&'a self, found: &mut Vec<&'a OutputReference>) {
        match self {
            Input::Literal { .. } => {}
            Input::Reference { reference } => found.push(reference),
            Input::StillSearching { frequencies } => frequencies.collect_references(found),
            Input::PerturbAlongLowestMode {
                structure,
                modes,
                frequencies,
                ..
            } => {
                structure.collect_references(found);
                modes.collect_references(found);
                frequencies.collect_references(found);
            }
        }
    }

    /// Evaluates this input against published outputs.
    pub fn materialize(&self, resolver: &impl ReferenceResolver) -> Result<Value, ResolutionError> {
        match self {
            Input::Literal { value } => Ok(value.clone()),
            Input::Reference { reference } => resolver.resolve(reference).cloned(),
            Input::StillSearching { frequencies } => {
                let frequencies = expect_numbers(&frequencies.materialize(resolver)?)?;
                Ok(Value::Bool(!checked_is_converged(&frequencies)?))
            }
            Input::PerturbAlongLowestMode {
                structure,
                modes,
                frequencies,
                scale,
            } => {
                let structure = expect_structure(structure.materialize(resolver)?)?;
                let frequencies = expect_numbers(&frequencies.materialize(resolver)?)?;
                if checked_is_converged(&frequencies)? {
                    return Ok(Value::Structure(structure));
                }
                let modes = expect_modes(&modes.materialize(resolver)?)?;
                let perturbed = vibrations::perturb_along_lowest_mode(
                    &structure,
                    &modes,
                    &frequencies,
                    *scale,
                )?;
                Ok(Value::Structure(perturbed))
            }
        }
    }
}

impl From<OutputReference> for Input {
    fn from(reference: OutputReference) -> Self {
        Input::Reference { reference }
    }
}

impl From<Structure> for Input {
    fn from(structure: Structure) -> Self {
        Input::literal(structure)
    }
}

impl From<PathBuf> for Input {
    fn from(path: PathBuf) -> Self {
        Input::literal(path)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::Literal { value }
    }
}

fn checked_is_converged(frequencies: &[f64]) -> Result<bool, ResolutionError> {
    match lowest_frequency(frequencies) {
        Some(lowest) if !lowest.is_finite() => Err(ResolutionError::NonFiniteFrequency(lowest)),
        _ => Ok(vibrations::is_converged(frequencies)),
    }
}

fn mismatch(expected: &'static str, found: &Value, context: &str) -> ResolutionError {
    ResolutionError::TypeMismatch {
        expected,
        found: found.kind(),
        context: context.to_string(),
    }
}

fn expect_structure(value: Value) -> Result<Structure, ResolutionError> {
    match value {
        Value::Structure(structure) => Ok(structure),
        other => Err(mismatch("structure", &other, "perturbation input")),
    }
}

fn expect_numbers(value: &Value) -> Result<Vec<f64>, ResolutionError> {
    let items = value
        .as_list()
        .ok_or_else(|| mismatch("list", value, "vibrational frequencies"))?;
    items
        .iter()
        .map(|item| {
            item.as_f64()
                .ok_or_else(|| mismatch("number", item, "vibrational frequencies"))
        })
        .collect()
}

fn expect_modes(value: &Value) -> Result<Vec<Vec<Vector3<f64>>>, ResolutionError> {
    let modes = value
        .as_list()
        .ok_or_else(|| mismatch("list", value, "vibrational modes"))?;
    modes
        .iter()
        .map(|mode| {
            let displacements = mode
                .as_list()
                .ok_or_else(|| mismatch("list", mode, "vibrational mode"))?;
            displacements
                .iter()
                .map(|d| {
                    d.as_vector()
                        .copied()
                        .ok_or_else(|| mismatch("vector", d, "mode displacement"))
                })
                .collect()
        })
        .collect()
}
