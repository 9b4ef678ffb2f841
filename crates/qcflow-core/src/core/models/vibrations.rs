//! Convergence test and mode-following perturbation used by frequency
//! flattening.
//!
//! Frequencies and modes share indexing: entry 0 is the lowest-frequency mode,
//! and each mode holds one displacement vector per site.

use super::structure::{Structure, StructureError};
use nalgebra::Vector3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum VibrationError {
    #[error("Lowest frequency {0} cm^-1 is negative but no vibrational mode was reported")]
    MissingLowestMode(f64),

    #[error(transparent)]
    Structure(#[from] StructureError),
}

pub fn lowest_frequency(frequencies: &[f64]) -> Option<f64> {
    frequencies.first().copied()
}

/// A structure is converged when its lowest vibrational frequency is
/// non-negative. A structure without vibrational modes is converged.
pub fn is_converged(frequencies: &[f64]) -> bool {
    lowest_frequency(frequencies).is_none_or(|lowest| lowest >= 0.0)
}

/// Displaces every site along the lowest mode by `scale * mode[i]` when the
/// frequencies are not converged, and returns the structure unchanged
/// otherwise.
pub fn perturb_along_lowest_mode(
    structure: &Structure,
    modes: &[Vec<Vector3<f64>>],
    frequencies: &[f64],
    scale: f64,
) -> Result<Structure, VibrationError> {
    let Some(lowest) = lowest_frequency(frequencies).filter(|&f| f < 0.0) else {
        return Ok(structure.clone());
    };
    let mode = modes.first().ok_or(VibrationError::MissingLowestMode(lowest))?;
    Ok(structure.perturbed(mode, scale)?)
}
