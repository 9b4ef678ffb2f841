use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StructureError {
    #[error("Site index {index} is out of bounds for a structure with {len} site(s)")]
    SiteIndexOutOfBounds { index: usize, len: usize },

    #[error("Expected {sites} displacement vector(s), one per site, but got {displacements}")]
    DisplacementCountMismatch { sites: usize, displacements: usize },
}

/// A single atomic site of a molecular structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    /// The element symbol (e.g., "C", "O", "H").
    pub species: String,
    /// Cartesian coordinates in Angstroms.
    pub position: Point3<f64>,
}

impl Site {
    pub fn new(species: &str, position: Point3<f64>) -> Self {
        Self {
            species: species.to_string(),
            position,
        }
    }
}

/// A snapshot of a molecular geometry.
///
/// Workflows treat a `Structure` handed to them as read-only input. Every
/// geometric perturbation produces a new value, so the caller's copy is never
/// observed changing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    sites: Vec<Site>,
    charge: i32,
    spin_multiplicity: u32,
}

impl Structure {
    /// Creates a neutral singlet structure from its sites.
    pub fn new(sites: Vec<Site>) -> Self {
        Self {
            sites,
            charge: 0,
            spin_multiplicity: 1,
        }
    }

    pub fn with_charge_and_multiplicity(mut self, charge: i32, spin_multiplicity: u32) -> Self {
        self.charge = charge;
        self.spin_multiplicity = spin_multiplicity;
        self
    }

    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn spin_multiplicity(&self) -> u32 {
        self.spin_multiplicity
    }

    pub fn positions(&self) -> impl Iterator<Item = &Point3<f64>> {
        self.sites.iter().map(|site| &site.position)
    }

    /// Translates the selected sites by `vector`.
    ///
    /// All indices are checked before any site moves, so a failed call leaves
    /// the structure untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::SiteIndexOutOfBounds`] if any index does not
    /// address a site.
    pub fn translate_sites(
        &mut self,
        indices: &[usize],
        vector: &Vector3<f64>,
    ) -> Result<(), StructureError> {
        let len = self.sites.len();
        if let Some(&index) = indices.iter().find(|&&index| index >= len) {
            return Err(StructureError::SiteIndexOutOfBounds { index, len });
        }
        for &index in indices {
            self.sites[index].position += vector;
        }
        Ok(())
    }

    /// Returns a copy of this structure with site `i` translated by
    /// `scale * displacements[i]`.
    ///
    /// # Errors
    ///
    /// Returns [`StructureError::DisplacementCountMismatch`] unless there is
    /// exactly one displacement per site.
    pub fn perturbed(
        &self,
        displacements: &[Vector3<f64>],
        scale: f64,
    ) -> Result<Structure, StructureError> {
        if displacements.len() != self.sites.len() {
            return Err(StructureError::DisplacementCountMismatch {
                sites: self.sites.len(),
                displacements: displacements.len(),
            });
        }
        let mut perturbed = self.clone();
        for (index, displacement) in displacements.iter().enumerate() {
            perturbed.translate_sites(&[index], &(displacement * scale))?;
        }
        Ok(perturbed)
    }
}
