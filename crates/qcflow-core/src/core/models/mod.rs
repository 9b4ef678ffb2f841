//! # Core Models Module
//!
//! Plain data types shared by the graph, the makers and the execution engine.
//!
//! ## Key Components
//!
//! - [`structure`] - Molecular geometry (`Structure`, `Site`) and site translation
//! - [`value`] - Concrete values that flow between jobs once they have run
//! - [`stage`] - Stage kinds, their declared output fields and solver settings
//! - [`vibrations`] - Frequency convergence test and lowest-mode perturbation
//! - [`ids`] - Job identifiers

pub mod ids;
pub mod stage;
pub mod structure;
pub mod value;
pub mod vibrations;
