//! Reading and writing molecular structures.
//!
//! Workflows only need a [`Structure`](crate::core::models::structure::Structure)
//! to start from; this module provides the trait-based file interface and the
//! XYZ format used to supply one.

pub mod traits;
pub mod xyz;
