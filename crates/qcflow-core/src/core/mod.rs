//! # Core Module
//!
//! The foundation layer: plain data types and the build-time job graph.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Structures, values, stage kinds and vibrational analysis helpers
//! - **Job Graph** ([`graph`]) - Jobs, deferred output references, inputs and flows
//! - **File I/O** ([`io`]) - Reading and writing molecular structure files
//!
//! Everything in this layer is synchronous and side-effect free. Graph values are
//! `Send + Sync` so they can be handed to an execution engine that runs jobs
//! concurrently.

pub mod graph;
pub mod io;
pub mod models;
