//! # FoilRank Core Library
//!
//! Run orchestration and multi-criteria scoring for selecting an airfoil section from a
//! set of candidates, using a panel solver for fast screening and a field solver for
//! verification.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture so that numerics, orchestration and
//! user-facing procedures stay separately testable.
//!
//! - **[`core`]: The Foundation.** Immutable data models (`Candidate`, `RunRecord`,
//!   `PolarTable`), file formats produced or consumed by the external solvers, and the
//!   pure analysis functions (stall detection, lift-curve regression, normalization and
//!   weighted scoring).
//!
//! - **[`engine`]: The Orchestration Layer.** Case directory lifecycle, solver invocation
//!   through a mockable process runner, configuration, error taxonomy and progress
//!   reporting.
//!
//! - **[`workflows`]: The Public API.** Complete procedures that tie the engine and core
//!   together: panel-solver screening and field-solver verification with an optional
//!   detailed pressure-distribution stage.

pub mod core;
pub mod engine;
pub mod workflows;
