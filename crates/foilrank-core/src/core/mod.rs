//! # Core Module
//!
//! Stateless building blocks for the airfoil selection pipeline.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Candidates, flow conditions, run records and polar tables
//! - **File I/O** ([`io`]) - Solver output parsers, geometry formats and CSV tables
//! - **Analysis** ([`analysis`]) - Derived metrics, normalization and weighted scoring
//!
//! Everything in this module is a pure function of its inputs or a thin wrapper over a
//! file. Orchestration and side effects on case directories live in [`crate::engine`].

pub mod analysis;
pub mod io;
pub mod models;
