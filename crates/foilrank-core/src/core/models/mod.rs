//! # Core Models Module
//!
//! Data structures describing what is simulated and what comes back.
//!
//! ## Key Components
//!
//! - [`candidate`] - Airfoil candidates with their reference chord, velocity and geometry
//! - [`condition`] - Flow conditions, angle sweeps and per-case conditions
//! - [`record`] - Run records produced by the extractors and per-candidate polar tables

pub mod candidate;
pub mod condition;
pub mod record;
