//! # Engine Module
//!
//! Orchestration layer between the pure core and the workflows.
//!
//! - **Configuration** ([`config`]) - `PipelineConfig` and its validating builder
//! - **Case Lifecycle** ([`case`]) - template validation and idempotent case creation
//! - **Process Execution** ([`process`]) - the mockable `ProcessRunner` seam
//! - **Solver Invocation** ([`solver`]) - panel and field solvers with artifact-based success
//! - **Progress Monitoring** ([`progress`]) - callbacks for user-facing progress
//! - **Error Handling** ([`error`]) - `EngineError`, the taxonomy every workflow returns

pub mod case;
pub mod config;
pub mod error;
pub mod process;
pub mod progress;
pub mod solver;
