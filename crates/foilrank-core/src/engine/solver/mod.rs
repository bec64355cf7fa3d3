pub mod field;
pub mod panel;

use super::error::EngineError;
use std::path::PathBuf;

/// How a finished invocation should be treated by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Zero exit status and the expected artifact exists.
    Clean,
    /// Nonzero exit status, but the expected artifact exists; the run is used.
    Warning,
    /// The expected artifact is missing, whatever the exit status.
    Failed,
}

/// The observable result of one solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub produced_artifact: bool,
    /// Path checked for presence after the process exited.
    pub artifact: PathBuf,
}

impl InvocationResult {
    pub fn outcome(&self) -> InvocationOutcome {
        match (self.produced_artifact, self.exit_code) {
            (false, _) => InvocationOutcome::Failed,
            (true, Some(0)) => InvocationOutcome::Clean,
            (true, _) => InvocationOutcome::Warning,
        }
    }

    /// Short human-readable reason for a failed run.
    pub fn failure_reason(&self) -> String {
        let last_line = |text: &str| {
            text.lines()
                .rev()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
        };
        let status = match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        match last_line(&self.stderr).or_else(|| last_line(&self.stdout)) {
            Some(line) => format!(
                "{} and no artifact at {} ({})",
                status,
                self.artifact.display(),
                line
            ),
            None => format!("{} and no artifact at {}", status, self.artifact.display()),
        }
    }
}

/// Runs one external solver against one target.
pub trait SolverInvoker: Sync {
    type Target: ?Sized;

    /// Runs the solver and reports whether it produced its artifact.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvocationFailure`] if the run could not be attempted at
    /// all, e.g. missing inputs or a process that failed to spawn. A run that exits
    /// without its artifact is not an error here; see [`InvocationResult::outcome`].
    fn invoke(&self, target: &Self::Target) -> Result<InvocationResult, EngineError>;
}
