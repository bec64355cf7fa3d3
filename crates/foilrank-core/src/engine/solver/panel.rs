use super::{InvocationResult, SolverInvoker};
use crate::core::io::dat::DatFile;
use crate::core::io::polar::polar_file_name;
use crate::core::models::candidate::Candidate;
use crate::core::models::condition::{AngleSweep, format_angle};
use crate::engine::config::{LineEnding, PanelSolverConfig};
use crate::engine::error::EngineError;
use crate::engine::process::{ProcessRunner, ProcessSpec};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Builds the interactive command script that drives a full viscous angle sweep.
///
/// Blank lines answer the solver's optional prompts; the blank after the polar file name
/// declines the dump file.
pub fn panel_script(
    geometry_file: &str,
    polar_file: &str,
    reynolds: f64,
    mach: f64,
    iterations: u32,
    sweep: &AngleSweep,
    line_ending: LineEnding,
) -> String {
    let lines = [
        format!("LOAD {}", geometry_file),
        String::new(),
        "PANE".to_string(),
        String::new(),
        "PLOP".to_string(),
        "G".to_string(),
        String::new(),
        "OPER".to_string(),
        format!("VISC {}", reynolds as i64),
        format!("MACH {}", format_angle(mach)),
        format!("ITER {}", iterations),
        "PACC".to_string(),
        polar_file.to_string(),
        String::new(),
        format!(
            "ASEQ {} {} {}",
            format_angle(sweep.start),
            format_angle(sweep.end),
            format_angle(sweep.step)
        ),
        "QUIT".to_string(),
        String::new(),
    ];
    lines.join(line_ending.as_str())
}

/// Screens one candidate per invocation with the panel solver.
///
/// The candidate's coordinates are written next to the polar file in the work directory,
/// and the solver runs there so the script only carries bare file names.
pub struct PanelSolver<'r> {
    runner: &'r dyn ProcessRunner,
    config: PanelSolverConfig,
    work_dir: PathBuf,
    reynolds: f64,
    mach: f64,
}

impl<'r> PanelSolver<'r> {
    pub fn new(
        runner: &'r dyn ProcessRunner,
        config: PanelSolverConfig,
        work_dir: impl Into<PathBuf>,
        reynolds: f64,
        mach: f64,
    ) -> Self {
        Self {
            runner,
            config,
            work_dir: work_dir.into(),
            reynolds,
            mach,
        }
    }

    pub fn polar_path(&self, candidate: &str) -> PathBuf {
        self.work_dir.join(polar_file_name(candidate, self.reynolds))
    }

    fn prepare(&self, candidate: &Candidate) -> Result<(String, PathBuf), EngineError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| EngineError::io(&self.work_dir, e))?;

        let geometry_file = format!("{}.dat", candidate.name());
        let geometry_path = self.work_dir.join(&geometry_file);
        DatFile::write_to_path(candidate.name(), candidate.geometry(), &geometry_path)
            .map_err(|e| EngineError::io(&geometry_path, e))?;

        let polar = self.polar_path(candidate.name());
        remove_stale(&polar)?;
        Ok((geometry_file, polar))
    }
}

fn remove_stale(path: &Path) -> Result<(), EngineError> {
    if path.exists() {
        trace!(path = %path.display(), "Removing stale polar file.");
        fs::remove_file(path).map_err(|e| EngineError::io(path, e))?;
    }
    Ok(())
}

impl SolverInvoker for PanelSolver<'_> {
    type Target = Candidate;

    fn invoke(&self, candidate: &Candidate) -> Result<InvocationResult, EngineError> {
        let (geometry_file, polar) = self.prepare(candidate)?;
        let polar_name = polar
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let script = panel_script(
            &geometry_file,
            &polar_name,
            self.reynolds,
            self.mach,
            self.config.iterations,
            &self.config.sweep,
            self.config.line_ending,
        );
        let spec = ProcessSpec::new(self.config.executable.to_string_lossy())
            .cwd(&self.work_dir)
            .stdin(script);

        debug!(candidate = candidate.name(), reynolds = self.reynolds as i64, "Running panel solver.");
        let output = self
            .runner
            .run(&spec)
            .map_err(|e| EngineError::InvocationFailure {
                case: candidate.name().to_string(),
                reason: format!("could not start {}: {}", spec.program, e),
            })?;

        Ok(InvocationResult {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            produced_artifact: polar.is_file(),
            artifact: polar,
        })
    }
}
