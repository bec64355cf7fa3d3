use super::{InvocationResult, SolverInvoker};
use crate::engine::case::{CaseHandle, GEOMETRY_SURFACE};
use crate::engine::config::{FieldSolverConfig, PathMapping};
use crate::engine::error::EngineError;
use crate::engine::process::{ProcessRunner, ProcessSpec};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

pub const MESH_ARTIFACT: &str = "constant/polyMesh";

/// Which phases of the standard plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeshMode {
    /// Mesh, refine, solve and optionally export fields.
    #[default]
    Full,
    /// Mesh and refine only, to inspect meshes before committing solver time.
    MeshOnly,
}

/// One named step of a field-solver run.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    pub name: String,
    pub command: String,
    /// Paths relative to the case directory that must exist before the plan launches.
    pub required_inputs: Vec<PathBuf>,
    /// Log file relative to the case directory receiving both output streams.
    pub log_file: Option<String>,
}

impl Phase {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            required_inputs: Vec::new(),
            log_file: None,
        }
    }

    pub fn requires(mut self, path: impl Into<PathBuf>) -> Self {
        self.required_inputs.push(path.into());
        self
    }

    /// Redirects the phase's output to `log.<name>`.
    pub fn logged(mut self) -> Self {
        self.log_file = Some(format!("log.{}", self.name));
        self
    }

    fn shell_fragment(&self) -> String {
        match &self.log_file {
            Some(log) => format!("{} > {} 2>&1", self.command, log),
            None => self.command.clone(),
        }
    }
}

/// An ordered list of phases composed into one shell command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PhasePlan {
    phases: Vec<Phase>,
}

impl PhasePlan {
    pub fn new(phases: Vec<Phase>) -> Self {
        Self { phases }
    }

    /// The mesh → refine → solve plan, with an optional field export after solving.
    pub fn standard(solver: &str, mode: MeshMode, export_fields: bool) -> Self {
        let mut phases = vec![
            Phase::new("blockMesh", "blockMesh")
                .requires("system/blockMeshDict")
                .logged(),
            Phase::new("snappyHexMesh", "snappyHexMesh -overwrite")
                .requires("system/snappyHexMeshDict")
                .requires(GEOMETRY_SURFACE)
                .logged(),
        ];
        if mode == MeshMode::Full {
            phases.push(
                Phase::new(solver, solver)
                    .requires("0/U")
                    .requires("0/p")
                    .requires("system/controlDict")
                    .logged(),
            );
            if export_fields {
                phases.push(Phase::new("foamToVTK", "foamToVTK").logged());
            }
        }
        Self { phases }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Required inputs absent from `case_dir`, in plan order.
    pub fn missing_inputs(&self, case_dir: &Path) -> Vec<PathBuf> {
        self.phases
            .iter()
            .flat_map(|p| p.required_inputs.iter())
            .filter(|rel| !case_dir.join(rel).exists())
            .cloned()
            .collect()
    }

    /// Composes `source "<env>" && cd "<case>" && p1 > log.p1 2>&1 && ...`.
    pub fn compose(&self, env_script: &str, case_dir: &str) -> String {
        let mut parts = Vec::with_capacity(self.phases.len() + 2);
        if !env_script.is_empty() {
            parts.push(format!("source {}", shell_quote(env_script)));
        }
        parts.push(format!("cd {}", shell_quote(case_dir)));
        parts.extend(self.phases.iter().map(Phase::shell_fragment));
        parts.join(" && ")
    }
}

fn shell_quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Converts a host path into the form the launcher's shell sees.
///
/// Paths under the mapping's host prefix are re-rooted at the guest prefix; every other
/// path is passed through with forward slashes.
pub fn map_path(path: &Path, mapping: Option<&PathMapping>) -> String {
    let to_posix = |p: &Path| {
        p.components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    };

    if let Some(mapping) = mapping {
        if let Ok(rel) = path.strip_prefix(&mapping.host_prefix) {
            let guest = mapping.guest_prefix.trim_end_matches('/');
            let rel = to_posix(rel);
            return if rel.is_empty() {
                guest.to_string()
            } else {
                format!("{}/{}", guest, rel)
            };
        }
    }
    path.to_string_lossy().replace('\\', "/")
}

/// Runs a phase plan inside one case directory through the configured launcher.
pub struct FieldSolver<'r> {
    runner: &'r dyn ProcessRunner,
    config: FieldSolverConfig,
    plan: PhasePlan,
    artifact: PathBuf,
}

impl<'r> FieldSolver<'r> {
    pub fn new(
        runner: &'r dyn ProcessRunner,
        config: FieldSolverConfig,
        mode: MeshMode,
        export_fields: bool,
    ) -> Self {
        let plan = PhasePlan::standard(&config.solver, mode, export_fields);
        let artifact = match mode {
            MeshMode::Full => config.coefficient_file.clone(),
            MeshMode::MeshOnly => PathBuf::from(MESH_ARTIFACT),
        };
        Self {
            runner,
            config,
            plan,
            artifact,
        }
    }

    pub fn with_plan(mut self, plan: PhasePlan) -> Self {
        self.plan = plan;
        self
    }

    pub fn plan(&self) -> &PhasePlan {
        &self.plan
    }

    pub fn command_for(&self, case_dir: &Path) -> String {
        let guest = map_path(case_dir, self.config.path_mapping.as_ref());
        self.plan.compose(&self.config.env_script, &guest)
    }
}

/// Deletes an artifact left by an earlier run so that only this run can produce it.
fn remove_stale(path: &Path) -> Result<(), EngineError> {
    let removed = if path.is_dir() {
        fs::remove_dir_all(path)
    } else if path.exists() {
        fs::remove_file(path)
    } else {
        return Ok(());
    };
    trace!(path = %path.display(), "Removing stale solver artifact.");
    removed.map_err(|e| EngineError::io(path, e))
}

impl SolverInvoker for FieldSolver<'_> {
    type Target = CaseHandle;

    fn invoke(&self, case: &CaseHandle) -> Result<InvocationResult, EngineError> {
        let missing = self.plan.missing_inputs(&case.dir);
        if !missing.is_empty() {
            let list: Vec<String> = missing.iter().map(|p| p.display().to_string()).collect();
            return Err(EngineError::InvocationFailure {
                case: case.label(),
                reason: format!("missing required inputs: {}", list.join(", ")),
            });
        }

        let artifact = case.dir.join(&self.artifact);
        remove_stale(&artifact)?;

        let command = self.command_for(&case.dir);
        let spec = ProcessSpec::new(&self.config.launcher.program)
            .args(self.config.launcher.args.iter().cloned())
            .arg(command)
            .cwd(&case.dir);

        debug!(case = %case.label(), command = %spec.args.last().map(String::as_str).unwrap_or(""), "Running field solver.");
        let output = self
            .runner
            .run(&spec)
            .map_err(|e| EngineError::InvocationFailure {
                case: case.label(),
                reason: format!("could not start {}: {}", spec.program, e),
            })?;

        Ok(InvocationResult {
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            produced_artifact: artifact.exists(),
            artifact,
        })
    }
}
