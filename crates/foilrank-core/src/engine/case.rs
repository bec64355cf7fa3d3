use super::error::EngineError;
use crate::core::io::stl;
use crate::core::models::candidate::Candidate;
use crate::core::models::condition::{Condition, format_angle};
use nalgebra::Vector3;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Paths every case template must provide, relative to the template root.
pub const REQUIRED_TEMPLATE_PATHS: [&str; 6] = [
    "0/U",
    "0/p",
    "constant/transportProperties",
    "system/controlDict",
    "system/fvSchemes",
    "system/fvSolution",
];

pub const ANGLE_MARKER: &str = "constant/aoa_degrees.txt";
pub const GEOMETRY_SURFACE: &str = "constant/triSurface/airfoil.stl";
pub const VELOCITY_FIELD: &str = "0/U";

static STAGING_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A set of cases sharing one template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFamily {
    Sweep,
    Detailed,
}

impl CaseFamily {
    pub fn name(self) -> &'static str {
        match self {
            Self::Sweep => "sweep",
            Self::Detailed => "detailed",
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Sweep => "",
            Self::Detailed => "_detailed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseHandle {
    pub candidate: String,
    pub alpha: f64,
    pub dir: PathBuf,
    /// Whether this call materialized the directory.
    pub created: bool,
}

impl CaseHandle {
    pub fn label(&self) -> String {
        case_label(&self.candidate, self.alpha)
    }
}

/// `<candidate>@<angle>`, the key used for a case in logs and failure reports.
pub fn case_label(candidate: &str, alpha: f64) -> String {
    format!("{}@{}", candidate, format_angle(alpha))
}

/// Owns the lifetime of one family's case directories.
///
/// `ensure_case` is idempotent and first-writer-wins: a case is populated in a private
/// staging directory and renamed into place, so the final path is either absent or
/// complete.
#[derive(Debug, Clone)]
pub struct CaseManager {
    family: CaseFamily,
    template_dir: PathBuf,
    root: PathBuf,
    overwrite: bool,
    extrusion_thickness: f64,
}

impl CaseManager {
    pub fn new(family: CaseFamily, template_dir: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self {
            family,
            template_dir: template_dir.into(),
            root: root.into(),
            overwrite: false,
            extrusion_thickness: 0.01,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_extrusion_thickness(mut self, thickness: f64) -> Self {
        self.extrusion_thickness = thickness;
        self
    }

    pub fn family(&self) -> CaseFamily {
        self.family
    }

    pub fn template_dir(&self) -> &Path {
        &self.template_dir
    }

    /// Checks the template for every required sub-path.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] listing every missing path.
    pub fn validate_template(&self) -> Result<(), EngineError> {
        let missing: Vec<String> = REQUIRED_TEMPLATE_PATHS
            .iter()
            .map(|rel| self.template_dir.join(rel))
            .filter(|path| !path.exists())
            .map(|path| path.display().to_string())
            .collect();

        if missing.is_empty() {
            debug!(family = self.family.name(), template = %self.template_dir.display(), "Template is complete.");
            return Ok(());
        }

        Err(EngineError::Configuration {
            family: self.family.name().to_string(),
            missing,
            remediation: format!(
                "Set up {} as a valid field-solver case before running the {} stage.",
                self.template_dir.display(),
                self.family.name()
            ),
        })
    }

    pub fn case_dir(&self, candidate: &str, alpha: f64) -> PathBuf {
        self.root
            .join(format!("{}{}", candidate, self.family.suffix()))
            .join(format!("alpha_{}", format_angle(alpha)))
    }

    /// Materializes the case for `(candidate, condition)` if it does not exist yet.
    ///
    /// An existing case is returned untouched unless the manager was built with
    /// `overwrite`, in which case geometry, angle marker and inlet velocity are re-applied.
    pub fn ensure_case(
        &self,
        candidate: &Candidate,
        condition: &Condition,
    ) -> Result<CaseHandle, EngineError> {
        let dir = self.case_dir(candidate.name(), condition.alpha_deg);
        let mut handle = CaseHandle {
            candidate: candidate.name().to_string(),
            alpha: condition.alpha_deg,
            dir: dir.clone(),
            created: false,
        };

        if dir.exists() {
            if self.overwrite {
                info!(case = %handle.label(), "Re-applying condition to existing case.");
                self.populate(&dir, candidate, condition)?;
            } else {
                debug!(case = %handle.label(), "Case already exists; leaving it untouched.");
            }
            return Ok(handle);
        }

        let parent = dir
            .parent()
            .ok_or_else(|| EngineError::Internal(format!("case path {} has no parent", dir.display())))?;
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;

        let staging = self.staging_dir(&dir);
        let staged = copy_dir(&self.template_dir, &staging)
            .and_then(|_| self.populate(&staging, candidate, condition));
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        match fs::rename(&staging, &dir) {
            Ok(()) => {
                info!(case = %handle.label(), dir = %dir.display(), "Created case.");
                handle.created = true;
                Ok(handle)
            }
            Err(_) if dir.exists() => {
                debug!(case = %handle.label(), "Another writer created the case first.");
                let _ = fs::remove_dir_all(&staging);
                Ok(handle)
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&staging);
                Err(EngineError::io(&dir, e))
            }
        }
    }

    fn staging_dir(&self, dir: &Path) -> PathBuf {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unique = STAGING_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.with_file_name(format!(".{}.staging-{}-{}", name, std::process::id(), unique))
    }

    fn populate(&self, case: &Path, candidate: &Candidate, condition: &Condition) -> Result<(), EngineError> {
        let surface = case.join(GEOMETRY_SURFACE);
        stl::write_extruded_stl(&surface, "airfoil", &candidate.scaled_geometry(), self.extrusion_thickness)
            .map_err(|e| EngineError::io(&surface, e))?;

        let marker = case.join(ANGLE_MARKER);
        if let Some(parent) = marker.parent() {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
        fs::write(&marker, format!("{}\n", condition.angle_label()))
            .map_err(|e| EngineError::io(&marker, e))?;

        let velocity = case.join(VELOCITY_FIELD);
        if !velocity.is_file() {
            warn!(case = %case.display(), "No velocity field found; inlet velocity not updated.");
            return Ok(());
        }
        let text = fs::read_to_string(&velocity).map_err(|e| EngineError::io(&velocity, e))?;
        match rewrite_inlet_velocity(&text, &condition.inlet_velocity()) {
            Some(updated) => fs::write(&velocity, updated).map_err(|e| EngineError::io(&velocity, e)),
            None => {
                warn!(case = %case.display(), "Inlet block has no uniform value entry; velocity not updated.");
                Ok(())
            }
        }
    }
}

/// Replaces the first `value ... uniform ...` line inside the `inlet` block of a velocity
/// field. Returns `None` if no such line exists.
pub fn rewrite_inlet_velocity(text: &str, u: &Vector3<f64>) -> Option<String> {
    let mut inside_inlet = false;
    let mut updated = false;
    let mut out: Vec<String> = Vec::new();

    for line in text.lines() {
        let stripped = line.trim();
        if stripped == "inlet" {
            inside_inlet = true;
        } else if inside_inlet && stripped.starts_with('}') {
            inside_inlet = false;
        } else if inside_inlet && !updated && stripped.contains("value") && stripped.contains("uniform") {
            let indent = &line[..line.len() - line.trim_start().len()];
            out.push(format!(
                "{}value       uniform ({:.6} {:.6} {:.6});",
                indent, u.x, u.y, u.z
            ));
            updated = true;
            continue;
        }
        out.push(line.to_string());
    }

    updated.then(|| out.join("\n") + "\n")
}

fn copy_dir(src: &Path, dst: &Path) -> Result<(), EngineError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| EngineError::Io {
            path: src.display().to_string(),
            source: e.into(),
        })?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| EngineError::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| EngineError::io(&target, e))?;
        }
    }
    Ok(())
}
