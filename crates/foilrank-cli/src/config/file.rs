use crate::error::{CliError, Result};
use foilrank::engine::config::LineEnding;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileFlowConfig {
    pub density: Option<f64>,
    pub dynamic_viscosity: Option<f64>,
    pub velocity: Option<f64>,
    pub chord: Option<f64>,
    pub mach: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileSweepConfig {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub step: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileAnalysisConfig {
    pub cruise_min: Option<f64>,
    pub cruise_max: Option<f64>,
    pub window_min: Option<f64>,
    pub stall_margin: Option<f64>,
    pub fallback_upper: Option<f64>,
    pub residual_threshold: Option<f64>,
    pub min_points: Option<usize>,
    pub cd_max: Option<f64>,
    pub cl_abs_max: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileStabilityWeights {
    pub stall_angle: Option<f64>,
    pub post_stall_drop: Option<f64>,
    pub slope_deviation: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEfficiencyWeights {
    pub cruise_cl_cd: Option<f64>,
    pub min_cd: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileManeuverabilityWeights {
    pub slope: Option<f64>,
    pub cl_max: Option<f64>,
    pub load_index: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileCompositeWeights {
    pub stability: Option<f64>,
    pub efficiency: Option<f64>,
    pub maneuverability: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct FileDetailedWeights {
    pub stability: Option<f64>,
    pub efficiency: Option<f64>,
    pub maneuverability: Option<f64>,
    pub detail: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileScoringConfig {
    pub slope_target: Option<f64>,
    pub stability: Option<FileStabilityWeights>,
    pub efficiency: Option<FileEfficiencyWeights>,
    pub maneuverability: Option<FileManeuverabilityWeights>,
    pub composite: Option<FileCompositeWeights>,
    pub detailed: Option<FileDetailedWeights>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileLineEnding {
    Lf,
    Crlf,
}

impl From<FileLineEnding> for LineEnding {
    fn from(value: FileLineEnding) -> Self {
        match value {
            FileLineEnding::Lf => LineEnding::Lf,
            FileLineEnding::Crlf => LineEnding::CrLf,
        }
    }
}

impl std::str::FromStr for FileLineEnding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lf" => Ok(Self::Lf),
            "crlf" => Ok(Self::Crlf),
            other => Err(format!("expected 'lf' or 'crlf', got '{}'", other)),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePanelSolverConfig {
    pub executable: Option<PathBuf>,
    pub iterations: Option<u32>,
    pub line_ending: Option<FileLineEnding>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePathMapping {
    pub host_prefix: PathBuf,
    pub guest_prefix: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileFieldSolverConfig {
    pub template_dir: Option<PathBuf>,
    pub cases_root: Option<PathBuf>,
    pub angles: Option<Vec<f64>>,
    pub env_script: Option<String>,
    pub solver: Option<String>,
    /// Program followed by its leading arguments, e.g. `["wsl", "bash", "-lc"]`.
    pub launcher: Option<Vec<String>>,
    pub path_mapping: Option<FilePathMapping>,
    pub coefficient_file: Option<PathBuf>,
    pub extrusion_thickness: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDetailedConfig {
    pub enabled: Option<bool>,
    pub template_dir: Option<PathBuf>,
    pub angles: Option<Vec<f64>>,
    pub export_fields: Option<bool>,
    pub surfaces_dir: Option<PathBuf>,
    pub surface_name: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileOutputConfig {
    pub raw_dir: Option<PathBuf>,
    pub processed_dir: Option<PathBuf>,
    pub results_file: Option<String>,
    pub metrics_file: Option<String>,
    pub scores_file: Option<String>,
    pub pressure_file: Option<String>,
    pub detailed_scores_file: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub candidates: Option<Vec<String>>,
    pub geometry_dir: Option<PathBuf>,
    pub flow: Option<FileFlowConfig>,
    pub sweep: Option<FileSweepConfig>,
    pub analysis: Option<FileAnalysisConfig>,
    pub scoring: Option<FileScoringConfig>,
    pub panel_solver: Option<FilePanelSolverConfig>,
    pub field_solver: Option<FileFieldSolverConfig>,
    pub detailed: Option<FileDetailedConfig>,
    pub output: Option<FileOutputConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::ConfigFile {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document_deserializes() {
        let config = FileConfig::from_toml(
            r#"
            candidates = ["NACA2412", "E168"]
            geometry-dir = "shapes"

            [flow]
            velocity = 25.0
            dynamic-viscosity = 1.81e-5

            [sweep]
            start = -2.0
            end = 12.0
            step = 1.0

            [analysis]
            cruise-min = 3.0
            residual-threshold = 0.5

            [scoring]
            slope-target = 0.11

            [scoring.composite]
            stability = 0.5
            efficiency = 0.25
            maneuverability = 0.25

            [panel-solver]
            executable = "xfoil/xfoil.exe"
            line-ending = "crlf"

            [field-solver]
            angles = [0.0, 4.0, 8.0]
            launcher = ["wsl", "bash", "-lc"]

            [field-solver.path-mapping]
            host-prefix = "C:/work"
            guest-prefix = "/mnt/c/work"

            [detailed]
            enabled = false

            [output]
            processed-dir = "out"
            "#,
        )
        .unwrap();

        assert_eq!(config.candidates.unwrap(), vec!["NACA2412", "E168"]);
        assert_eq!(config.flow.unwrap().velocity, Some(25.0));
        assert_eq!(config.sweep.unwrap().step, Some(1.0));
        assert_eq!(config.analysis.unwrap().cruise_min, Some(3.0));
        let scoring = config.scoring.unwrap();
        assert_eq!(scoring.composite.unwrap().stability, Some(0.5));
        assert_eq!(
            config.panel_solver.unwrap().line_ending,
            Some(FileLineEnding::Crlf)
        );
        let field = config.field_solver.unwrap();
        assert_eq!(field.launcher.unwrap(), vec!["wsl", "bash", "-lc"]);
        assert_eq!(field.path_mapping.unwrap().guest_prefix, "/mnt/c/work");
        assert_eq!(config.detailed.unwrap().enabled, Some(false));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_toml("[flow]\nspeed = 3.0\n").is_err());
        assert!(FileConfig::from_toml("[solver]\n").is_err());
    }

    #[test]
    fn from_file_reports_the_offending_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "candidates = 3").unwrap();

        let err = FileConfig::from_file(&path).unwrap_err();
        assert!(matches!(&err, CliError::ConfigFile { path: p, .. } if p == &path));
    }

    #[test]
    fn line_ending_parses_case_insensitively() {
        assert_eq!("LF".parse::<FileLineEnding>(), Ok(FileLineEnding::Lf));
        assert!("cr".parse::<FileLineEnding>().is_err());
    }
}
