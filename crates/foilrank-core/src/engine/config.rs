use crate::core::analysis::metrics::MetricsSettings;
use crate::core::analysis::scoring::{ScoringWeights, WeightError};
use crate::core::models::condition::{AngleSweep, FlowConditions};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(#[from] WeightError),

    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
}

/// Line terminator used when piping a script to the panel solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    Lf,
    #[default]
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelSolverConfig {
    pub executable: PathBuf,
    pub iterations: u32,
    pub line_ending: LineEnding,
    pub sweep: AngleSweep,
}

impl Default for PanelSolverConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("xfoil"),
            iterations: 200,
            line_ending: LineEnding::default(),
            sweep: AngleSweep::new(-5.0, 18.0, 0.5),
        }
    }
}

/// Rewrites host paths under `host_prefix` to the guest path the launcher sees.
#[derive(Debug, Clone, PartialEq)]
pub struct PathMapping {
    pub host_prefix: PathBuf,
    pub guest_prefix: String,
}

/// Program and leading arguments that receive the composed phase command as their final
/// argument, e.g. `bash -lc` or `wsl bash -lc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Launcher {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for Launcher {
    fn default() -> Self {
        Self {
            program: "bash".to_string(),
            args: vec!["-lc".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSolverConfig {
    pub template_dir: PathBuf,
    pub cases_root: PathBuf,
    pub angles: Vec<f64>,
    pub env_script: String,
    pub solver: String,
    pub launcher: Launcher,
    pub path_mapping: Option<PathMapping>,
    /// Coefficient history location relative to a case directory.
    pub coefficient_file: PathBuf,
    pub extrusion_thickness: f64,
}

impl Default for FieldSolverConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("baseCase"),
            cases_root: PathBuf::from("cases"),
            angles: (-4..=18).map(f64::from).collect(),
            env_script: "/usr/lib/openfoam/openfoam2412/etc/bashrc".to_string(),
            solver: "simpleFoam".to_string(),
            launcher: Launcher::default(),
            path_mapping: None,
            coefficient_file: PathBuf::from("postProcessing/force_coefficient/0/coefficient.dat"),
            extrusion_thickness: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailedConfig {
    pub enabled: bool,
    pub template_dir: PathBuf,
    pub angles: Vec<f64>,
    pub export_fields: bool,
    /// Surface sampling root relative to a case directory.
    pub surfaces_dir: PathBuf,
    pub surface_name: String,
}

impl Default for DetailedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            template_dir: PathBuf::from("baseCase_detailed"),
            angles: (0..=16).map(f64::from).collect(),
            export_fields: true,
            surfaces_dir: PathBuf::from("postProcessing/surfaces"),
            surface_name: "airfoil".to_string(),
        }
    }
}

/// Where every workflow writes its inputs, raw solver output and tables.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub results_file: String,
    pub metrics_file: String,
    pub scores_file: String,
    pub pressure_file: String,
    pub detailed_scores_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            results_file: "results.csv".to_string(),
            metrics_file: "metrics.csv".to_string(),
            scores_file: "scores.csv".to_string(),
            pressure_file: "pressure_metrics.csv".to_string(),
            detailed_scores_file: "scores_detailed.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn processed(&self, file: &str) -> PathBuf {
        self.processed_dir.join(file)
    }

    /// Table location for one workflow stage, e.g. `<processed>/screening/scores.csv`.
    pub fn stage_table(&self, stage: &str, file: &str) -> PathBuf {
        self.processed_dir.join(stage).join(file)
    }
}

/// Everything a workflow needs, passed explicitly to every component.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub candidates: Vec<String>,
    pub geometry_dir: PathBuf,
    pub flow: FlowConditions,
    pub metrics: MetricsSettings,
    pub scoring: ScoringWeights,
    pub panel: PanelSolverConfig,
    pub field: FieldSolverConfig,
    pub detailed: DetailedConfig,
    pub output: OutputConfig,
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    candidates: Option<Vec<String>>,
    geometry_dir: Option<PathBuf>,
    flow: Option<FlowConditions>,
    metrics: Option<MetricsSettings>,
    scoring: Option<ScoringWeights>,
    panel: Option<PanelSolverConfig>,
    field: Option<FieldSolverConfig>,
    detailed: Option<DetailedConfig>,
    output: Option<OutputConfig>,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidates(mut self, names: Vec<String>) -> Self {
        self.candidates = Some(names);
        self
    }
    pub fn geometry_dir(mut self, path: PathBuf) -> Self {
        self.geometry_dir = Some(path);
        self
    }
    pub fn flow(mut self, flow: FlowConditions) -> Self {
        self.flow = Some(flow);
        self
    }
    pub fn metrics(mut self, settings: MetricsSettings) -> Self {
        self.metrics = Some(settings);
        self
    }
    pub fn scoring(mut self, weights: ScoringWeights) -> Self {
        self.scoring = Some(weights);
        self
    }
    pub fn panel(mut self, panel: PanelSolverConfig) -> Self {
        self.panel = Some(panel);
        self
    }
    pub fn field(mut self, field: FieldSolverConfig) -> Self {
        self.field = Some(field);
        self
    }
    pub fn detailed(mut self, detailed: DetailedConfig) -> Self {
        self.detailed = Some(detailed);
        self
    }
    pub fn output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }

    pub fn build(self) -> Result<PipelineConfig, ConfigError> {
        let candidates = self
            .candidates
            .ok_or(ConfigError::MissingParameter("candidates"))?;
        if candidates.is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "candidates",
                reason: "at least one candidate is required".to_string(),
            });
        }

        let flow = self.flow.unwrap_or_default();
        for (parameter, value) in [
            ("flow.density", flow.density),
            ("flow.dynamic_viscosity", flow.dynamic_viscosity),
            ("flow.velocity", flow.velocity),
            ("flow.chord", flow.chord),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(ConfigError::InvalidValue {
                    parameter,
                    reason: format!("must be a positive number, got {}", value),
                });
            }
        }

        let metrics = self.metrics.unwrap_or_default();
        if metrics.cruise.min > metrics.cruise.max {
            return Err(ConfigError::InvalidValue {
                parameter: "analysis.cruise",
                reason: format!(
                    "band minimum {} exceeds maximum {}",
                    metrics.cruise.min, metrics.cruise.max
                ),
            });
        }

        let scoring = self.scoring.unwrap_or_default();
        scoring.validate()?;

        let panel = self.panel.unwrap_or_default();
        if panel.sweep.angles().is_empty() {
            return Err(ConfigError::InvalidValue {
                parameter: "sweep",
                reason: format!(
                    "range {}..{} with step {} contains no angles",
                    panel.sweep.start, panel.sweep.end, panel.sweep.step
                ),
            });
        }

        Ok(PipelineConfig {
            candidates,
            geometry_dir: self
                .geometry_dir
                .ok_or(ConfigError::MissingParameter("geometry_dir"))?,
            flow,
            metrics,
            scoring,
            panel,
            field: self.field.unwrap_or_default(),
            detailed: self.detailed.unwrap_or_default(),
            output: self.output.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> PipelineConfigBuilder {
        PipelineConfigBuilder::new()
            .candidates(vec!["NACA2412".to_string(), "E168".to_string()])
            .geometry_dir(PathBuf::from("geometry"))
    }

    #[test]
    fn minimal_builder_fills_defaults() {
        let config = minimal().build().unwrap();
        assert_eq!(config.candidates.len(), 2);
        assert_eq!(config.flow, FlowConditions::default());
        assert_eq!(config.panel.iterations, 200);
        assert_eq!(config.field.solver, "simpleFoam");
        assert_eq!(config.field.angles.len(), 23);
        assert!(config.detailed.enabled);
    }

    #[test]
    fn missing_candidates_is_reported() {
        let result = PipelineConfigBuilder::new()
            .geometry_dir(PathBuf::from("geometry"))
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("candidates")));
    }

    #[test]
    fn missing_geometry_dir_is_reported() {
        let result = PipelineConfigBuilder::new()
            .candidates(vec!["E168".to_string()])
            .build();
        assert_eq!(result, Err(ConfigError::MissingParameter("geometry_dir")));
    }

    #[test]
    fn invalid_weights_fail_the_build() {
        let mut weights = ScoringWeights::default();
        weights.composite.stability = 0.9;
        let result = minimal().scoring(weights).build();
        assert!(matches!(result, Err(ConfigError::InvalidWeights(e)) if e.group == "composite"));
    }

    #[test]
    fn empty_sweep_is_rejected() {
        let panel = PanelSolverConfig {
            sweep: AngleSweep::new(0.0, 10.0, 0.0),
            ..Default::default()
        };
        let result = minimal().panel(panel).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { parameter: "sweep", .. })
        ));
    }

    #[test]
    fn non_positive_flow_property_is_rejected() {
        let flow = FlowConditions {
            dynamic_viscosity: 0.0,
            ..Default::default()
        };
        let result = minimal().flow(flow).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                parameter: "flow.dynamic_viscosity",
                ..
            })
        ));
    }

    #[test]
    fn line_endings_render_as_expected() {
        assert_eq!(LineEnding::CrLf.as_str(), "\r\n");
        assert_eq!(LineEnding::Lf.as_str(), "\n");
    }
}
