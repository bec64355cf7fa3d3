use super::defaults::DefaultsConfig;
use super::file::{
    FileAnalysisConfig, FileConfig, FileDetailedConfig, FileFieldSolverConfig, FileFlowConfig,
    FileLineEnding, FileOutputConfig, FilePanelSolverConfig, FileScoringConfig, FileSweepConfig,
};
use super::models::AppConfig;
use crate::cli::CommonArgs;
use crate::error::{CliError, Result};
use foilrank::core::analysis::efficiency::CruiseBand;
use foilrank::core::analysis::metrics::MetricsSettings;
use foilrank::core::analysis::regression::LinearFitSettings;
use foilrank::core::analysis::scoring::{
    CompositeWeights, DetailedWeights, EfficiencyWeights, ManeuverabilityWeights, ScoringWeights,
    StabilityWeights,
};
use foilrank::core::models::condition::{AngleSweep, FlowConditions};
use foilrank::engine::config as core_config;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Flags that only some subcommands expose.
#[derive(Debug, Default, Clone)]
pub struct CommandOverrides {
    pub panel_executable: Option<PathBuf>,
    pub iterations: Option<u32>,
    pub env_script: Option<String>,
    pub cases_root: Option<PathBuf>,
}

pub fn build_config(common: &CommonArgs, overrides: &CommandOverrides) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let source = resolve_config_path(common.config.as_deref(), &defaults);
    let file_config = match &source {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };
    let mut file_config = apply_set_values(file_config, &common.set_values)?;

    let candidates = if common.candidates.is_empty() {
        file_config.candidates.take()
    } else {
        Some(common.candidates.clone())
    };
    let geometry_dir = common
        .geometry_dir
        .clone()
        .or(file_config.geometry_dir.take())
        .unwrap_or(defaults.geometry_dir);

    let flow = merge_flow(common, file_config.flow.take().unwrap_or_default());
    let metrics = merge_metrics(file_config.analysis.take().unwrap_or_default());
    let scoring = merge_scoring(file_config.scoring.take().unwrap_or_default());
    let panel = merge_panel(
        overrides,
        file_config.panel_solver.take().unwrap_or_default(),
        file_config.sweep.take().unwrap_or_default(),
    );
    let field = merge_field(overrides, file_config.field_solver.take().unwrap_or_default())?;
    let detailed = merge_detailed(file_config.detailed.take().unwrap_or_default());
    let output = merge_output(file_config.output.take().unwrap_or_default());

    let mut builder = core_config::PipelineConfigBuilder::new()
        .geometry_dir(geometry_dir)
        .flow(flow)
        .metrics(metrics)
        .scoring(scoring)
        .panel(panel)
        .field(field)
        .detailed(detailed)
        .output(output);
    if let Some(names) = candidates {
        builder = builder.candidates(names);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        source,
        core_config,
    })
}

fn resolve_config_path(explicit: Option<&Path>, defaults: &DefaultsConfig) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if defaults.config_file.is_file() {
        debug!(
            "No --config given; using {:?} from the working directory.",
            defaults.config_file
        );
        return Some(defaults.config_file.clone());
    }
    None
}

fn merge_flow(common: &CommonArgs, file: FileFlowConfig) -> FlowConditions {
    let base = FlowConditions::default();
    FlowConditions {
        density: file.density.unwrap_or(base.density),
        dynamic_viscosity: file.dynamic_viscosity.unwrap_or(base.dynamic_viscosity),
        velocity: common.velocity.or(file.velocity).unwrap_or(base.velocity),
        chord: common.chord.or(file.chord).unwrap_or(base.chord),
        mach: file.mach.unwrap_or(base.mach),
    }
}

fn merge_metrics(file: FileAnalysisConfig) -> MetricsSettings {
    let fit = LinearFitSettings::default();
    let cruise = CruiseBand::default();
    MetricsSettings {
        fit: LinearFitSettings {
            window_min: file.window_min.unwrap_or(fit.window_min),
            stall_margin: file.stall_margin.unwrap_or(fit.stall_margin),
            fallback_upper: file.fallback_upper.unwrap_or(fit.fallback_upper),
            residual_threshold: file.residual_threshold.unwrap_or(fit.residual_threshold),
            min_points: file.min_points.unwrap_or(fit.min_points),
            cd_max: file.cd_max.unwrap_or(fit.cd_max),
            cl_abs_max: file.cl_abs_max.unwrap_or(fit.cl_abs_max),
        },
        cruise: CruiseBand {
            min: file.cruise_min.unwrap_or(cruise.min),
            max: file.cruise_max.unwrap_or(cruise.max),
        },
    }
}

fn merge_scoring(file: FileScoringConfig) -> ScoringWeights {
    let base = ScoringWeights::default();

    let s = file.stability.unwrap_or_default();
    let e = file.efficiency.unwrap_or_default();
    let m = file.maneuverability.unwrap_or_default();
    let c = file.composite.unwrap_or_default();
    let d = file.detailed.unwrap_or_default();

    ScoringWeights {
        stability: StabilityWeights {
            stall_angle: s.stall_angle.unwrap_or(base.stability.stall_angle),
            post_stall_drop: s.post_stall_drop.unwrap_or(base.stability.post_stall_drop),
            slope_deviation: s.slope_deviation.unwrap_or(base.stability.slope_deviation),
        },
        efficiency: EfficiencyWeights {
            cruise_cl_cd: e.cruise_cl_cd.unwrap_or(base.efficiency.cruise_cl_cd),
            min_cd: e.min_cd.unwrap_or(base.efficiency.min_cd),
        },
        maneuverability: ManeuverabilityWeights {
            slope: m.slope.unwrap_or(base.maneuverability.slope),
            cl_max: m.cl_max.unwrap_or(base.maneuverability.cl_max),
            load_index: m.load_index.unwrap_or(base.maneuverability.load_index),
        },
        composite: CompositeWeights {
            stability: c.stability.unwrap_or(base.composite.stability),
            efficiency: c.efficiency.unwrap_or(base.composite.efficiency),
            maneuverability: c.maneuverability.unwrap_or(base.composite.maneuverability),
        },
        detailed: DetailedWeights {
            stability: d.stability.unwrap_or(base.detailed.stability),
            efficiency: d.efficiency.unwrap_or(base.detailed.efficiency),
            maneuverability: d.maneuverability.unwrap_or(base.detailed.maneuverability),
            detail: d.detail.unwrap_or(base.detailed.detail),
        },
        slope_target: file.slope_target.unwrap_or(base.slope_target),
    }
}

fn merge_panel(
    overrides: &CommandOverrides,
    file: FilePanelSolverConfig,
    sweep: FileSweepConfig,
) -> core_config::PanelSolverConfig {
    let base = core_config::PanelSolverConfig::default();
    core_config::PanelSolverConfig {
        executable: overrides
            .panel_executable
            .clone()
            .or(file.executable)
            .unwrap_or(base.executable),
        iterations: overrides
            .iterations
            .or(file.iterations)
            .unwrap_or(base.iterations),
        line_ending: file
            .line_ending
            .map(Into::into)
            .unwrap_or(base.line_ending),
        sweep: AngleSweep::new(
            sweep.start.unwrap_or(base.sweep.start),
            sweep.end.unwrap_or(base.sweep.end),
            sweep.step.unwrap_or(base.sweep.step),
        ),
    }
}

fn merge_field(
    overrides: &CommandOverrides,
    file: FileFieldSolverConfig,
) -> Result<core_config::FieldSolverConfig> {
    let base = core_config::FieldSolverConfig::default();

    let launcher = match file.launcher {
        Some(parts) => {
            let mut parts = parts.into_iter();
            let program = parts.next().filter(|p| !p.trim().is_empty()).ok_or_else(|| {
                CliError::Config("`field-solver.launcher` must start with a program name.".to_string())
            })?;
            core_config::Launcher {
                program,
                args: parts.collect(),
            }
        }
        None => base.launcher,
    };

    Ok(core_config::FieldSolverConfig {
        template_dir: file.template_dir.unwrap_or(base.template_dir),
        cases_root: overrides
            .cases_root
            .clone()
            .or(file.cases_root)
            .unwrap_or(base.cases_root),
        angles: file.angles.unwrap_or(base.angles),
        env_script: overrides
            .env_script
            .clone()
            .or(file.env_script)
            .unwrap_or(base.env_script),
        solver: file.solver.unwrap_or(base.solver),
        launcher,
        path_mapping: file.path_mapping.map(|m| core_config::PathMapping {
            host_prefix: m.host_prefix,
            guest_prefix: m.guest_prefix,
        }),
        coefficient_file: file.coefficient_file.unwrap_or(base.coefficient_file),
        extrusion_thickness: file
            .extrusion_thickness
            .unwrap_or(base.extrusion_thickness),
    })
}

fn merge_detailed(file: FileDetailedConfig) -> core_config::DetailedConfig {
    let base = core_config::DetailedConfig::default();
    core_config::DetailedConfig {
        enabled: file.enabled.unwrap_or(base.enabled),
        template_dir: file.template_dir.unwrap_or(base.template_dir),
        angles: file.angles.unwrap_or(base.angles),
        export_fields: file.export_fields.unwrap_or(base.export_fields),
        surfaces_dir: file.surfaces_dir.unwrap_or(base.surfaces_dir),
        surface_name: file.surface_name.unwrap_or(base.surface_name),
    }
}

fn merge_output(file: FileOutputConfig) -> core_config::OutputConfig {
    let base = core_config::OutputConfig::default();
    core_config::OutputConfig {
        raw_dir: file.raw_dir.unwrap_or(base.raw_dir),
        processed_dir: file.processed_dir.unwrap_or(base.processed_dir),
        results_file: file.results_file.unwrap_or(base.results_file),
        metrics_file: file.metrics_file.unwrap_or(base.metrics_file),
        scores_file: file.scores_file.unwrap_or(base.scores_file),
        pressure_file: file.pressure_file.unwrap_or(base.pressure_file),
        detailed_scores_file: file
            .detailed_scores_file
            .unwrap_or(base.detailed_scores_file),
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid value for {}: {}", key, value)))
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| parse_value(key, item))
        .collect()
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let (key, value) = (key.trim(), value.trim());

        match key {
            "candidates" => config.candidates = Some(parse_list(key, value)?),
            "geometry-dir" => config.geometry_dir = Some(PathBuf::from(value)),

            "flow.density" => {
                config.flow.get_or_insert_with(Default::default).density =
                    Some(parse_value(key, value)?)
            }
            "flow.dynamic-viscosity" => {
                config
                    .flow
                    .get_or_insert_with(Default::default)
                    .dynamic_viscosity = Some(parse_value(key, value)?)
            }
            "flow.velocity" => {
                config.flow.get_or_insert_with(Default::default).velocity =
                    Some(parse_value(key, value)?)
            }
            "flow.chord" => {
                config.flow.get_or_insert_with(Default::default).chord =
                    Some(parse_value(key, value)?)
            }
            "flow.mach" => {
                config.flow.get_or_insert_with(Default::default).mach =
                    Some(parse_value(key, value)?)
            }

            "sweep.start" => {
                config.sweep.get_or_insert_with(Default::default).start =
                    Some(parse_value(key, value)?)
            }
            "sweep.end" => {
                config.sweep.get_or_insert_with(Default::default).end =
                    Some(parse_value(key, value)?)
            }
            "sweep.step" => {
                config.sweep.get_or_insert_with(Default::default).step =
                    Some(parse_value(key, value)?)
            }

            "analysis.cruise-min" => {
                config.analysis.get_or_insert_with(Default::default).cruise_min =
                    Some(parse_value(key, value)?)
            }
            "analysis.cruise-max" => {
                config.analysis.get_or_insert_with(Default::default).cruise_max =
                    Some(parse_value(key, value)?)
            }
            "analysis.residual-threshold" => {
                config
                    .analysis
                    .get_or_insert_with(Default::default)
                    .residual_threshold = Some(parse_value(key, value)?)
            }
            "analysis.window-min" => {
                config.analysis.get_or_insert_with(Default::default).window_min =
                    Some(parse_value(key, value)?)
            }
            "analysis.stall-margin" => {
                config.analysis.get_or_insert_with(Default::default).stall_margin =
                    Some(parse_value(key, value)?)
            }

            "scoring.slope-target" => {
                config.scoring.get_or_insert_with(Default::default).slope_target =
                    Some(parse_value(key, value)?)
            }

            "panel-solver.executable" => {
                config
                    .panel_solver
                    .get_or_insert_with(Default::default)
                    .executable = Some(PathBuf::from(value))
            }
            "panel-solver.iterations" => {
                config
                    .panel_solver
                    .get_or_insert_with(Default::default)
                    .iterations = Some(parse_value(key, value)?)
            }
            "panel-solver.line-ending" => {
                config
                    .panel_solver
                    .get_or_insert_with(Default::default)
                    .line_ending = Some(value.parse::<FileLineEnding>().map_err(|e| {
                    CliError::Config(format!("Invalid value for {}: {}", key, e))
                })?)
            }

            "field-solver.template-dir" => {
                config
                    .field_solver
                    .get_or_insert_with(Default::default)
                    .template_dir = Some(PathBuf::from(value))
            }
            "field-solver.cases-root" => {
                config
                    .field_solver
                    .get_or_insert_with(Default::default)
                    .cases_root = Some(PathBuf::from(value))
            }
            "field-solver.angles" => {
                config.field_solver.get_or_insert_with(Default::default).angles =
                    Some(parse_list(key, value)?)
            }
            "field-solver.env-script" => {
                config
                    .field_solver
                    .get_or_insert_with(Default::default)
                    .env_script = Some(value.to_string())
            }
            "field-solver.solver" => {
                config.field_solver.get_or_insert_with(Default::default).solver =
                    Some(value.to_string())
            }

            "detailed.enabled" => {
                config.detailed.get_or_insert_with(Default::default).enabled =
                    Some(parse_value(key, value)?)
            }
            "detailed.template-dir" => {
                config.detailed.get_or_insert_with(Default::default).template_dir =
                    Some(PathBuf::from(value))
            }
            "detailed.angles" => {
                config.detailed.get_or_insert_with(Default::default).angles =
                    Some(parse_list(key, value)?)
            }
            "detailed.export-fields" => {
                config.detailed.get_or_insert_with(Default::default).export_fields =
                    Some(parse_value(key, value)?)
            }

            "output.raw-dir" => {
                config.output.get_or_insert_with(Default::default).raw_dir =
                    Some(PathBuf::from(value))
            }
            "output.processed-dir" => {
                config.output.get_or_insert_with(Default::default).processed_dir =
                    Some(PathBuf::from(value))
            }

            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn common_args(config_path: &Path, extra: &[&str]) -> CommonArgs {
        let mut args = vec![
            "foilrank".to_string(),
            "check-template".to_string(),
            "-c".to_string(),
            config_path.to_str().unwrap().to_string(),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(args).command {
            Commands::CheckTemplate(args) => args.common,
            _ => panic!("Expected 'check-template' subcommand"),
        }
    }

    #[test]
    fn minimal_file_is_completed_with_defaults() {
        let path = write_config_file("minimal.toml", "candidates = [\"NACA2412\", \"E168\"]\n");
        let app = build_config(&common_args(&path, &[]), &CommandOverrides::default()).unwrap();

        let config = &app.core_config;
        assert_eq!(app.source.as_deref(), Some(path.as_path()));
        assert_eq!(config.candidates, vec!["NACA2412", "E168"]);
        assert_eq!(config.geometry_dir, PathBuf::from("geometry"));
        assert_eq!(config.flow, FlowConditions::default());
        assert_eq!(config.scoring, ScoringWeights::default());
        assert_eq!(config.panel, core_config::PanelSolverConfig::default());
        assert_eq!(config.field, core_config::FieldSolverConfig::default());
    }

    #[test]
    fn file_values_merge_with_defaults() {
        let path = write_config_file(
            "partial.toml",
            r#"
            candidates = ["E168"]

            [flow]
            velocity = 22.5

            [analysis]
            cruise-max = 6.0

            [scoring.efficiency]
            cruise-cl-cd = 0.6
            min-cd = 0.4

            [field-solver]
            launcher = ["wsl", "bash", "-lc"]
            "#,
        );
        let app = build_config(&common_args(&path, &[]), &CommandOverrides::default()).unwrap();
        let config = app.core_config;

        assert_eq!(config.flow.velocity, 22.5);
        assert_eq!(config.flow.density, FlowConditions::default().density);
        assert_eq!(config.metrics.cruise.max, 6.0);
        assert_eq!(config.metrics.cruise.min, CruiseBand::default().min);
        assert_eq!(config.scoring.efficiency.cruise_cl_cd, 0.6);
        assert_eq!(
            config.scoring.stability,
            ScoringWeights::default().stability
        );
        assert_eq!(config.field.launcher.program, "wsl");
        assert_eq!(config.field.launcher.args, vec!["bash", "-lc"]);
    }

    #[test]
    fn cli_flags_override_set_values_which_override_the_file() {
        let path = write_config_file(
            "override.toml",
            r#"
            candidates = ["E168"]

            [flow]
            velocity = 20.0 # Will be overridden by --velocity
            density = 1.2   # Will be overridden by --set

            [panel-solver]
            iterations = 50 # Will be overridden by the command flag
            "#,
        );
        let common = common_args(
            &path,
            &[
                "--velocity",
                "25",
                "-S",
                "flow.velocity=22",
                "-S",
                "flow.density=1.1",
                "-S",
                "panel-solver.iterations=80",
            ],
        );
        let overrides = CommandOverrides {
            iterations: Some(120),
            ..Default::default()
        };
        let config = build_config(&common, &overrides).unwrap().core_config;

        assert_eq!(config.flow.velocity, 25.0);
        assert_eq!(config.flow.density, 1.1);
        assert_eq!(config.panel.iterations, 120);
    }

    #[test]
    fn candidates_flag_replaces_the_file_list() {
        let path = write_config_file("candidates.toml", "candidates = [\"E168\"]\n");
        let common = common_args(&path, &["--candidates", "NACA0012,NACA4412"]);
        let config = build_config(&common, &CommandOverrides::default())
            .unwrap()
            .core_config;
        assert_eq!(config.candidates, vec!["NACA0012", "NACA4412"]);
    }

    #[test]
    fn set_values_accept_lists_and_enums() {
        let path = write_config_file("lists.toml", "candidates = [\"E168\"]\n");
        let common = common_args(
            &path,
            &[
                "-S",
                "detailed.angles=2, 4, 6",
                "-S",
                "panel-solver.line-ending=lf",
                "-S",
                "detailed.enabled=false",
            ],
        );
        let config = build_config(&common, &CommandOverrides::default())
            .unwrap()
            .core_config;
        assert_eq!(config.detailed.angles, vec![2.0, 4.0, 6.0]);
        assert_eq!(config.panel.line_ending, core_config::LineEnding::Lf);
        assert!(!config.detailed.enabled);
    }

    #[test]
    fn unsupported_or_malformed_set_values_are_rejected() {
        let path = write_config_file("set_errors.toml", "candidates = [\"E168\"]\n");

        let common = common_args(&path, &["-S", "flow.speed=3"]);
        let result = build_config(&common, &CommandOverrides::default());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("flow.speed")));

        let common = common_args(&path, &["-S", "flow.velocity"]);
        let result = build_config(&common, &CommandOverrides::default());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("KEY=VALUE")));

        let common = common_args(&path, &["-S", "flow.velocity=fast"]);
        let result = build_config(&common, &CommandOverrides::default());
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn missing_candidates_returns_config_error() {
        let path = write_config_file("no_candidates.toml", "[flow]\nvelocity = 30.0\n");
        let result = build_config(&common_args(&path, &[]), &CommandOverrides::default());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("candidates")));
    }

    #[test]
    fn weights_not_summing_to_one_return_config_error() {
        let path = write_config_file(
            "bad_weights.toml",
            r#"
            candidates = ["E168"]

            [scoring.composite]
            stability = 0.9
            "#,
        );
        let result = build_config(&common_args(&path, &[]), &CommandOverrides::default());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("composite")));
    }

    #[test]
    fn empty_launcher_is_rejected() {
        let path = write_config_file(
            "bad_launcher.toml",
            "candidates = [\"E168\"]\n[field-solver]\nlauncher = []\n",
        );
        let result = build_config(&common_args(&path, &[]), &CommandOverrides::default());
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("launcher")));
    }
}
