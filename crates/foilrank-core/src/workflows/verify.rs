use super::{CaseFailure, Ranking, load_candidates, map_cases, rank, record_failure};
use crate::core::analysis::pressure::{self, PressureMetrics};
use crate::core::analysis::scoring::{self, ScoreRecord};
use crate::core::io::coefficients::read_case_record;
use crate::core::io::dat::DatDirectory;
use crate::core::io::surface::read_latest_surface;
use crate::core::io::tables;
use crate::core::models::candidate::Candidate;
use crate::core::models::condition::Condition;
use crate::core::models::record::{PolarTable, RunRecord};
use crate::engine::case::{CaseFamily, CaseHandle, CaseManager, case_label};
use crate::engine::config::PipelineConfig;
use crate::engine::error::EngineError;
use crate::engine::process::ProcessRunner;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::solver::field::{FieldSolver, MeshMode};
use crate::engine::solver::{InvocationOutcome, SolverInvoker};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

pub const STAGE: &str = "verification";

/// Which parts of each case's phase plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Create cases, run every phase and analyse the results.
    #[default]
    Full,
    /// Create cases and mesh them; nothing is parsed or scored.
    MeshOnly,
    /// Run nothing; parse and score the results already on disk.
    PostProcessOnly,
}

impl ExecutionMode {
    fn mesh_mode(self) -> MeshMode {
        match self {
            Self::MeshOnly => MeshMode::MeshOnly,
            _ => MeshMode::Full,
        }
    }

    fn invokes_solver(self) -> bool {
        self != Self::PostProcessOnly
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyOptions {
    pub mode: ExecutionMode,
    /// When false the sweep family is not run; its existing results are still parsed and
    /// ranked so the detailed stage has scores to build on.
    pub run_sweep: bool,
    /// Run the detailed stage; it also needs `detailed.enabled` in the configuration.
    pub detailed: bool,
    /// Re-apply geometry and conditions to cases that already exist.
    pub overwrite: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Full,
            run_sweep: true,
            detailed: true,
            overwrite: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VerificationResult {
    pub tables: Vec<PolarTable>,
    pub ranking: Ranking,
    pub pressure: Vec<PressureMetrics>,
    /// Empty unless the detailed stage ran.
    pub detailed_scores: Vec<ScoreRecord>,
    /// Cases whose solver run produced its artifact in this invocation.
    pub completed_cases: usize,
    pub failures: Vec<CaseFailure>,
}

/// Outcome of running one case family.
#[derive(Debug, Default)]
struct FamilyRun {
    completed: usize,
    /// Labels of cases that already failed and must not be parsed.
    failed: HashSet<String>,
}

/// Verifies the candidates with the field solver, one case per candidate and angle.
///
/// Sweep-family results are ranked exactly like the screening polars. The optional
/// detailed stage then samples the surface pressure of each candidate at the detailed
/// angle nearest its cruise optimum and folds a detail score into a second ranking.
/// Tables are written under `<processed>/verification/`.
///
/// # Errors
///
/// Returns [`EngineError::NoUsableRecords`] if no sweep case produced a record, or an
/// I/O or table error if the outputs cannot be written. A misconfigured template halts
/// only its own family and is reported as a failure.
#[instrument(skip_all, name = "verification_workflow")]
pub fn run(
    config: &PipelineConfig,
    options: &VerifyOptions,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
) -> Result<VerificationResult, EngineError> {
    let mut result = VerificationResult::default();
    let provider = DatDirectory::new(&config.geometry_dir);
    let candidates = load_candidates(config, &provider, reporter, &mut result.failures);

    let field = &config.field;
    let sweep_manager = CaseManager::new(CaseFamily::Sweep, &field.template_dir, &field.cases_root)
        .with_overwrite(options.overwrite)
        .with_extrusion_thickness(field.extrusion_thickness);

    info!(
        candidates = candidates.len(),
        angles = field.angles.len(),
        mode = ?options.mode,
        "Starting field-solver verification."
    );

    let sweep_run = if options.run_sweep && options.mode.invokes_solver() {
        let solver = FieldSolver::new(runner, field.clone(), options.mode.mesh_mode(), false);
        run_family(
            &sweep_manager,
            &solver,
            &candidates,
            &field.angles,
            config.flow.velocity,
            reporter,
            &mut result.failures,
        )
    } else {
        FamilyRun::default()
    };
    result.completed_cases += sweep_run.completed;

    let detailed_enabled = options.detailed && config.detailed.enabled;
    let detailed_manager = CaseManager::new(
        CaseFamily::Detailed,
        &config.detailed.template_dir,
        &field.cases_root,
    )
    .with_overwrite(options.overwrite)
    .with_extrusion_thickness(field.extrusion_thickness);

    if options.mode == ExecutionMode::MeshOnly {
        if detailed_enabled {
            let solver = FieldSolver::new(runner, field.clone(), MeshMode::MeshOnly, false);
            let detailed_run = run_family(
                &detailed_manager,
                &solver,
                &candidates,
                &config.detailed.angles,
                config.flow.velocity,
                reporter,
                &mut result.failures,
            );
            result.completed_cases += detailed_run.completed;
        }
        info!(
            meshed = result.completed_cases,
            failed = result.failures.len(),
            "Mesh-only verification complete."
        );
        return Ok(result);
    }

    result.tables = collect_tables(
        &sweep_manager,
        &field.coefficient_file,
        &candidates,
        &field.angles,
        &sweep_run.failed,
        reporter,
        &mut result.failures,
    );
    if result.tables.is_empty() {
        return Err(EngineError::NoUsableRecords { stage: STAGE });
    }
    let output = &config.output;
    tables::write_combined_tables(&output.stage_table(STAGE, &output.results_file), &result.tables)?;
    result.ranking = rank(&result.tables, config, STAGE, reporter)?;

    if detailed_enabled {
        if options.mode.invokes_solver() {
            let solver = FieldSolver::new(
                runner,
                field.clone(),
                MeshMode::Full,
                config.detailed.export_fields,
            );
            let detailed_run = run_family(
                &detailed_manager,
                &solver,
                &candidates,
                &config.detailed.angles,
                config.flow.velocity,
                reporter,
                &mut result.failures,
            );
            result.completed_cases += detailed_run.completed;
        }

        let (pressure, detailed_scores) =
            score_detailed(config, &detailed_manager, &result.ranking, reporter)?;
        result.pressure = pressure;
        result.detailed_scores = detailed_scores;
    }

    info!(
        completed = result.completed_cases,
        usable_candidates = result.tables.len(),
        failed = result.failures.len(),
        "Verification workflow complete."
    );
    Ok(result)
}

fn run_family(
    manager: &CaseManager,
    solver: &FieldSolver<'_>,
    candidates: &[Candidate],
    angles: &[f64],
    velocity: f64,
    reporter: &ProgressReporter,
    failures: &mut Vec<CaseFailure>,
) -> FamilyRun {
    let family = manager.family().name();
    if let Err(e) = manager.validate_template() {
        record_failure(failures, reporter, family, e.to_string());
        return FamilyRun::default();
    }

    let jobs: Vec<(&Candidate, Condition)> = candidates
        .iter()
        .flat_map(|c| angles.iter().map(move |&a| (c, Condition::new(a, velocity))))
        .collect();

    reporter.report(Progress::PhaseStart {
        name: match manager.family() {
            CaseFamily::Sweep => "Verification Cases",
            CaseFamily::Detailed => "Detailed Cases",
        },
    });
    reporter.report(Progress::TaskStart {
        total_steps: jobs.len() as u64,
    });
    let outcomes = map_cases(&jobs, |(candidate, condition)| {
        let outcome = run_case(manager, solver, candidate, condition);
        reporter.report(Progress::TaskIncrement);
        outcome
    });
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut run = FamilyRun::default();
    for ((candidate, condition), outcome) in jobs.iter().zip(outcomes) {
        match outcome {
            Ok(_) => run.completed += 1,
            Err(e) => {
                let label = case_label(candidate.name(), condition.alpha_deg);
                record_failure(failures, reporter, label.as_str(), e.to_string());
                run.failed.insert(label);
            }
        }
    }
    info!(family, completed = run.completed, failed = run.failed.len(), "Case family finished.");
    run
}

fn run_case(
    manager: &CaseManager,
    solver: &FieldSolver<'_>,
    candidate: &Candidate,
    condition: &Condition,
) -> Result<CaseHandle, EngineError> {
    let handle = manager.ensure_case(candidate, condition)?;
    let result = solver.invoke(&handle)?;
    match result.outcome() {
        InvocationOutcome::Failed => Err(EngineError::InvocationFailure {
            case: handle.label(),
            reason: result.failure_reason(),
        }),
        InvocationOutcome::Warning => {
            warn!(
                case = %handle.label(),
                exit_code = ?result.exit_code,
                "Field solver exited with an error but produced its artifact; using it."
            );
            Ok(handle)
        }
        InvocationOutcome::Clean => {
            debug!(case = %handle.label(), "Case finished.");
            Ok(handle)
        }
    }
}

/// Parses the final coefficient sample of every case not already known to have failed.
/// Candidates without a single usable record are left out.
fn collect_tables(
    manager: &CaseManager,
    coefficient_file: &Path,
    candidates: &[Candidate],
    angles: &[f64],
    skip: &HashSet<String>,
    reporter: &ProgressReporter,
    failures: &mut Vec<CaseFailure>,
) -> Vec<PolarTable> {
    let mut tables = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let mut records: Vec<RunRecord> = Vec::with_capacity(angles.len());
        for &alpha in angles {
            let label = case_label(candidate.name(), alpha);
            if skip.contains(&label) {
                continue;
            }
            let path = manager.case_dir(candidate.name(), alpha).join(coefficient_file);
            match read_case_record(&path, alpha) {
                Ok(record) => records.push(record),
                Err(source) => {
                    let error = EngineError::Parse {
                        context: label.clone(),
                        source,
                    };
                    record_failure(failures, reporter, label, error.to_string());
                }
            }
        }

        let table = PolarTable::from_records(candidate.name(), records);
        if table.is_empty() {
            warn!(candidate = candidate.name(), "No usable verification records.");
        } else {
            tables.push(table);
        }
    }
    tables
}

/// Derives pressure metrics per ranked candidate and re-ranks with the detail score.
///
/// Candidates without a cruise angle or without surface samples get no detail score and
/// are imputed by the scoring engine.
fn score_detailed(
    config: &PipelineConfig,
    manager: &CaseManager,
    ranking: &Ranking,
    reporter: &ProgressReporter,
) -> Result<(Vec<PressureMetrics>, Vec<ScoreRecord>), EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Pressure Analysis",
    });
    let detailed = &config.detailed;

    let mut rows: Vec<PressureMetrics> = ranking
        .metrics
        .iter()
        .map(|m| {
            let detailed_alpha = m
                .cruise_alpha
                .and_then(|cruise| pressure::nearest_angle(cruise, &detailed.angles));
            let stats = detailed_alpha.and_then(|alpha| {
                let case_dir = manager.case_dir(&m.airfoil, alpha);
                match read_latest_surface(&case_dir, &detailed.surfaces_dir, &detailed.surface_name) {
                    Ok(samples) => pressure::cp_statistics(&samples),
                    Err(e) => {
                        warn!(case = %case_label(&m.airfoil, alpha), error = %e, "No surface pressure samples.");
                        None
                    }
                }
            });
            PressureMetrics::new(m.airfoil.as_str(), m.cruise_alpha, detailed_alpha, stats)
        })
        .collect();
    pressure::score_pressure(&mut rows);

    let details: HashMap<String, f64> = rows
        .iter()
        .filter_map(|r| r.detail_score.map(|d| (r.airfoil.clone(), d)))
        .collect();
    if details.is_empty() {
        warn!("No candidate has a detail score; the detailed composite equals the composite.");
    }
    let detailed_scores = scoring::apply_detail(&ranking.scores, &details, &config.scoring);

    let output = &config.output;
    tables::write_rows(&output.stage_table(STAGE, &output.pressure_file), &rows)?;
    tables::write_rows(
        &output.stage_table(STAGE, &output.detailed_scores_file),
        &detailed_scores,
    )?;

    info!(
        with_samples = details.len(),
        candidates = rows.len(),
        "Detailed stage scored."
    );
    reporter.report(Progress::PhaseFinish);
    Ok((rows, detailed_scores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_mesh_only_mode_truncates_the_plan() {
        assert_eq!(ExecutionMode::MeshOnly.mesh_mode(), MeshMode::MeshOnly);
        assert_eq!(ExecutionMode::Full.mesh_mode(), MeshMode::Full);
        assert_eq!(ExecutionMode::PostProcessOnly.mesh_mode(), MeshMode::Full);
    }

    #[test]
    fn post_process_mode_never_invokes_solver() {
        assert!(ExecutionMode::Full.invokes_solver());
        assert!(ExecutionMode::MeshOnly.invokes_solver());
        assert!(!ExecutionMode::PostProcessOnly.invokes_solver());
    }

    #[test]
    fn default_options_run_everything_without_overwrite() {
        let options = VerifyOptions::default();
        assert_eq!(options.mode, ExecutionMode::Full);
        assert!(options.run_sweep);
        assert!(options.detailed);
        assert!(!options.overwrite);
    }
}
