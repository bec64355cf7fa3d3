use super::{CaseFailure, Ranking, load_candidates, map_cases, rank, record_failure};
use crate::core::io::dat::DatDirectory;
use crate::core::io::polar::PanelPolarFile;
use crate::core::io::tables;
use crate::core::models::candidate::Candidate;
use crate::core::models::record::PolarTable;
use crate::engine::config::PipelineConfig;
use crate::engine::error::EngineError;
use crate::engine::process::ProcessRunner;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::solver::panel::PanelSolver;
use crate::engine::solver::{InvocationOutcome, SolverInvoker};
use tracing::{info, instrument, warn};

pub const STAGE: &str = "screening";

#[derive(Debug, Clone, Default)]
pub struct ScreeningResult {
    /// One polar per candidate that produced at least one usable row, in configured order.
    pub tables: Vec<PolarTable>,
    pub ranking: Ranking,
    pub failures: Vec<CaseFailure>,
}

/// Sweeps every candidate through the panel solver and ranks the resulting polars.
///
/// Each candidate is one batch invocation covering the whole configured angle range. The
/// parsed polar is written to `<processed>/<name>_polar.csv`; the combined results,
/// metrics and scores go under `<processed>/screening/`.
///
/// # Errors
///
/// Returns [`EngineError::NoUsableRecords`] if no candidate produced a usable polar, or an
/// I/O or table error if the outputs cannot be written.
#[instrument(skip_all, name = "screening_workflow")]
pub fn run(
    config: &PipelineConfig,
    runner: &dyn ProcessRunner,
    reporter: &ProgressReporter,
) -> Result<ScreeningResult, EngineError> {
    let mut failures = Vec::new();
    let provider = DatDirectory::new(&config.geometry_dir);
    let candidates = load_candidates(config, &provider, reporter, &mut failures);

    let reynolds = config.flow.reynolds();
    info!(
        candidates = candidates.len(),
        reynolds = reynolds as i64,
        sweep_start = config.panel.sweep.start,
        sweep_end = config.panel.sweep.end,
        "Starting panel-solver screening."
    );
    let solver = PanelSolver::new(
        runner,
        config.panel.clone(),
        &config.output.raw_dir,
        reynolds,
        config.flow.mach,
    );

    reporter.report(Progress::PhaseStart {
        name: "Panel Sweep",
    });
    reporter.report(Progress::TaskStart {
        total_steps: candidates.len() as u64,
    });
    let outcomes = map_cases(&candidates, |candidate| {
        let outcome = screen_candidate(&solver, candidate);
        reporter.report(Progress::TaskIncrement);
        outcome
    });
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    let mut polars = Vec::with_capacity(candidates.len());
    for (candidate, outcome) in candidates.iter().zip(outcomes) {
        match outcome {
            Ok(table) if table.is_empty() => {
                record_failure(&mut failures, reporter, candidate.name(), "polar has no usable rows");
            }
            Ok(table) => {
                let path = config
                    .output
                    .processed(&format!("{}_polar.csv", candidate.name()));
                tables::write_polar_table(&path, &table)?;
                info!(candidate = candidate.name(), rows = table.len(), "Polar processed.");
                polars.push(table);
            }
            Err(e) => record_failure(&mut failures, reporter, candidate.name(), e.to_string()),
        }
    }

    if polars.is_empty() {
        return Err(EngineError::NoUsableRecords { stage: STAGE });
    }
    let output = &config.output;
    tables::write_combined_tables(&output.stage_table(STAGE, &output.results_file), &polars)?;

    let ranking = rank(&polars, config, STAGE, reporter)?;
    info!(
        usable = polars.len(),
        failed = failures.len(),
        "Screening workflow complete."
    );
    Ok(ScreeningResult {
        tables: polars,
        ranking,
        failures,
    })
}

fn screen_candidate(solver: &PanelSolver<'_>, candidate: &Candidate) -> Result<PolarTable, EngineError> {
    let result = solver.invoke(candidate)?;
    match result.outcome() {
        InvocationOutcome::Failed => {
            return Err(EngineError::InvocationFailure {
                case: candidate.name().to_string(),
                reason: result.failure_reason(),
            });
        }
        InvocationOutcome::Warning => warn!(
            candidate = candidate.name(),
            exit_code = ?result.exit_code,
            "Panel solver exited with an error but wrote its polar; using it."
        ),
        InvocationOutcome::Clean => {}
    }

    let records =
        PanelPolarFile::read_existing(&result.artifact).map_err(|source| EngineError::Parse {
            context: result.artifact.display().to_string(),
            source,
        })?;
    Ok(PolarTable::from_records(candidate.name(), records))
}
