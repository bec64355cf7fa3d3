//! # Workflows Module
//!
//! End-to-end procedures built on the engine and the core analysis functions.
//!
//! - **Screening Workflow** ([`screen`]) - one panel-solver sweep per candidate, then
//!   metrics and ranking.
//! - **Verification Workflow** ([`verify`]) - one field-solver case per candidate and
//!   angle, then metrics and ranking, with an optional detailed pressure-distribution stage.
//!
//! Both workflows keep going when a single candidate or case fails. Failures are logged,
//! reported through the progress callback and returned alongside the results; only a
//! stage with no usable records at all ends with an error.

pub mod screen;
pub mod verify;

use crate::core::analysis::metrics::{MetricsRecord, compute_metrics};
use crate::core::analysis::scoring::{self, ScoreRecord};
use crate::core::io::dat::GeometryError;
use crate::core::io::tables;
use crate::core::io::traits::GeometryProvider;
use crate::core::models::candidate::Candidate;
use crate::core::models::record::PolarTable;
use crate::engine::config::PipelineConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use tracing::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A candidate or case that was excluded from a stage, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseFailure {
    pub case: String,
    pub reason: String,
}

/// Metrics and ranking of the candidates that produced records.
#[derive(Debug, Clone, Default)]
pub struct Ranking {
    pub metrics: Vec<MetricsRecord>,
    pub scores: Vec<ScoreRecord>,
}

pub(crate) fn record_failure(
    failures: &mut Vec<CaseFailure>,
    reporter: &ProgressReporter,
    case: impl Into<String>,
    reason: impl Into<String>,
) {
    let failure = CaseFailure {
        case: case.into(),
        reason: reason.into(),
    };
    warn!(case = %failure.case, reason = %failure.reason, "Excluding case.");
    reporter.report(Progress::CaseFailed {
        case: failure.case.clone(),
        reason: failure.reason.clone(),
    });
    failures.push(failure);
}

/// Loads every configured candidate, excluding those without usable geometry.
pub(crate) fn load_candidates<G>(
    config: &PipelineConfig,
    provider: &G,
    reporter: &ProgressReporter,
    failures: &mut Vec<CaseFailure>,
) -> Vec<Candidate>
where
    G: GeometryProvider<Error = GeometryError>,
{
    reporter.report(Progress::PhaseStart {
        name: "Loading Geometry",
    });
    let mut candidates = Vec::with_capacity(config.candidates.len());
    for name in &config.candidates {
        match provider.load(name) {
            Ok(points) => candidates.push(Candidate::new(
                name.as_str(),
                config.flow.chord,
                config.flow.velocity,
                points,
            )),
            Err(source) => {
                let error = EngineError::Geometry {
                    candidate: name.clone(),
                    source,
                };
                record_failure(failures, reporter, name.as_str(), error.to_string());
            }
        }
    }
    info!(
        loaded = candidates.len(),
        requested = config.candidates.len(),
        "Candidate geometry loaded."
    );
    reporter.report(Progress::PhaseFinish);
    candidates
}

/// Runs `f` over every item, on the rayon pool when the `parallel` feature is enabled.
/// Results keep the order of `items`.
pub(crate) fn map_cases<T, R, F>(items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(not(feature = "parallel"))]
    let iterator = items.iter();

    #[cfg(feature = "parallel")]
    let iterator = items.par_iter();

    iterator.map(f).collect()
}

/// Reduces every non-empty table to metrics, scores them and writes both tables.
///
/// # Errors
///
/// Returns [`EngineError::NoUsableRecords`] if every table is empty; nothing is scored or
/// written in that case.
pub(crate) fn rank(
    tables: &[PolarTable],
    config: &PipelineConfig,
    stage: &'static str,
    reporter: &ProgressReporter,
) -> Result<Ranking, EngineError> {
    let usable: Vec<&PolarTable> = tables.iter().filter(|t| !t.is_empty()).collect();
    if usable.is_empty() {
        return Err(EngineError::NoUsableRecords { stage });
    }

    reporter.report(Progress::PhaseStart { name: "Scoring" });
    let metrics: Vec<MetricsRecord> = usable
        .iter()
        .map(|table| compute_metrics(table, &config.metrics))
        .collect();
    let scores = scoring::score(&metrics, &config.scoring);

    let output = &config.output;
    tables::write_rows(&output.stage_table(stage, &output.metrics_file), &metrics)?;
    tables::write_rows(&output.stage_table(stage, &output.scores_file), &scores)?;

    if let Some(best) = scores.first() {
        info!(
            stage,
            candidates = scores.len(),
            best = %best.airfoil,
            composite = best.composite,
            "Ranking complete."
        );
    }
    reporter.report(Progress::PhaseFinish);
    Ok(Ranking { metrics, scores })
}
