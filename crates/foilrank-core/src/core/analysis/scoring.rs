use super::metrics::MetricsRecord;
use super::normalize::{Direction, normalize};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq, Clone)]
#[error("Weights of group '{group}' sum to {sum}, expected 1.0")]
pub struct WeightError {
    pub group: &'static str,
    pub sum: f64,
}

fn check_group(group: &'static str, weights: &[f64]) -> Result<(), WeightError> {
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE || weights.iter().any(|w| *w < 0.0) {
        return Err(WeightError { group, sum });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityWeights {
    pub stall_angle: f64,
    pub post_stall_drop: f64,
    pub slope_deviation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyWeights {
    pub cruise_cl_cd: f64,
    pub min_cd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverabilityWeights {
    pub slope: f64,
    pub cl_max: f64,
    pub load_index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeWeights {
    pub stability: f64,
    pub efficiency: f64,
    pub maneuverability: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailedWeights {
    pub stability: f64,
    pub efficiency: f64,
    pub maneuverability: f64,
    pub detail: f64,
}

/// Every weight group of the scoring engine, plus the preferred lift-curve slope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub stability: StabilityWeights,
    pub efficiency: EfficiencyWeights,
    pub maneuverability: ManeuverabilityWeights,
    pub composite: CompositeWeights,
    pub detailed: DetailedWeights,
    /// Preferred dCl/dα in 1/deg.
    pub slope_target: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            stability: StabilityWeights {
                stall_angle: 0.4,
                post_stall_drop: 0.4,
                slope_deviation: 0.2,
            },
            efficiency: EfficiencyWeights {
                cruise_cl_cd: 0.7,
                min_cd: 0.3,
            },
            maneuverability: ManeuverabilityWeights {
                slope: 0.4,
                cl_max: 0.3,
                load_index: 0.3,
            },
            composite: CompositeWeights {
                stability: 0.4,
                efficiency: 0.3,
                maneuverability: 0.3,
            },
            detailed: DetailedWeights {
                stability: 0.35,
                efficiency: 0.25,
                maneuverability: 0.25,
                detail: 0.15,
            },
            slope_target: 0.10,
        }
    }
}

impl ScoringWeights {
    /// Checks that each group is non-negative and sums to 1.
    pub fn validate(&self) -> Result<(), WeightError> {
        let s = &self.stability;
        check_group("stability", &[s.stall_angle, s.post_stall_drop, s.slope_deviation])?;
        let e = &self.efficiency;
        check_group("efficiency", &[e.cruise_cl_cd, e.min_cd])?;
        let m = &self.maneuverability;
        check_group("maneuverability", &[m.slope, m.cl_max, m.load_index])?;
        let c = &self.composite;
        check_group("composite", &[c.stability, c.efficiency, c.maneuverability])?;
        let d = &self.detailed;
        check_group(
            "detailed",
            &[d.stability, d.efficiency, d.maneuverability, d.detail],
        )
    }
}

/// Normalized sub-metrics, axis scores and composites of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreRecord {
    pub rank: usize,
    pub airfoil: String,
    pub n_alpha_stall: f64,
    pub n_post_stall_drop: f64,
    pub n_slope_deviation: f64,
    pub n_cruise_cl_cd: f64,
    pub n_min_cd: f64,
    pub n_slope: f64,
    pub n_cl_max: f64,
    pub n_load_index: f64,
    pub stability: f64,
    pub efficiency: f64,
    pub maneuverability: f64,
    pub composite: f64,
    pub detail_score: Option<f64>,
    pub detail_imputed: bool,
    pub detailed_composite: Option<f64>,
}

fn column(metrics: &[MetricsRecord], get: impl Fn(&MetricsRecord) -> Option<f64>) -> Vec<Option<f64>> {
    metrics.iter().map(get).collect()
}

/// Scores and ranks candidates by composite, best first. Equal composites keep input order.
pub fn score(metrics: &[MetricsRecord], weights: &ScoringWeights) -> Vec<ScoreRecord> {
    use Direction::{HigherIsBetter as Up, LowerIsBetter as Down};

    let n_alpha_stall = normalize(&column(metrics, |m| m.alpha_stall), Up);
    let n_drop = normalize(&column(metrics, |m| m.post_stall_drop), Down);
    let n_deviation = normalize(
        &column(metrics, |m| {
            m.lift_curve_slope.map(|s| (s - weights.slope_target).abs())
        }),
        Down,
    );
    let n_cruise = normalize(&column(metrics, |m| m.cruise_cl_cd_max), Up);
    let n_min_cd = normalize(&column(metrics, |m| m.min_cd), Down);
    let n_slope = normalize(&column(metrics, |m| m.lift_curve_slope), Up);
    let n_cl_max = normalize(&column(metrics, |m| m.cl_max), Up);
    let n_load = normalize(&column(metrics, |m| m.load_index), Down);

    let (sw, ew, mw, cw) = (
        &weights.stability,
        &weights.efficiency,
        &weights.maneuverability,
        &weights.composite,
    );

    let mut scores: Vec<ScoreRecord> = metrics
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let stability = sw.stall_angle * n_alpha_stall[i]
                + sw.post_stall_drop * n_drop[i]
                + sw.slope_deviation * n_deviation[i].clamp(0.0, 1.0);
            let efficiency = ew.cruise_cl_cd * n_cruise[i] + ew.min_cd * n_min_cd[i];
            let maneuverability =
                mw.slope * n_slope[i] + mw.cl_max * n_cl_max[i] + mw.load_index * n_load[i];
            let composite = cw.stability * stability
                + cw.efficiency * efficiency
                + cw.maneuverability * maneuverability;

            ScoreRecord {
                rank: 0,
                airfoil: m.airfoil.clone(),
                n_alpha_stall: n_alpha_stall[i],
                n_post_stall_drop: n_drop[i],
                n_slope_deviation: n_deviation[i],
                n_cruise_cl_cd: n_cruise[i],
                n_min_cd: n_min_cd[i],
                n_slope: n_slope[i],
                n_cl_max: n_cl_max[i],
                n_load_index: n_load[i],
                stability,
                efficiency,
                maneuverability,
                composite,
                detail_score: None,
                detail_imputed: false,
                detailed_composite: None,
            }
        })
        .collect();

    scores.sort_by(|a, b| b.composite.total_cmp(&a.composite));
    assign_ranks(&mut scores);
    scores
}

/// Folds detail scores into the ranking and re-ranks by detailed composite, best first.
///
/// Candidates missing from `details` get the mean of the available detail scores. If no
/// candidate has one, the detailed composite equals the composite.
pub fn apply_detail(
    scores: &[ScoreRecord],
    details: &HashMap<String, f64>,
    weights: &ScoringWeights,
) -> Vec<ScoreRecord> {
    let available: Vec<f64> = scores
        .iter()
        .filter_map(|s| details.get(&s.airfoil).copied())
        .filter(|d| d.is_finite())
        .collect();

    let dw = &weights.detailed;
    let mut ranked: Vec<ScoreRecord> = if available.is_empty() {
        scores
            .iter()
            .cloned()
            .map(|mut s| {
                s.detailed_composite = Some(s.composite);
                s
            })
            .collect()
    } else {
        let mean = available.iter().sum::<f64>() / available.len() as f64;
        scores
            .iter()
            .cloned()
            .map(|mut s| {
                let own = details.get(&s.airfoil).copied().filter(|d| d.is_finite());
                let detail = own.unwrap_or(mean);
                s.detail_score = Some(detail);
                s.detail_imputed = own.is_none();
                s.detailed_composite = Some(
                    dw.stability * s.stability
                        + dw.efficiency * s.efficiency
                        + dw.maneuverability * s.maneuverability
                        + dw.detail * detail,
                );
                s
            })
            .collect()
    };

    ranked.sort_by(|a, b| {
        let key = |s: &ScoreRecord| s.detailed_composite.unwrap_or(s.composite);
        key(b).total_cmp(&key(a))
    });
    assign_ranks(&mut ranked);
    ranked
}

fn assign_ranks(scores: &mut [ScoreRecord]) {
    for (i, s) in scores.iter_mut().enumerate() {
        s.rank = i + 1;
    }
}
