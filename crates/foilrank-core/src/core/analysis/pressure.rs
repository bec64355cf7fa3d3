use super::normalize::{Direction, normalize};
use crate::core::io::surface::CpSample;
use serde::Serialize;

/// Spread and suction peak of one surface pressure distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpStatistics {
    /// Sample standard deviation (n − 1 denominator).
    pub std_dev: f64,
    pub min: f64,
}

/// Returns `None` for fewer than two samples.
pub fn cp_statistics(samples: &[CpSample]) -> Option<CpStatistics> {
    if samples.len() < 2 {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|s| s.cp).sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s.cp - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let min = samples.iter().map(|s| s.cp).fold(f64::INFINITY, f64::min);
    Some(CpStatistics {
        std_dev: variance.sqrt(),
        min,
    })
}

/// The available angle closest to `target`; the smaller angle wins exact ties.
pub fn nearest_angle(target: f64, available: &[f64]) -> Option<f64> {
    available
        .iter()
        .copied()
        .filter(|a| a.is_finite())
        .min_by(|a, b| {
            (a - target)
                .abs()
                .total_cmp(&(b - target).abs())
                .then(a.total_cmp(b))
        })
}

/// Pressure-distribution metrics of one candidate from the detailed stage.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PressureMetrics {
    pub airfoil: String,
    pub cruise_alpha: Option<f64>,
    pub detailed_alpha: Option<f64>,
    pub cp_std: Option<f64>,
    pub cp_min: Option<f64>,
    pub uniformity: Option<f64>,
    pub gentleness: Option<f64>,
    pub detail_score: Option<f64>,
}

impl PressureMetrics {
    pub fn new(
        airfoil: impl Into<String>,
        cruise_alpha: Option<f64>,
        detailed_alpha: Option<f64>,
        stats: Option<CpStatistics>,
    ) -> Self {
        Self {
            airfoil: airfoil.into(),
            cruise_alpha,
            detailed_alpha,
            cp_std: stats.map(|s| s.std_dev),
            cp_min: stats.map(|s| s.min),
            ..Default::default()
        }
    }

    pub fn has_samples(&self) -> bool {
        self.cp_std.is_some() && self.cp_min.is_some()
    }
}

/// Scores every candidate that has pressure samples.
///
/// A lower Cp spread is more uniform; a higher (less negative) Cp minimum is a gentler
/// suction peak. The detail score averages the two. Rows without samples keep `None`.
pub fn score_pressure(rows: &mut [PressureMetrics]) {
    let std_column: Vec<Option<f64>> = rows.iter().map(|r| r.cp_std).collect();
    let min_column: Vec<Option<f64>> = rows.iter().map(|r| r.cp_min).collect();
    let uniformity = normalize(&std_column, Direction::LowerIsBetter);
    let gentleness = normalize(&min_column, Direction::HigherIsBetter);

    for ((row, u), g) in rows.iter_mut().zip(uniformity).zip(gentleness) {
        if !row.has_samples() {
            continue;
        }
        row.uniformity = Some(u);
        row.gentleness = Some(g);
        row.detail_score = Some(0.5 * u + 0.5 * g);
    }
}
