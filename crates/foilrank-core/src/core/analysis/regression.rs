use super::stall::detect_stall;
use crate::core::models::record::RunRecord;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Insufficient data: {required} points required, {found} available")]
    InsufficientData { required: usize, found: usize },
    #[error("All points share the same angle; the slope is undefined")]
    DegenerateAbscissa,
}

/// Tunables of the two-pass lift-curve regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFitSettings {
    /// Lower bound of the fitting window in degrees.
    pub window_min: f64,
    /// Distance kept below the stall angle for the upper window bound.
    pub stall_margin: f64,
    /// Upper window bound used when no stall angle can be determined.
    pub fallback_upper: f64,
    /// Points whose first-pass residual exceeds this many Cl units are trimmed.
    pub residual_threshold: f64,
    pub min_points: usize,
    /// Rows are kept only if `0 < cd < cd_max`.
    pub cd_max: f64,
    /// Rows are kept only if `|cl| < cl_abs_max`.
    pub cl_abs_max: f64,
}

impl Default for LinearFitSettings {
    fn default() -> Self {
        Self {
            window_min: -4.0,
            stall_margin: 2.0,
            fallback_upper: 8.0,
            residual_threshold: 0.8,
            min_points: 3,
            cd_max: 5.0,
            cl_abs_max: 3.5,
        }
    }
}

/// Result of the final least-squares pass over the linear lift region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// dCl/dα per degree.
    pub slope: f64,
    pub intercept: f64,
    pub alpha_min: f64,
    pub alpha_max: f64,
    /// `None` when the fitted lift values have zero variance.
    pub r_squared: Option<f64>,
    pub points: usize,
}

/// Estimates the lift-curve slope of records sorted by ascending angle.
///
/// Implausible rows are discarded, the remaining rows are windowed to the pre-stall
/// region, and an ordinary least-squares line is fitted. Points far from that first line
/// are trimmed and the line is refitted; if trimming would leave too few points the
/// refit uses the untrimmed window instead.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] if the window holds fewer than
/// `settings.min_points` records.
pub fn fit_lift_curve(
    records: &[RunRecord],
    settings: &LinearFitSettings,
) -> Result<LinearFit, AnalysisError> {
    let sanitized: Vec<RunRecord> = records
        .iter()
        .copied()
        .filter(|r| r.cd() > 0.0 && r.cd() < settings.cd_max && r.cl().abs() < settings.cl_abs_max)
        .collect();

    let upper = detect_stall(&sanitized)
        .map(|s| s.alpha - settings.stall_margin)
        .unwrap_or(settings.fallback_upper);

    let window: Vec<(f64, f64)> = sanitized
        .iter()
        .filter(|r| r.alpha() >= settings.window_min && r.alpha() <= upper)
        .map(|r| (r.alpha(), r.cl()))
        .collect();

    if window.len() < settings.min_points {
        return Err(AnalysisError::InsufficientData {
            required: settings.min_points,
            found: window.len(),
        });
    }

    let (slope, intercept) = least_squares(&window)?;
    let trimmed: Vec<(f64, f64)> = window
        .iter()
        .copied()
        .filter(|&(a, cl)| (cl - (slope * a + intercept)).abs() <= settings.residual_threshold)
        .collect();

    let linear = if trimmed.len() < settings.min_points {
        trace!(
            kept = trimmed.len(),
            "Residual trimming left too few points; refitting the full window."
        );
        window
    } else {
        trimmed
    };

    let (slope, intercept) = least_squares(&linear)?;
    let r_squared = coefficient_of_determination(&linear, slope, intercept);
    let (alpha_min, alpha_max) = linear
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(a, _)| {
            (lo.min(a), hi.max(a))
        });

    Ok(LinearFit {
        slope,
        intercept,
        alpha_min,
        alpha_max,
        r_squared,
        points: linear.len(),
    })
}

fn least_squares(points: &[(f64, f64)]) -> Result<(f64, f64), AnalysisError> {
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
        let dx = x - mean_x;
        (sxy + dx * (y - mean_y), sxx + dx * dx)
    });

    if sxx == 0.0 {
        return Err(AnalysisError::DegenerateAbscissa);
    }
    let slope = sxy / sxx;
    Ok((slope, mean_y - slope * mean_x))
}

fn coefficient_of_determination(points: &[(f64, f64)], slope: f64, intercept: f64) -> Option<f64> {
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / points.len() as f64;
    let ss_total: f64 = points.iter().map(|&(_, y)| (y - mean_y).powi(2)).sum();
    if ss_total == 0.0 {
        return None;
    }
    let ss_residual: f64 = points
        .iter()
        .map(|&(x, y)| (y - (slope * x + intercept)).powi(2))
        .sum();
    Some(1.0 - ss_residual / ss_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-9;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() < TOLERANCE
    }

    fn record(alpha: f64, cl: f64) -> RunRecord {
        RunRecord::new(alpha, cl, 0.01, 0.0)
    }

    #[test]
    fn exact_line_is_recovered_with_unit_r_squared() {
        let records: Vec<_> = (-4..=8)
            .map(|a| record(a as f64, 0.09 * a as f64 + 0.2))
            .collect();
        let fit = fit_lift_curve(&records, &LinearFitSettings::default()).unwrap();

        assert!((fit.slope - 0.09).abs() < 1e-6);
        assert!(f64_approx_equal(fit.intercept, 0.2));
        assert!(f64_approx_equal(fit.r_squared.unwrap(), 1.0));
        // Stall is at 8 degrees, so the window stops at 6.
        assert_eq!(fit.alpha_min, -4.0);
        assert_eq!(fit.alpha_max, 6.0);
        assert_eq!(fit.points, 11);
    }

    #[test]
    fn outlier_is_trimmed_before_the_final_fit() {
        let mut records: Vec<_> = (-4..=6)
            .map(|a| record(a as f64, 0.1 * a as f64))
            .collect();
        records[2] = record(-2.0, 2.0);
        records.push(record(12.0, 3.0));

        let fit = fit_lift_curve(&records, &LinearFitSettings::default()).unwrap();
        assert!(f64_approx_equal(fit.slope, 0.1));
        assert_eq!(fit.points, 10);
    }

    #[test]
    fn implausible_rows_are_sanitized_away() {
        let mut records: Vec<_> = (0..=6)
            .map(|a| record(a as f64, 0.1 * a as f64))
            .collect();
        records.push(RunRecord::new(7.0, 0.7, 0.0, 0.0));
        records.push(RunRecord::new(9.0, 5.0, 0.01, 0.0));

        let fit = fit_lift_curve(&records, &LinearFitSettings::default()).unwrap();
        assert!(f64_approx_equal(fit.slope, 0.1));
        assert_eq!(fit.alpha_max, 4.0);
    }

    #[test]
    fn too_few_points_in_window_is_insufficient() {
        let records = vec![record(0.0, 0.1), record(2.0, 0.3), record(4.0, 0.5)];
        let result = fit_lift_curve(&records, &LinearFitSettings::default());
        assert_eq!(
            result,
            Err(AnalysisError::InsufficientData {
                required: 3,
                found: 2
            })
        );
    }

    #[test]
    fn flat_lift_has_undefined_r_squared() {
        let mut records: Vec<_> = (0..6).map(|a| record(a as f64, 0.5)).collect();
        records.push(record(8.0, 0.6));
        let fit = fit_lift_curve(&records, &LinearFitSettings::default()).unwrap();
        assert!(f64_approx_equal(fit.slope, 0.0));
        assert_eq!(fit.r_squared, None);
    }
}
