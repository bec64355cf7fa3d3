use super::efficiency::{self, CruiseBand};
use super::regression::{self, LinearFitSettings};
use super::stall;
use crate::core::models::record::PolarTable;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricsSettings {
    pub fit: LinearFitSettings,
    pub cruise: CruiseBand,
}

/// Derived behaviour metrics of one candidate. Every value that cannot be determined from
/// the polar is `None` and is written as an empty CSV cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MetricsRecord {
    pub airfoil: String,
    pub alpha_stall: Option<f64>,
    pub cl_max: Option<f64>,
    pub post_stall_drop: Option<f64>,
    pub lift_curve_slope: Option<f64>,
    pub lift_intercept: Option<f64>,
    pub alpha_linear_min: Option<f64>,
    pub alpha_linear_max: Option<f64>,
    pub linear_fit_r2: Option<f64>,
    pub cruise_cl_cd_max: Option<f64>,
    pub cruise_alpha: Option<f64>,
    pub max_cl_cd: Option<f64>,
    pub min_cd: Option<f64>,
    pub load_index: Option<f64>,
}

/// Reduces one candidate's polar to its metrics row.
pub fn compute_metrics(table: &PolarTable, settings: &MetricsSettings) -> MetricsRecord {
    let stall = stall::detect_stall(table.records());
    let fit = match regression::fit_lift_curve(table.records(), &settings.fit) {
        Ok(fit) => Some(fit),
        Err(e) => {
            debug!(candidate = table.candidate(), reason = %e, "Lift-curve slope is undefined.");
            None
        }
    };
    let cruise = efficiency::cruise_peak(table, &settings.cruise);

    let cl_max = stall.map(|s| s.cl_max);
    let slope = fit.map(|f| f.slope);

    MetricsRecord {
        airfoil: table.candidate().to_string(),
        alpha_stall: stall.map(|s| s.alpha),
        cl_max,
        post_stall_drop: stall.and_then(|s| s.post_stall_drop),
        lift_curve_slope: slope,
        lift_intercept: fit.map(|f| f.intercept),
        alpha_linear_min: fit.map(|f| f.alpha_min),
        alpha_linear_max: fit.map(|f| f.alpha_max),
        linear_fit_r2: fit.and_then(|f| f.r_squared),
        cruise_cl_cd_max: cruise.map(|p| p.cl_cd),
        cruise_alpha: cruise.map(|p| p.alpha),
        max_cl_cd: efficiency::overall_peak(table).map(|p| p.cl_cd),
        min_cd: efficiency::min_cd(table),
        load_index: slope.zip(cl_max).map(|(s, c)| s * c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::record::RunRecord;

    fn synthetic_polar() -> PolarTable {
        let mut records: Vec<_> = (-4..=10)
            .map(|a| {
                let a = a as f64;
                RunRecord::new(a, 0.25 + 0.1 * a, 0.008 + 0.0005 * a * a, -0.05)
            })
            .collect();
        records.push(RunRecord::new(12.0, 1.0, 0.05, -0.05));
        records.push(RunRecord::new(14.0, 0.9, 0.08, -0.05));
        PolarTable::from_records("S1223", records)
    }

    #[test]
    fn full_polar_yields_every_metric() {
        let m = compute_metrics(&synthetic_polar(), &MetricsSettings::default());

        assert_eq!(m.airfoil, "S1223");
        assert_eq!(m.alpha_stall, Some(10.0));
        assert_eq!(m.cl_max, Some(1.25));
        assert!((m.post_stall_drop.unwrap() - 0.35).abs() < 1e-9);
        assert!((m.lift_curve_slope.unwrap() - 0.1).abs() < 1e-9);
        assert_eq!(m.alpha_linear_max, Some(8.0));
        assert!(m.cruise_alpha.unwrap() >= 2.0 && m.cruise_alpha.unwrap() <= 8.0);
        assert!((m.load_index.unwrap() - 0.125).abs() < 1e-9);
        assert_eq!(m.min_cd, Some(0.008));
    }

    #[test]
    fn sparse_polar_leaves_fit_metrics_undefined() {
        let table = PolarTable::from_records(
            "THIN",
            vec![
                RunRecord::new(0.0, 0.1, 0.01, 0.0),
                RunRecord::new(1.0, 0.2, 0.01, 0.0),
            ],
        );
        let m = compute_metrics(&table, &MetricsSettings::default());

        assert_eq!(m.alpha_stall, Some(1.0));
        assert_eq!(m.post_stall_drop, None);
        assert_eq!(m.lift_curve_slope, None);
        assert_eq!(m.load_index, None);
        assert_eq!(m.cruise_cl_cd_max, None);
    }

    #[test]
    fn empty_polar_is_all_undefined() {
        let m = compute_metrics(&PolarTable::default(), &MetricsSettings::default());
        assert_eq!(m.alpha_stall, None);
        assert_eq!(m.min_cd, None);
        assert_eq!(m.max_cl_cd, None);
    }
}
