use crate::core::models::record::{PolarTable, RunRecord};

/// Angle range representing level cruise flight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CruiseBand {
    pub min: f64,
    pub max: f64,
}

impl Default for CruiseBand {
    fn default() -> Self {
        Self { min: 2.0, max: 8.0 }
    }
}

/// Best lift-to-drag ratio and the angle it occurs at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyPeak {
    pub alpha: f64,
    pub cl_cd: f64,
}

fn peak<'a>(records: impl Iterator<Item = &'a RunRecord>) -> Option<EfficiencyPeak> {
    records
        .filter(|r| r.cl_cd().is_finite())
        .fold(None, |best: Option<EfficiencyPeak>, r| match best {
            Some(b) if b.cl_cd >= r.cl_cd() => Some(b),
            _ => Some(EfficiencyPeak {
                alpha: r.alpha(),
                cl_cd: r.cl_cd(),
            }),
        })
}

/// Maximum Cl/Cd inside the cruise band; `None` if the band holds no usable record.
pub fn cruise_peak(table: &PolarTable, band: &CruiseBand) -> Option<EfficiencyPeak> {
    peak(table.within(band.min, band.max))
}

/// Maximum Cl/Cd over the whole sweep.
pub fn overall_peak(table: &PolarTable) -> Option<EfficiencyPeak> {
    peak(table.records().iter())
}

pub fn min_cd(table: &PolarTable) -> Option<f64> {
    table.records().iter().map(RunRecord::cd).reduce(f64::min)
}
