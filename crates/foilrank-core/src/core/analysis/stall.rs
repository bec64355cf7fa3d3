use crate::core::models::record::RunRecord;

/// Maximum-lift point of a polar and the lift lost past it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StallPoint {
    pub alpha: f64,
    pub cl_max: f64,
    /// `cl_max` minus the lowest lift at any larger angle; `None` when no angle lies past
    /// the stall angle.
    pub post_stall_drop: Option<f64>,
}

/// Locates the stall point of records sorted by ascending angle.
///
/// The first record holding the maximum lift wins ties. Returns `None` for an empty slice.
pub fn detect_stall(records: &[RunRecord]) -> Option<StallPoint> {
    let peak = records.iter().fold(None::<&RunRecord>, |best, r| match best {
        Some(b) if b.cl() >= r.cl() => Some(b),
        _ => Some(r),
    })?;

    let post_stall_drop = records
        .iter()
        .filter(|r| r.alpha() > peak.alpha())
        .map(RunRecord::cl)
        .reduce(f64::min)
        .map(|cl_min| peak.cl() - cl_min);

    Some(StallPoint {
        alpha: peak.alpha(),
        cl_max: peak.cl(),
        post_stall_drop,
    })
}
