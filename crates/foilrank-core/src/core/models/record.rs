use tracing::debug;

/// Coefficients recovered from one solver run at one angle of attack.
///
/// Records are built by the extractors and never mutated afterwards; the optional fields
/// are only reported by some solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunRecord {
    alpha: f64,
    cl: f64,
    cd: f64,
    cm: f64,
    cdp: Option<f64>,
    top_xtr: Option<f64>,
    bot_xtr: Option<f64>,
    time: Option<f64>,
    success: bool,
}

impl RunRecord {
    pub fn new(alpha: f64, cl: f64, cd: f64, cm: f64) -> Self {
        Self {
            alpha,
            cl,
            cd,
            cm,
            cdp: None,
            top_xtr: None,
            bot_xtr: None,
            time: None,
            success: true,
        }
    }

    pub fn with_pressure_drag(mut self, cdp: f64) -> Self {
        self.cdp = Some(cdp);
        self
    }

    pub fn with_transition(mut self, top_xtr: f64, bot_xtr: f64) -> Self {
        self.top_xtr = Some(top_xtr);
        self.bot_xtr = Some(bot_xtr);
        self
    }

    pub fn with_time(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_success(mut self, success: bool) -> Self {
        self.success = success;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
    pub fn cl(&self) -> f64 {
        self.cl
    }
    pub fn cd(&self) -> f64 {
        self.cd
    }
    pub fn cm(&self) -> f64 {
        self.cm
    }
    pub fn cdp(&self) -> Option<f64> {
        self.cdp
    }
    pub fn top_xtr(&self) -> Option<f64> {
        self.top_xtr
    }
    pub fn bot_xtr(&self) -> Option<f64> {
        self.bot_xtr
    }
    pub fn time(&self) -> Option<f64> {
        self.time
    }
    pub fn success(&self) -> bool {
        self.success
    }

    /// Lift-to-drag ratio. Infinite or NaN when `cd` is zero.
    pub fn cl_cd(&self) -> f64 {
        self.cl / self.cd
    }

    fn is_finite(&self) -> bool {
        self.alpha.is_finite() && self.cl.is_finite() && self.cd.is_finite() && self.cm.is_finite()
    }
}

/// All run records of one candidate, sorted by ascending angle of attack.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PolarTable {
    candidate: String,
    records: Vec<RunRecord>,
}

impl PolarTable {
    /// Builds a table from unordered records.
    ///
    /// Rows with non-finite coefficients are dropped rather than kept as holes, and when
    /// an angle appears more than once the first record seen for it is kept.
    pub fn from_records(candidate: impl Into<String>, records: Vec<RunRecord>) -> Self {
        let candidate = candidate.into();
        let total = records.len();

        let mut records: Vec<RunRecord> = records.into_iter().filter(RunRecord::is_finite).collect();
        records.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
        records.dedup_by(|later, earlier| later.alpha == earlier.alpha);

        if records.len() != total {
            debug!(
                candidate = %candidate,
                kept = records.len(),
                dropped = total - records.len(),
                "Dropped non-finite or duplicate polar rows."
            );
        }

        Self { candidate, records }
    }

    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn records(&self) -> &[RunRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose angle lies in the closed interval `[min, max]`.
    pub fn within(&self, min: f64, max: f64) -> impl Iterator<Item = &RunRecord> {
        self.records
            .iter()
            .filter(move |r| r.alpha >= min && r.alpha <= max)
    }

    /// A new table holding only the records accepted by `keep`.
    pub fn filtered(&self, keep: impl Fn(&RunRecord) -> bool) -> Self {
        Self {
            candidate: self.candidate.clone(),
            records: self.records.iter().copied().filter(|r| keep(r)).collect(),
        }
    }
}
