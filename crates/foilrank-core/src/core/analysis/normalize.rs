use itertools::{Itertools, MinMaxResult};

/// Value assigned to entries that carry no information about their rank.
pub const NEUTRAL: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Min-max rescales a metric column to `[0, 1]` so that 1 is always the best value.
///
/// Missing and non-finite entries are treated alike. If no finite value exists, or all
/// finite values are equal, every entry maps to [`NEUTRAL`]. Otherwise each finite entry
/// is scaled linearly between the column extremes (inverted for
/// [`Direction::LowerIsBetter`]) and each missing entry is [`NEUTRAL`].
pub fn normalize(column: &[Option<f64>], direction: Direction) -> Vec<f64> {
    let finite = |v: &Option<f64>| v.filter(|x| x.is_finite());

    let (lo, hi) = match column.iter().filter_map(finite).minmax() {
        MinMaxResult::MinMax(lo, hi) if hi > lo => (lo, hi),
        _ => return vec![NEUTRAL; column.len()],
    };

    column
        .iter()
        .map(|v| match finite(v) {
            Some(x) => {
                let scaled = (x - lo) / (hi - lo);
                match direction {
                    Direction::HigherIsBetter => scaled,
                    Direction::LowerIsBetter => 1.0 - scaled,
                }
            }
            None => NEUTRAL,
        })
        .collect()
}
