use nalgebra::Point2;

/// An airfoil section under evaluation.
///
/// A candidate is immutable once constructed: every derived artifact (case directories,
/// scripts, surface files) is produced from the values captured here.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    name: String,
    chord: f64,
    velocity: f64,
    geometry: Vec<Point2<f64>>,
}

impl Candidate {
    /// Creates a candidate.
    ///
    /// # Arguments
    ///
    /// * `name` - Identity of the candidate, used as directory and table key.
    /// * `chord` - Reference length in metres that unit-chord coordinates are scaled by.
    /// * `velocity` - Free-stream velocity in m/s shared by every condition of the sweep.
    /// * `geometry` - Ordered unit-chord surface coordinates.
    pub fn new(
        name: impl Into<String>,
        chord: f64,
        velocity: f64,
        geometry: Vec<Point2<f64>>,
    ) -> Self {
        Self {
            name: name.into(),
            chord,
            velocity,
            geometry,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chord(&self) -> f64 {
        self.chord
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn geometry(&self) -> &[Point2<f64>] {
        &self.geometry
    }

    /// Geometry scaled from unit chord to the candidate's reference chord.
    pub fn scaled_geometry(&self) -> Vec<Point2<f64>> {
        self.geometry.iter().map(|p| p * self.chord).collect()
    }
}
