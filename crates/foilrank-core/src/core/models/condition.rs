use nalgebra::Vector3;

const ANGLE_DECIMALS: f64 = 1e6;

/// Free-stream properties shared by every case of a study.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConditions {
    /// Fluid density in kg/m³.
    pub density: f64,
    /// Dynamic viscosity in kg/(m·s).
    pub dynamic_viscosity: f64,
    /// Free-stream velocity in m/s.
    pub velocity: f64,
    /// Reference chord in m.
    pub chord: f64,
    pub mach: f64,
}

impl FlowConditions {
    /// Chord-based Reynolds number, `ρ·V·c / μ`.
    pub fn reynolds(&self) -> f64 {
        self.density * self.velocity * self.chord / self.dynamic_viscosity
    }
}

impl Default for FlowConditions {
    fn default() -> Self {
        Self {
            density: 1.225,
            dynamic_viscosity: 1.8e-5,
            velocity: 30.0,
            chord: 0.1969,
            mach: 0.0,
        }
    }
}

/// Inclusive angle-of-attack range in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSweep {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl AngleSweep {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Expands the sweep into its angles. Accumulated floating error is rounded away so
    /// that `-5.0..=18.0` by `0.5` yields exactly representable labels.
    ///
    /// Returns an empty list for a non-positive step or an inverted range.
    pub fn angles(&self) -> Vec<f64> {
        if !(self.step > 0.0) || self.end < self.start {
            return Vec::new();
        }
        let count = ((self.end - self.start) / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|i| round_angle(self.start + i as f64 * self.step))
            .collect()
    }
}

/// A single angle of attack at the sweep's fixed free-stream velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub alpha_deg: f64,
    pub velocity: f64,
}

impl Condition {
    pub fn new(alpha_deg: f64, velocity: f64) -> Self {
        Self {
            alpha_deg,
            velocity,
        }
    }

    /// Inlet velocity vector `(V·cosα, V·sinα, 0)`.
    pub fn inlet_velocity(&self) -> Vector3<f64> {
        let alpha = self.alpha_deg.to_radians();
        Vector3::new(
            self.velocity * alpha.cos(),
            self.velocity * alpha.sin(),
            0.0,
        )
    }

    /// Stable textual form of the angle used in directory names and marker files.
    pub fn angle_label(&self) -> String {
        format_angle(self.alpha_deg)
    }
}

pub fn round_angle(alpha: f64) -> f64 {
    (alpha * ANGLE_DECIMALS).round() / ANGLE_DECIMALS
}

/// Formats an angle without superfluous decimals: `4.0` → `"4"`, `2.50` → `"2.5"`.
pub fn format_angle(alpha: f64) -> String {
    let alpha = round_angle(alpha);
    // Negative zero would name a second `alpha_-0` case next to `alpha_0`.
    let alpha = if alpha == 0.0 { 0.0 } else { alpha };
    if alpha.fract() == 0.0 {
        format!("{:.0}", alpha)
    } else {
        let text = format!("{:.6}", alpha);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}
