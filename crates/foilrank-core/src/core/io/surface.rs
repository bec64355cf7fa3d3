use super::error::ParseError;
use super::traits::AirfoilDataFile;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::trace;

/// One pressure-coefficient sample on the airfoil surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CpSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub cp: f64,
}

impl CpSample {
    pub fn x_over_c(&self, chord: f64) -> f64 {
        self.x / chord
    }
}

/// A raw surface-sampling file with `x y z cp` rows.
pub struct SurfacePressureFile;

impl AirfoilDataFile for SurfacePressureFile {
    type Output = Vec<CpSample>;
    type Error = ParseError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut samples = Vec::new();
        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let values: Result<Vec<f64>, _> =
                trimmed.split_whitespace().map(str::parse::<f64>).collect();
            match values {
                Ok(v) if v.len() == 4 => samples.push(CpSample {
                    x: v[0],
                    y: v[1],
                    z: v[2],
                    cp: v[3],
                }),
                _ => trace!(line = line_num + 1, "Skipping malformed surface sample row."),
            }
        }
        if samples.is_empty() {
            return Err(ParseError::Empty);
        }
        Ok(samples)
    }
}

/// Picks the numerically latest time directory under `surfaces_root`.
///
/// Directory names that are not numbers sort before every numeric time.
pub fn latest_time_dir(surfaces_root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(surfaces_root).ok()?;
    entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .max_by(|a, b| time_key(a).total_cmp(&time_key(b)))
}

fn time_key(path: &Path) -> f64 {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.parse::<f64>().ok())
        .unwrap_or(-1.0)
}

/// Loads `<surface>_cp.raw` from the latest sample time of a case.
pub fn read_latest_surface(
    case_dir: &Path,
    surfaces_subdir: &Path,
    surface: &str,
) -> Result<Vec<CpSample>, ParseError> {
    let root = case_dir.join(surfaces_subdir);
    let time_dir = latest_time_dir(&root).ok_or_else(|| ParseError::MissingFile(root.clone()))?;
    let path = time_dir.join(format!("{}_cp.raw", surface));
    if !path.is_file() {
        return Err(ParseError::MissingFile(path));
    }
    SurfacePressureFile::read_from_path(&path)
}
