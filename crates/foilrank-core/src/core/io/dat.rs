use super::traits::{AirfoilDataFile, GeometryProvider};
use nalgebra::Point2;
use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const MIN_POINTS: usize = 3;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("No geometry found for '{name}' in {}", .root.display())]
    NotFound { name: String, root: PathBuf },
    #[error("Invalid coordinate on line {line}: '{content}'")]
    InvalidCoordinate { line: usize, content: String },
    #[error("Geometry has {found} points, at least 3 are required")]
    TooFewPoints { found: usize },
}

/// A titled, ordered list of unit-chord coordinates.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AirfoilCoordinates {
    pub title: String,
    pub points: Vec<Point2<f64>>,
}

/// Selig-style `.dat` coordinate file: an optional title line followed by `x y` rows.
pub struct DatFile;

impl AirfoilDataFile for DatFile {
    type Output = AirfoilCoordinates;
    type Error = GeometryError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut coordinates = AirfoilCoordinates::default();
        let mut seen_content = false;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            match parse_pair(trimmed) {
                Some(point) => coordinates.points.push(point),
                None if !seen_content => coordinates.title = trimmed.to_string(),
                None => {
                    return Err(GeometryError::InvalidCoordinate {
                        line: line_num + 1,
                        content: trimmed.to_string(),
                    });
                }
            }
            seen_content = true;
        }

        if coordinates.points.len() < MIN_POINTS {
            return Err(GeometryError::TooFewPoints {
                found: coordinates.points.len(),
            });
        }
        Ok(coordinates)
    }
}

impl DatFile {
    /// Writes `title` followed by one `x y` row per point.
    pub fn write_to(
        title: &str,
        points: &[Point2<f64>],
        writer: &mut impl Write,
    ) -> Result<(), io::Error> {
        writeln!(writer, "{}", title)?;
        for p in points {
            writeln!(writer, "{:.6} {:.6}", p.x, p.y)?;
        }
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(
        title: &str,
        points: &[Point2<f64>],
        path: P,
    ) -> Result<(), io::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(title, points, &mut writer)?;
        writer.flush()
    }
}

fn parse_pair(line: &str) -> Option<Point2<f64>> {
    let mut fields = line.split_whitespace();
    let x = fields.next()?.parse::<f64>().ok()?;
    let y = fields.next()?.parse::<f64>().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some(Point2::new(x, y))
}

/// Looks geometry up as `<root>/<name>.dat`, trying the lower-cased name first.
#[derive(Debug, Clone)]
pub struct DatDirectory {
    root: PathBuf,
}

impl DatDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        [name.to_lowercase(), name.to_string()]
            .into_iter()
            .map(|stem| self.root.join(format!("{}.dat", stem)))
            .find(|path| path.is_file())
    }
}

impl GeometryProvider for DatDirectory {
    type Error = GeometryError;

    fn load(&self, name: &str) -> Result<Vec<Point2<f64>>, Self::Error> {
        let path = self.locate(name).ok_or_else(|| GeometryError::NotFound {
            name: name.to_string(),
            root: self.root.clone(),
        })?;
        Ok(DatFile::read_from_path(path)?.points)
    }
}
