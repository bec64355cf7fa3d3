use itertools::Itertools;
use nalgebra::{Point2, Point3};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

const CLOSURE_RTOL: f64 = 1e-5;
const CLOSURE_ATOL: f64 = 1e-8;

pub type Facet = [Point3<f64>; 3];

/// Extrudes a closed 2-D section into a thin solid slab along `z`.
///
/// The section must already be in physical units. A trailing point that repeats the first
/// is dropped before triangulation. Each consecutive pair of section points becomes two
/// side-wall triangles; the end caps at `z = 0` and `z = thickness` are fans around the
/// first point, wound in opposite directions.
pub fn extrude_section(section: &[Point2<f64>], thickness: f64) -> Vec<Facet> {
    let points = drop_closing_point(section);
    let n = points.len();
    if n < 3 {
        return Vec::new();
    }

    let at = |p: &Point2<f64>, z: f64| Point3::new(p.x, p.y, z);
    let mut facets = Vec::with_capacity(4 * n);

    for (a, b) in points.iter().tuple_windows() {
        facets.push([at(a, 0.0), at(b, 0.0), at(b, thickness)]);
        facets.push([at(a, 0.0), at(b, thickness), at(a, thickness)]);
    }

    let origin = &points[0];
    for (a, b) in points[1..].iter().tuple_windows() {
        facets.push([at(origin, 0.0), at(a, 0.0), at(b, 0.0)]);
    }
    for (a, b) in points[1..].iter().tuple_windows() {
        facets.push([at(origin, thickness), at(b, thickness), at(a, thickness)]);
    }

    facets
}

fn drop_closing_point(section: &[Point2<f64>]) -> &[Point2<f64>] {
    match (section.first(), section.last()) {
        (Some(first), Some(last)) if section.len() > 1 && is_close(first, last) => {
            &section[..section.len() - 1]
        }
        _ => section,
    }
}

fn is_close(a: &Point2<f64>, b: &Point2<f64>) -> bool {
    let close = |x: f64, y: f64| (x - y).abs() <= CLOSURE_ATOL + CLOSURE_RTOL * y.abs();
    close(a.x, b.x) && close(a.y, b.y)
}

/// Writes facets as an ASCII STL solid named `name`.
pub fn write_ascii_stl(name: &str, facets: &[Facet], writer: &mut impl Write) -> io::Result<()> {
    writeln!(writer, "solid {}", name)?;
    for facet in facets {
        writeln!(writer, "  facet normal 0 0 0")?;
        writeln!(writer, "    outer loop")?;
        for v in facet {
            writeln!(writer, "      vertex {} {} {}", v.x, v.y, v.z)?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }
    writeln!(writer, "endsolid {}", name)
}

/// Extrudes `section` and writes it to `path`, creating parent directories.
pub fn write_extruded_stl(
    path: &Path,
    name: &str,
    section: &[Point2<f64>],
    thickness: f64,
) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let facets = extrude_section(section, thickness);
    let mut writer = BufWriter::new(File::create(path)?);
    write_ascii_stl(name, &facets, &mut writer)?;
    writer.flush()
}
