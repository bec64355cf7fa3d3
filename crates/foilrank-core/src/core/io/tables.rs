use crate::core::models::record::{PolarTable, RunRecord};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Failed to create output directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write table {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// One row of a processed polar or of the combined sweep results.
#[derive(Debug, Clone, Serialize)]
pub struct PolarRow<'a> {
    pub airfoil: &'a str,
    pub alpha: f64,
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
    pub cdp: Option<f64>,
    pub top_xtr: Option<f64>,
    pub bot_xtr: Option<f64>,
    pub time: Option<f64>,
    pub success: bool,
    pub cl_cd: Option<f64>,
}

impl<'a> PolarRow<'a> {
    pub fn new(airfoil: &'a str, record: &RunRecord) -> Self {
        let cl_cd = record.cl_cd();
        Self {
            airfoil,
            alpha: record.alpha(),
            cl: record.cl(),
            cd: record.cd(),
            cm: record.cm(),
            cdp: record.cdp(),
            top_xtr: record.top_xtr(),
            bot_xtr: record.bot_xtr(),
            time: record.time(),
            success: record.success(),
            cl_cd: cl_cd.is_finite().then_some(cl_cd),
        }
    }
}

/// Serializes `rows` to a CSV file with a header row, creating parent directories.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), TableError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| TableError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let csv_err = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    for row in rows {
        writer.serialize(row).map_err(csv_err)?;
    }
    writer
        .flush()
        .map_err(|e| csv_err(csv::Error::from(e)))
}

pub fn write_polar_table(path: &Path, table: &PolarTable) -> Result<(), TableError> {
    let rows: Vec<PolarRow> = table
        .records()
        .iter()
        .map(|r| PolarRow::new(table.candidate(), r))
        .collect();
    write_rows(path, &rows)
}

/// Writes every candidate's records into one table, candidates in the given order.
pub fn write_combined_tables(path: &Path, tables: &[PolarTable]) -> Result<(), TableError> {
    let rows: Vec<PolarRow> = tables
        .iter()
        .flat_map(|t| t.records().iter().map(move |r| PolarRow::new(t.candidate(), r)))
        .collect();
    write_rows(path, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn polar_table_is_written_with_header_and_blank_optionals() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("processed/NACA2412_polar.csv");
        let table = PolarTable::from_records(
            "NACA2412",
            vec![
                RunRecord::new(2.0, 0.5, 0.125, -0.05).with_pressure_drag(0.004),
                RunRecord::new(0.0, 0.2, 0.0, -0.05),
            ],
        );

        write_polar_table(&path, &table).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "airfoil,alpha,cl,cd,cm,cdp,top_xtr,bot_xtr,time,success,cl_cd"
        );
        assert_eq!(lines[1], "NACA2412,0.0,0.2,0.0,-0.05,,,,,true,");
        assert_eq!(lines[2], "NACA2412,2.0,0.5,0.125,-0.05,0.004,,,,true,4.0");
    }

    #[test]
    fn combined_table_keeps_candidate_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let tables = vec![
            PolarTable::from_records("B", vec![RunRecord::new(1.0, 0.1, 0.01, 0.0)]),
            PolarTable::from_records("A", vec![RunRecord::new(1.0, 0.1, 0.01, 0.0)]),
        ];
        write_combined_tables(&path, &tables).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let names: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
