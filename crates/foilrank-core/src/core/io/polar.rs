use super::error::ParseError;
use super::traits::AirfoilDataFile;
use crate::core::models::record::RunRecord;
use std::io::BufRead;
use std::path::Path;
use tracing::trace;

const POLAR_COLUMNS: usize = 7;

/// Name of the polar file the panel solver writes for a candidate at a Reynolds number.
pub fn polar_file_name(candidate: &str, reynolds: f64) -> String {
    format!("{}_Re{}.pol", candidate, reynolds as i64)
}

/// The whitespace-delimited polar table written by the panel solver's `PACC` command.
///
/// Columns are `alpha cl cd cdp cm top_xtr bot_xtr`. Banner text, `#` comments and the
/// dashed separator under the column titles are skipped, as is any row that does not
/// have exactly seven numeric fields.
pub struct PanelPolarFile;

impl AirfoilDataFile for PanelPolarFile {
    type Output = Vec<RunRecord>;
    type Error = ParseError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("-----") {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            if fields.len() != POLAR_COLUMNS {
                continue;
            }

            let values: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
            let Ok(v) = values else {
                trace!(line = line_num + 1, "Skipping non-numeric polar row.");
                continue;
            };

            records.push(
                RunRecord::new(v[0], v[1], v[2], v[4])
                    .with_pressure_drag(v[3])
                    .with_transition(v[5], v[6]),
            );
        }

        Ok(records)
    }
}

impl PanelPolarFile {
    /// Reads a polar file, reporting a missing file as [`ParseError::MissingFile`].
    pub fn read_existing(path: &Path) -> Result<Vec<RunRecord>, ParseError> {
        if !path.is_file() {
            return Err(ParseError::MissingFile(path.to_path_buf()));
        }
        Self::read_from_path(path)
    }
}
