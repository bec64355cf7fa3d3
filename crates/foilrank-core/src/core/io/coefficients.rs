use super::error::ParseError;
use super::traits::AirfoilDataFile;
use crate::core::models::record::RunRecord;
use phf::phf_map;
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

const TIME_NAMES: &[&str] = &["Time"];
const CL_NAMES: &[&str] = &["Cl"];
const CD_NAMES: &[&str] = &["Cd"];
const CM_NAMES: &[&str] = &["CmPitch", "CmRoll", "CmYaw", "Cm"];

static COLUMN_SYNONYMS: phf::Map<&'static str, &'static [&'static str]> = phf_map! {
    "Time" => TIME_NAMES,
    "Cl" => CL_NAMES,
    "Cd" => CD_NAMES,
    "Cm" => CM_NAMES,
};

const HEADER_MARKERS: [&str; 3] = ["Time", "Cl", "Cd"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoefficientColumn {
    Time,
    Cl,
    Cd,
    Cm,
}

impl CoefficientColumn {
    pub fn name(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::Cl => "Cl",
            Self::Cd => "Cd",
            Self::Cm => "Cm",
        }
    }

    pub fn default_index(self) -> usize {
        match self {
            Self::Time => 0,
            Self::Cl => 1,
            Self::Cd => 2,
            Self::Cm => 3,
        }
    }

    /// Header names accepted for this column, in order of preference.
    pub fn synonyms(self) -> &'static [&'static str] {
        COLUMN_SYNONYMS.get(self.name()).copied().unwrap_or(&[])
    }
}

/// How a column index was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    Exact(usize),
    Prefix(usize),
    Positional(usize),
}

impl ColumnSource {
    pub fn index(self) -> usize {
        match self {
            Self::Exact(i) | Self::Prefix(i) | Self::Positional(i) => i,
        }
    }
}

/// Column layout of a coefficient file, taken from its last header line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSchema {
    header: Option<Vec<String>>,
}

impl ColumnSchema {
    pub fn new(header: Option<Vec<String>>) -> Self {
        Self { header }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Resolves a column by exact synonym, then by the two-character prefix of its primary
    /// name, then by its positional default.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::UnresolvedColumn`] if a header is present but neither lookup
    /// matches and the positional default lies outside the header.
    pub fn resolve(&self, column: CoefficientColumn) -> Result<ColumnSource, ParseError> {
        let Some(header) = &self.header else {
            return Ok(ColumnSource::Positional(column.default_index()));
        };

        let synonyms = column.synonyms();
        for name in synonyms {
            if let Some(i) = header.iter().position(|h| h == name) {
                return Ok(ColumnSource::Exact(i));
            }
        }

        if let Some(prefix) = synonyms.first().and_then(|n| n.get(..2)) {
            if let Some(i) = header.iter().position(|h| h.starts_with(prefix)) {
                return Ok(ColumnSource::Prefix(i));
            }
        }

        if column.default_index() < header.len() {
            Ok(ColumnSource::Positional(column.default_index()))
        } else {
            Err(ParseError::UnresolvedColumn {
                column: column.name(),
                header: self.header.clone(),
            })
        }
    }
}

/// The final sample of a force-coefficient history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientSample {
    pub time: f64,
    pub cl: f64,
    pub cd: f64,
    pub cm: f64,
}

impl CoefficientSample {
    pub fn into_record(self, alpha: f64) -> RunRecord {
        RunRecord::new(alpha, self.cl, self.cd, self.cm).with_time(self.time)
    }
}

/// The `coefficient.dat` history written by the field solver's force-coefficient function
/// object. Only the last data line is read; earlier lines are the convergence history.
pub struct ForceCoefficientFile;

impl AirfoilDataFile for ForceCoefficientFile {
    type Output = CoefficientSample;
    type Error = ParseError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut header: Option<Vec<String>> = None;
        let mut last_data: Option<(usize, String)> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                let tokens: Vec<String> = comment.split_whitespace().map(str::to_string).collect();
                if tokens.iter().any(|t| HEADER_MARKERS.contains(&t.as_str())) {
                    header = Some(tokens);
                }
                continue;
            }
            last_data = Some((line_num + 1, trimmed.to_string()));
        }

        let (line_num, data) = last_data.ok_or(ParseError::Empty)?;
        let fields: Vec<&str> = data.split_whitespace().collect();
        let schema = ColumnSchema::new(header);

        let value = |column: CoefficientColumn| -> Result<f64, ParseError> {
            let source = schema.resolve(column)?;
            let index = source.index();
            let raw = fields.get(index).ok_or(ParseError::ColumnOutOfRange {
                column: column.name(),
                index,
                width: fields.len(),
            })?;
            raw.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
                line: line_num,
                column: column.name().to_string(),
                value: raw.to_string(),
            })
        };

        Ok(CoefficientSample {
            time: value(CoefficientColumn::Time)?,
            cl: value(CoefficientColumn::Cl)?,
            cd: value(CoefficientColumn::Cd)?,
            cm: value(CoefficientColumn::Cm)?,
        })
    }
}

/// Reads the last coefficient sample of a case and tags it with the case's angle.
pub fn read_case_record(path: &Path, alpha: f64) -> Result<RunRecord, ParseError> {
    if !path.is_file() {
        return Err(ParseError::MissingFile(path.to_path_buf()));
    }
    let sample = ForceCoefficientFile::read_from_path(path)?;
    debug!(alpha, cl = sample.cl, cd = sample.cd, "Read final coefficient sample.");
    Ok(sample.into_record(alpha))
}
