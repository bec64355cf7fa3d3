use thiserror::Error;

use super::config::ConfigError;
use crate::core::io::dat::GeometryError;
use crate::core::io::error::ParseError;
use crate::core::io::tables::TableError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Case family '{family}' is misconfigured; missing: {}. {remediation}", .missing.join(", "))]
    Configuration {
        family: String,
        missing: Vec<String>,
        remediation: String,
    },

    #[error("Solver invocation failed for case {case}: {reason}")]
    InvocationFailure { case: String, reason: String },

    #[error("Failed to parse solver output for {context}: {source}")]
    Parse {
        context: String,
        #[source]
        source: ParseError,
    },

    #[error("Geometry error for '{candidate}': {source}")]
    Geometry {
        candidate: String,
        #[source]
        source: GeometryError,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write output table: {source}")]
    Table {
        #[from]
        source: TableError,
    },

    #[error("No usable records for the {stage} stage; scoring was not run")]
    NoUsableRecords { stage: &'static str },

    #[error("Invalid configuration: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}

impl EngineError {
    pub(crate) fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
