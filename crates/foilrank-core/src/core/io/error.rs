use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Expected output file is missing: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("File contains no data rows")]
    Empty,

    #[error("Could not resolve column '{column}' from header {header:?}")]
    UnresolvedColumn {
        column: &'static str,
        header: Option<Vec<String>>,
    },

    #[error("Column '{column}' resolved to index {index}, but the data row has {width} values")]
    ColumnOutOfRange {
        column: &'static str,
        index: usize,
        width: usize,
    },

    #[error("Invalid number '{value}' for column '{column}' on line {line}")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
}
