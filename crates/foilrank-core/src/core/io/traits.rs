use nalgebra::Point2;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading the pipeline's on-disk data formats.
///
/// Implementors cover both geometry inputs and files written by the external solvers.
/// Each knows one format and turns it into a typed value, parsed from any buffered reader
/// so tests can feed in-memory text.
pub trait AirfoilDataFile {
    /// The typed content recovered from the file.
    type Output;

    /// The error type for parse and I/O failures.
    type Error: Error + From<io::Error>;

    /// Parses the format from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    ///
    /// # Return
    ///
    /// Returns the parsed content.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed beyond what the format tolerates or
    /// the reader fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error>;

    /// Parses the format from a file path.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the file to read.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Output, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// Supplies the ordered unit-chord surface coordinates of a named airfoil.
pub trait GeometryProvider {
    type Error: Error;

    /// Loads the coordinates for `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if no geometry is known for `name` or the source is malformed.
    fn load(&self, name: &str) -> Result<Vec<Point2<f64>>, Self::Error>;
}
