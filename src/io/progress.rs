use crate::error::{Result, SolverError};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Appends one line to `path`, creating the file if needed.
///
/// The file is reopened for every line so that an interrupted run leaves
/// everything written so far on disk.
pub fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| SolverError::io(path, e))?;
    writeln!(file, "{}", line).map_err(|e| SolverError::io(path, e))
}
