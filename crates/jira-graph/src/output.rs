//! Exit codes and report output.
//!
//! Reports go either to stdout or to a file. Files are written to a temporary
//! sibling and renamed into place, so a failed run never leaves a partial
//! report behind.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Standard exit codes of the CLI.
///
/// # Example
///
/// ```
/// use jira_graph::output::ExitCode;
///
/// assert_eq!(ExitCode::PermissionDenied.code(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Report written (0)
    Success = 0,

    /// Generic error (1)
    GenericError = 1,

    /// Invalid arguments, options or defaults file (2)
    InvalidArgument = 2,

    /// Tracker response could not be trusted (4)
    MalformedResponse = 4,

    /// Tracker refused the credentials (5)
    PermissionDenied = 5,

    /// Tracker or filesystem failure (10)
    ExternalError = 10,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Where a report ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl std::fmt::Display for OutputTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputTarget::Stdout => f.write_str("stdout"),
            OutputTarget::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Write `content` to stdout.
///
/// A closed pipe (e.g. `| head`) is not an error.
pub fn write_stdout(content: &str) -> Result<OutputTarget> {
    let mut stdout = io::stdout().lock();
    match stdout.write_all(content.as_bytes()).and_then(|_| stdout.flush()) {
        Ok(()) => Ok(OutputTarget::Stdout),
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(OutputTarget::Stdout),
        Err(e) => Err(e).context("Failed to write report to stdout"),
    }
}

/// Atomically replace `path` with `content`.
pub fn write_file(path: &Path, content: &str) -> Result<OutputTarget> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    temp.write_all(content.as_bytes())
        .and_then(|_| temp.flush())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move report into place at {}", path.display()))?;

    Ok(OutputTarget::File(path.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_write_file_creates_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        let target = write_file(&path, "<html></html>").unwrap();

        assert_eq!(target, OutputTarget::File(path.clone()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_write_file_replaces_existing_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");
        fs::write(&path, "old").unwrap();

        write_file(&path, "new").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_file_into_missing_directory_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("report.html");

        assert!(write_file(&path, "content").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_exit_code_values() {
        let codes: Vec<i32> = [
            ExitCode::Success,
            ExitCode::GenericError,
            ExitCode::InvalidArgument,
            ExitCode::MalformedResponse,
            ExitCode::PermissionDenied,
            ExitCode::ExternalError,
        ]
        .iter()
        .map(|exit_code| exit_code.code())
        .collect();
        assert_eq!(codes, vec![0, 1, 2, 4, 5, 10]);
    }
}
