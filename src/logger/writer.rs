//! Log writer module
//!
//! Chooses where formatted events go: stdout by default, or a file opened in
//! append mode when `logging.log_file` is set.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;

/// Writer for the configured sink
pub fn make_writer(log_file: Option<&str>) -> io::Result<BoxMakeWriter> {
    Ok(match log_file {
        Some(path) => BoxMakeWriter::new(Mutex::new(open_log_file(path)?)),
        None => BoxMakeWriter::new(io::stdout),
    })
}

/// Open or create a log file for appending
pub fn open_log_file(path: &str) -> io::Result<File> {
    // Create parent directories if they don't exist
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_open_log_file_creates_parents_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/nested/server.log");
        let path = path.to_str().unwrap();

        writeln!(open_log_file(path).unwrap(), "first").unwrap();
        writeln!(open_log_file(path).unwrap(), "second").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[test]
    fn test_make_writer_reports_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a log file
        let path = dir.path().to_str().unwrap();
        assert!(make_writer(Some(path)).is_err());
        assert!(make_writer(None).is_ok());
    }
}
