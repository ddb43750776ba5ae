//! Reference `AuditSource` (A5): a newline-delimited-JSON audit log.
//!
//! This is a stand-in for the real Medusa/SELinux audit-log tokenizer
//! (§1, §6 — explicitly out of scope for `mpm-core`), sufficient to run
//! the engine end-to-end against a recorded or hand-written fixture.
//! Each line is one [`mpm_core::audit::AuditEntry`] as produced by
//! `assign_permissions`/`create_log_entries` in the original tooling.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use mpm_core::audit::{AuditEntry, AuditSource};
use thiserror::Error;

/// Failure reading or parsing a JSONL audit log.
#[derive(Debug, Error)]
pub enum JsonlAuditError {
    /// The underlying file could not be opened or read.
    #[error("reading audit log: {0}")]
    Io(#[from] std::io::Error),
    /// A line was not valid JSON or didn't match [`AuditEntry`]'s shape.
    #[error("parsing audit log line {line}: {source}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// An [`AuditSource`] backed by a file of newline-delimited JSON
/// [`AuditEntry`] records. Blank lines are skipped.
pub struct JsonlAuditSource {
    path: std::path::PathBuf,
}

impl JsonlAuditSource {
    /// Point at a JSONL file on disk. The file is only opened when
    /// [`AuditSource::entries`] is called.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSource for JsonlAuditSource {
    type Error = JsonlAuditError;

    fn entries(&self) -> Result<Vec<AuditEntry>, Self::Error> {
        read_jsonl(&self.path)
    }
}

fn read_jsonl(path: &Path) -> Result<Vec<AuditEntry>, JsonlAuditError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut entries = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: AuditEntry = serde_json::from_str(&line).map_err(|source| JsonlAuditError::Parse {
            line: idx + 1,
            source,
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_entries_and_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"proctitle":"sshd","path":"/etc/passwd","permission":1,"uid":0,"pid":1,"ppid":0,"operation":"open","domain":[]}}"#
        )
        .unwrap();
        writeln!(file).unwrap();

        let source = JsonlAuditSource::new(file.path());
        let entries = source.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "/etc/passwd");
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();

        let source = JsonlAuditSource::new(file.path());
        let err = source.entries().unwrap_err();
        assert!(matches!(err, JsonlAuditError::Parse { line: 1, .. }));
    }
}
