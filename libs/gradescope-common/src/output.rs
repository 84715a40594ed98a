use crate::config::ReportConfig;
use crate::types::RunReport;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Results document persistence
//
// The document is rendered in memory first and then written in one step:
// a temporary file is created next to the destination and renamed over it,
// so a reader never observes a truncated document.

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to serialize results document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write results document to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read results document from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Render a report as pretty-printed JSON with the given indent width
pub fn render(report: &RunReport, indent: usize) -> Result<String, OutputError> {
    let indent = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    report.serialize(&mut ser)?;

    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Write the report to `config.output_path`, replacing any previous document
pub fn write_report(config: &ReportConfig, report: &RunReport) -> Result<(), OutputError> {
    let rendered = render(report, config.indent)?;
    let path = config.output_path.as_path();

    let write_err = |source: std::io::Error| OutputError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(rendered.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    tracing::info!(
        path = %path.display(),
        tests = report.tests.len(),
        leaderboard = report.leaderboard.len(),
        bytes = rendered.len(),
        "Results document written"
    );

    Ok(())
}

/// Load a previously written results document
pub fn read_report(path: &Path) -> Result<RunReport, OutputError> {
    let content = fs::read_to_string(path).map_err(|source| OutputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}
