// Runtime configuration for writing the results document

use std::path::PathBuf;

pub const DEFAULT_OUTPUT_PATH: &str = "results.json";
pub const DEFAULT_INDENT: usize = 4;

pub const OUTPUT_PATH_ENV: &str = "GRADESCOPE_RESULTS_PATH";
pub const INDENT_ENV: &str = "GRADESCOPE_RESULTS_INDENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportConfig {
    pub output_path: PathBuf,
    pub indent: usize,
}

impl ReportConfig {
    pub fn new() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            indent: DEFAULT_INDENT,
        }
    }

    /// Defaults overridden by `GRADESCOPE_RESULTS_PATH` and `GRADESCOPE_RESULTS_INDENT`.
    /// An unparsable indent falls back to the default.
    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Ok(path) = std::env::var(OUTPUT_PATH_ENV) {
            if !path.trim().is_empty() {
                config.output_path = PathBuf::from(path);
            }
        }

        if let Ok(indent) = std::env::var(INDENT_ENV) {
            match indent.trim().parse::<usize>() {
                Ok(n) => config.indent = n,
                Err(_) => tracing::warn!(
                    value = %indent,
                    "Ignoring invalid {}, using {}",
                    INDENT_ENV,
                    DEFAULT_INDENT
                ),
            }
        }

        config
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::new()
    }
}
