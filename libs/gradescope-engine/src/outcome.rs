// Outcome records handed over by the test execution engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeKind {
    Passed,
    Failed,
    Error,
    Skipped,
}

impl OutcomeKind {
    /// Errors count as failures for reporting purposes
    pub fn is_failure(&self) -> bool {
        matches!(self, OutcomeKind::Failed | OutcomeKind::Error)
    }
}

/// One section of a chained traceback, entries ordered outermost first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracebackSection {
    pub entries: Vec<String>,
}

/// Failure information captured by the engine for a failed test
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub chain: Vec<TracebackSection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("failed test carries no failure detail")]
    Missing,

    #[error("failure detail has an empty traceback chain")]
    EmptyChain,

    #[error("first traceback section has no entries")]
    EmptySection,
}

impl FailureDetail {
    /// Build a detail holding a single message
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            chain: vec![TracebackSection {
                entries: vec![message.into()],
            }],
        }
    }

    /// First entry of the first section in the chain
    pub fn primary_message(&self) -> Result<&str, ExtractionError> {
        let section = self.chain.first().ok_or(ExtractionError::EmptyChain)?;
        section
            .entries
            .first()
            .map(String::as_str)
            .ok_or(ExtractionError::EmptySection)
    }
}

/// Terminal outcome of one executed test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Qualified test identity, also the key annotations are registered under
    pub name: String,
    pub kind: OutcomeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDetail>,
}

impl Outcome {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Passed,
            failure: None,
        }
    }

    pub fn failed(name: impl Into<String>, failure: FailureDetail) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Failed,
            failure: Some(failure),
        }
    }

    pub fn errored(name: impl Into<String>, failure: FailureDetail) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Error,
            failure: Some(failure),
        }
    }

    pub fn skipped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutcomeKind::Skipped,
            failure: None,
        }
    }
}
