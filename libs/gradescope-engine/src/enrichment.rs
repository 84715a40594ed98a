/// Outcome Enrichment
///
/// Merges the outcome the engine reported for a test with the metadata the
/// test declared, producing a [`TestRecord`]. Runs once per executed test,
/// after its body finished, so `score` and `leaderboard_value` hold their
/// final values.
///
/// A test that was never annotated gets the default annotation.

use crate::annotation::{AnnotationError, TestAnnotation};
use crate::outcome::{FailureDetail, Outcome, OutcomeKind};
use crate::registry::Registry;
use thiserror::Error;

/// Everything known about one finished test
#[derive(Debug, Clone, PartialEq)]
pub struct TestRecord {
    pub name: String,
    pub kind: OutcomeKind,
    pub failure: Option<FailureDetail>,
    pub annotation: TestAnnotation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnrichmentError {
    #[error("test `{test}` has a rejected declaration: {source}")]
    Rejected {
        test: String,
        #[source]
        source: AnnotationError,
    },

    #[error("metadata for test `{test}` is unreadable: a writer panicked while holding it")]
    Poisoned { test: String },
}

impl EnrichmentError {
    pub fn test(&self) -> &str {
        match self {
            EnrichmentError::Rejected { test, .. } | EnrichmentError::Poisoned { test } => test,
        }
    }
}

pub fn enrich(registry: &Registry, outcome: Outcome) -> Result<TestRecord, EnrichmentError> {
    let annotation = match registry.slot(&outcome.name) {
        None => TestAnnotation::default(),
        Some(slot) => {
            if let Some(source) = &slot.rejected {
                return Err(EnrichmentError::Rejected {
                    test: outcome.name,
                    source: source.clone(),
                });
            }

            let dynamic = match slot.dynamic.lock() {
                Ok(guard) => guard,
                Err(_) => return Err(EnrichmentError::Poisoned { test: outcome.name }),
            };

            TestAnnotation {
                score: dynamic.score.clone(),
                leaderboard_value: dynamic.leaderboard_value.clone(),
                ..slot.annotation.clone()
            }
        }
    };

    tracing::trace!(test = %outcome.name, kind = ?outcome.kind, "Outcome enriched");

    Ok(TestRecord {
        name: outcome.name,
        kind: outcome.kind,
        failure: outcome.failure,
        annotation,
    })
}
