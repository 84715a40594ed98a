//! Turns per-test annotations and execution outcomes into a Gradescope
//! results document.
//!
//! ```no_run
//! use gradescope_engine::{aggregate, Outcome, FailureDetail, Registry};
//!
//! let mut registry = Registry::new();
//! registry.annotate("A").weight(10)?;
//! registry.annotate("B").weight(5)?.hide_errors_with("boom");
//!
//! let outcomes = vec![
//!     Outcome::passed("A"),
//!     Outcome::failed("B", FailureDetail::from_message("assert False")),
//! ];
//! let (report, _summary) = aggregate(&registry, outcomes)?;
//! assert_eq!(report.tests[1].output, "boom");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod annotation;
pub mod enrichment;
pub mod manifest;
pub mod outcome;
pub mod registry;
pub mod report;

#[cfg(test)]
mod aggregator_tests;

pub use aggregator::{aggregate, AggregateError, RunCollector, RunSummary};
pub use annotation::{AnnotationError, TestAnnotation};
pub use enrichment::{enrich, EnrichmentError, TestRecord};
pub use manifest::{DeclarationsDocument, ManifestError};
pub use outcome::{ExtractionError, FailureDetail, Outcome, OutcomeKind, TracebackSection};
pub use registry::{Annotator, DeclarationError, Registry, TestContext};
pub use report::{build_leaderboard, build_report};
