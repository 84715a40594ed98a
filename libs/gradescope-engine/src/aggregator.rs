/// Run Aggregator
///
/// **Responsibility:**
/// Collect every terminal outcome of a run and assemble the results document.
///
/// **Architecture:**
/// 1. The engine calls [`RunCollector::on_test_finished`] as each test completes;
///    the outcome is enriched right away (see `enrichment.rs`)
/// 2. Once every test is terminal, [`RunCollector::finish`] builds one report
///    entry and at most one leaderboard entry per record (see `report.rs`)
/// 3. [`RunCollector::finish_and_write`] additionally persists the document
///
/// **Ordering:**
/// Passed records first, then failed (and errored) records, each group in the
/// order its outcomes arrived. Leaderboard entries follow the same order.
///
/// **Exclusions:**
/// - skipped outcomes never reach the report
/// - a record whose enrichment fails is logged and left out
/// - a failed record whose failure text cannot be extracted aborts the run

use crate::enrichment::{enrich, TestRecord};
use crate::outcome::{ExtractionError, Outcome, OutcomeKind};
use crate::registry::Registry;
use crate::report::{build_leaderboard, build_report};
use gradescope_common::config::ReportConfig;
use gradescope_common::output::{self, OutputError};
use gradescope_common::types::RunReport;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("cannot build report entry for failed test `{test}`: {source}")]
    Extraction {
        test: String,
        #[source]
        source: ExtractionError,
    },

    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Counters logged at the end of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub score: f64,
    pub max_score: f64,
}

/// Observer of test completion events for one run
pub struct RunCollector<'r> {
    run_id: Uuid,
    registry: &'r Registry,
    passed: Vec<TestRecord>,
    failed: Vec<TestRecord>,
    skipped: usize,
    rejected: usize,
}

impl<'r> RunCollector<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        let run_id = Uuid::new_v4();
        info!(run_id = %run_id, declared = registry.len(), "Collecting test outcomes");
        Self {
            run_id,
            registry,
            passed: Vec::new(),
            failed: Vec::new(),
            skipped: 0,
            rejected: 0,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Completion signal for one test. Must be called after the test body returned.
    pub fn on_test_finished(&mut self, outcome: Outcome) {
        if outcome.kind == OutcomeKind::Skipped {
            debug!(run_id = %self.run_id, test = %outcome.name, "Skipped test excluded");
            self.skipped += 1;
            return;
        }

        let record = match enrich(self.registry, outcome) {
            Ok(record) => record,
            Err(e) => {
                error!(
                    run_id = %self.run_id,
                    test = %e.test(),
                    error = %e,
                    "Enrichment failed; test left out of the report"
                );
                self.rejected += 1;
                return;
            }
        };

        debug!(
            run_id = %self.run_id,
            test = %record.name,
            kind = ?record.kind,
            "Test finished"
        );

        if record.kind.is_failure() {
            self.failed.push(record);
        } else {
            self.passed.push(record);
        }
    }

    /// Build the report once every test is terminal
    pub fn finish(self) -> Result<(RunReport, RunSummary), AggregateError> {
        let mut report = RunReport::default();

        for record in self.passed.iter().chain(self.failed.iter()) {
            let entry = build_report(record).map_err(|source| AggregateError::Extraction {
                test: record.name.clone(),
                source,
            })?;
            report.tests.push(entry);

            if let Some(entry) = build_leaderboard(record) {
                report.leaderboard.push(entry);
            }
        }

        let summary = RunSummary {
            passed: self.passed.len(),
            failed: self.failed.len(),
            skipped: self.skipped,
            rejected: self.rejected,
            score: report.total_score(),
            max_score: report.total_max_score(),
        };

        if summary.rejected > 0 {
            warn!(
                run_id = %self.run_id,
                rejected = summary.rejected,
                "Some tests were left out of the report"
            );
        }

        info!(
            run_id = %self.run_id,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            leaderboard = report.leaderboard.len(),
            score = summary.score,
            max_score = summary.max_score,
            "Run aggregated"
        );

        Ok((report, summary))
    }

    /// Build the report and write it as a single document
    pub fn finish_and_write(
        self,
        config: &ReportConfig,
    ) -> Result<(RunReport, RunSummary), AggregateError> {
        let (report, summary) = self.finish()?;
        output::write_report(config, &report)?;
        Ok((report, summary))
    }
}

/// Aggregate a complete outcome list in one pass
pub fn aggregate<I>(registry: &Registry, outcomes: I) -> Result<(RunReport, RunSummary), AggregateError>
where
    I: IntoIterator<Item = Outcome>,
{
    let mut collector = RunCollector::new(registry);
    for outcome in outcomes {
        collector.on_test_finished(outcome);
    }
    collector.finish()
}
