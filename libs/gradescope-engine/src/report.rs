/// Report and Leaderboard Builders
///
/// Pure functions from a [`TestRecord`] to the entries of the results
/// document.
///
/// **Scoring Rules:**
/// - max_score = declared weight
/// - score = score set by the test body, otherwise max_score
///
/// The second rule applies to failed tests as well: a failed test that never
/// set a score reports `score == max_score`. The grading platform reconciles
/// this with `status`.
///
/// **Output Rules:**
/// - passed: empty
/// - failed or errored with a non-empty `hide_errors`: the hide message
/// - failed or errored otherwise: first entry of the first traceback section

use crate::enrichment::TestRecord;
use crate::outcome::ExtractionError;
use gradescope_common::types::{LeaderboardEntry, ReportStatus, TestReportEntry};

fn report_status(record: &TestRecord) -> ReportStatus {
    if record.kind.is_failure() {
        ReportStatus::Failed
    } else {
        ReportStatus::Passed
    }
}

fn failure_output(record: &TestRecord) -> Result<String, ExtractionError> {
    // An empty hide message counts as unset
    if let Some(message) = record.annotation.hide_errors.as_ref().filter(|m| !m.is_empty()) {
        return Ok(message.clone());
    }

    let failure = record.failure.as_ref().ok_or(ExtractionError::Missing)?;
    Ok(failure.primary_message()?.to_string())
}

pub fn build_report(record: &TestRecord) -> Result<TestReportEntry, ExtractionError> {
    let annotation = &record.annotation;
    let status = report_status(record);

    let max_score = annotation.weight.clone();
    let score = annotation.score.clone().unwrap_or_else(|| max_score.clone());

    let output = match status {
        ReportStatus::Passed => String::new(),
        ReportStatus::Failed => {
            if annotation.score.is_none() {
                tracing::debug!(
                    test = %record.name,
                    score = %score,
                    "Failed test without explicit score reports full weight"
                );
            }
            failure_output(record)?
        }
    };

    Ok(TestReportEntry {
        name: record.name.clone(),
        status,
        score,
        max_score,
        output,
        tags: annotation.tags.clone(),
        visibility: annotation.visibility,
        number: annotation.number.clone(),
    })
}

/// Entry for the leaderboard, present only when the test is bound to a
/// column and its body set a non-null value
pub fn build_leaderboard(record: &TestRecord) -> Option<LeaderboardEntry> {
    let annotation = &record.annotation;
    let column_name = annotation.leaderboard_column.as_ref()?;
    let value = annotation
        .leaderboard_value
        .as_ref()
        .filter(|v| !v.is_null())?;

    Some(LeaderboardEntry {
        column_name: column_name.clone(),
        sort_order: annotation.leaderboard_sort_order,
        value: value.clone(),
    })
}
