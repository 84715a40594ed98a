// CLI commands for building and inspecting results documents
use anyhow::{bail, Context, Result};
use gradescope_common::config::ReportConfig;
use gradescope_common::types::RunReport;
use gradescope_engine::{
    DeclarationsDocument, FailureDetail, ManifestError, Outcome, OutcomeKind, Registry, RunCollector,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome as recorded by the engine, plus whatever the test body set
/// through its context while it ran
#[derive(Debug, Deserialize)]
pub struct RecordedOutcome {
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub leaderboard_value: Option<Value>,
}

/// Load declarations into a fresh registry, listing every rejected attribute
async fn load_registry(path: &Path) -> Result<Registry> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    match DeclarationsDocument::load(&content) {
        Ok(registry) => Ok(registry),
        Err(ManifestError::Invalid(errors)) => {
            for e in &errors {
                eprintln!("  ✗ {}: {}", e.test, e.source);
            }
            bail!("{} invalid declaration(s) in {}", errors.len(), path.display())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to load {}", path.display())),
    }
}

async fn load_outcomes(path: &Path) -> Result<Vec<RecordedOutcome>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Play back the values a test body set during execution.
///
/// A rejected value fails that test alone, the same way a raising
/// `set_score` call fails the body it runs in.
fn replay(registry: &Registry, entry: RecordedOutcome) -> Outcome {
    let ctx = registry.context(&entry.outcome.name);

    let replayed = entry
        .score
        .map_or(Ok(()), |score| ctx.set_score(score))
        .and_then(|()| {
            entry
                .leaderboard_value
                .map_or(Ok(()), |value| ctx.set_leaderboard_value(value))
        });

    match replayed {
        Ok(()) => entry.outcome,
        Err(e) if entry.outcome.kind == OutcomeKind::Skipped => {
            warn!(test = %ctx.test(), error = %e, "Ignoring value recorded by skipped test");
            entry.outcome
        }
        Err(e) => {
            warn!(test = %ctx.test(), error = %e, "Recorded value rejected; test marked failed");
            Outcome::failed(entry.outcome.name, FailureDetail::from_message(e.to_string()))
        }
    }
}

/// Aggregate a run and write its results document
pub async fn report(
    declarations: Option<&Path>,
    outcomes: &Path,
    output: Option<PathBuf>,
    indent: Option<usize>,
) -> Result<RunReport> {
    let mut config = ReportConfig::from_env();
    if let Some(path) = output {
        config = config.with_output_path(path);
    }
    if let Some(indent) = indent {
        config = config.with_indent(indent);
    }

    let registry = match declarations {
        Some(path) => load_registry(path).await?,
        None => Registry::new(),
    };
    info!(declared = registry.len(), "Declarations loaded");

    let recorded = load_outcomes(outcomes).await?;

    let mut collector = RunCollector::new(&registry);
    for entry in recorded {
        collector.on_test_finished(replay(&registry, entry));
    }

    let (report, summary) = collector
        .finish_and_write(&config)
        .context("Failed to produce results document")?;

    println!(
        "✅ Wrote {} ({} passed, {} failed, score {}/{})",
        config.output_path.display(),
        summary.passed,
        summary.failed,
        summary.score,
        summary.max_score
    );
    if summary.rejected > 0 {
        println!("⚠️  {} test(s) left out of the report", summary.rejected);
    }

    Ok(report)
}

/// Validate declarations only
pub async fn check(declarations: &Path) -> Result<()> {
    let registry = load_registry(declarations).await?;
    println!(
        "✅ {} declaration(s) in {} are valid",
        registry.len(),
        declarations.display()
    );
    Ok(())
}

/// Print a results document as a table
pub async fn summary(results: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(results)
        .await
        .with_context(|| format!("Failed to read {}", results.display()))?;
    let report: RunReport = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", results.display()))?;

    if report.tests.is_empty() {
        println!("No tests in {}", results.display());
        return Ok(());
    }

    println!(
        "{:<40} {:<8} {:>12} {:<16} {:<10}",
        "Name", "Status", "Score", "Visibility", "Number"
    );
    println!("{}", "─".repeat(90));

    for test in &report.tests {
        println!(
            "{:<40} {:<8} {:>12} {:<16} {:<10}",
            test.name,
            test.status,
            format!("{}/{}", test.score, test.max_score),
            test.visibility,
            test.number.as_deref().unwrap_or("-")
        );
    }

    if !report.leaderboard.is_empty() {
        println!("\n🏆 Leaderboard:");
        for entry in &report.leaderboard {
            println!("  {} ({}): {}", entry.column_name, entry.sort_order, entry.value);
        }
    }

    println!(
        "\n✅ Total: {}/{} over {} test(s)",
        report.total_score(),
        report.total_max_score(),
        report.tests.len()
    );

    Ok(())
}
