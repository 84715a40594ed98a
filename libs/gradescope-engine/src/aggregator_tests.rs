/// End-to-end tests for run aggregation
///
/// These drive the whole pipeline the way an execution engine would:
/// declare annotations, run test bodies against their contexts, signal
/// completion, then build and write the results document.

#[cfg(test)]
mod run_tests {
    use crate::aggregator::{aggregate, AggregateError, RunCollector, RunSummary};
    use crate::outcome::{ExtractionError, FailureDetail, Outcome};
    use crate::registry::Registry;
    use gradescope_common::config::ReportConfig;
    use gradescope_common::output::read_report;
    use serde_json::json;

    /// Helper to create a failed outcome with a one-line traceback
    fn make_failure(name: &str, message: &str) -> Outcome {
        Outcome::failed(name, FailureDetail::from_message(message))
    }

    #[test]
    fn test_two_test_scenario() {
        let mut registry = Registry::new();
        registry.annotate("A").weight(10).unwrap();
        registry.annotate("B").weight(5).unwrap().hide_errors_with("boom");

        let outcomes = vec![
            Outcome::passed("A"),
            make_failure("B", "AssertionError: expected 3"),
        ];
        let (report, summary) = aggregate(&registry, outcomes).unwrap();

        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "tests": [
                    {"name": "A", "status": "passed", "score": 10, "max_score": 10,
                     "output": "", "tags": [], "visibility": "visible"},
                    {"name": "B", "status": "failed", "score": 5, "max_score": 5,
                     "output": "boom", "tags": [], "visibility": "visible"}
                ],
                "leaderboard": []
            })
        );
        assert_eq!(
            summary,
            RunSummary {
                passed: 1,
                failed: 1,
                skipped: 0,
                rejected: 0,
                score: 15.0,
                max_score: 15.0,
            }
        );
    }

    #[test]
    fn test_passed_group_precedes_failed_group() {
        let registry = Registry::new();
        let outcomes = vec![
            make_failure("f1", "e1"),
            Outcome::passed("p1"),
            Outcome::errored("e1", FailureDetail::from_message("setup crashed")),
            Outcome::passed("p2"),
            make_failure("f2", "e2"),
        ];

        let (report, _) = aggregate(&registry, outcomes).unwrap();
        let names: Vec<&str> = report.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["p1", "p2", "f1", "e1", "f2"]);
    }

    #[test]
    fn test_skipped_and_rejected_are_excluded() {
        let mut registry = Registry::new();
        registry.annotate("ok").weight(1).unwrap();
        assert!(registry.annotate("bad").visibility("foo").is_err());

        let outcomes = vec![
            Outcome::passed("ok"),
            Outcome::passed("bad"),
            Outcome::skipped("skipped"),
        ];
        let (report, summary) = aggregate(&registry, outcomes).unwrap();

        assert_eq!(report.tests.len(), 1);
        assert_eq!(report.tests[0].name, "ok");
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.rejected, 1);
    }

    #[test]
    fn test_partial_credit_flow() {
        let mut registry = Registry::new();
        registry.annotate("pc").partial_credit(10).unwrap();

        // Test body
        let ctx = registry.context("pc");
        ctx.set_score(4).unwrap();

        let (report, _) = aggregate(&registry, vec![Outcome::passed("pc")]).unwrap();
        assert_eq!(report.tests[0].score, serde_json::Number::from(4));
        assert_eq!(report.tests[0].max_score, serde_json::Number::from(10));
    }

    #[test]
    fn test_leaderboard_follows_test_order() {
        let mut registry = Registry::new();
        registry.annotate("fast").leaderboard_sorted("runtime", "asc").unwrap();
        registry.annotate("acc").leaderboard("accuracy");
        registry.annotate("unset").leaderboard("never");

        registry.context("fast").set_leaderboard_value(1.5).unwrap();
        registry.context("acc").set_leaderboard_value(98).unwrap();

        let outcomes = vec![
            make_failure("acc", "low accuracy"),
            Outcome::passed("unset"),
            Outcome::passed("fast"),
        ];
        let (report, _) = aggregate(&registry, outcomes).unwrap();

        assert_eq!(
            serde_json::to_value(&report.leaderboard).unwrap(),
            json!([
                {"column_name": "runtime", "sort_order": "asc", "value": 1.5},
                {"column_name": "accuracy", "sort_order": "desc", "value": 98}
            ])
        );
    }

    #[test]
    fn test_extraction_failure_aborts_aggregation() {
        let registry = Registry::new();
        let outcomes = vec![
            Outcome::passed("fine"),
            Outcome::failed("broken", FailureDetail::default()),
        ];

        let err = aggregate(&registry, outcomes).unwrap_err();
        match err {
            AggregateError::Extraction { test, source } => {
                assert_eq!(test, "broken");
                assert_eq!(source, ExtractionError::EmptyChain);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_parallel_bodies_then_barrier() {
        let mut registry = Registry::new();
        for i in 0..8 {
            registry.annotate(format!("t{}", i)).partial_credit(10).unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ctx = registry.context(&format!("t{}", i));
                std::thread::spawn(move || ctx.set_score(i).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let mut collector = RunCollector::new(&registry);
        for i in 0..8 {
            collector.on_test_finished(Outcome::passed(format!("t{}", i)));
        }
        let (report, summary) = collector.finish().unwrap();

        assert_eq!(summary.score, 28.0);
        assert_eq!(summary.max_score, 80.0);
        assert_eq!(report.tests[3].score, serde_json::Number::from(3));
    }

    #[test]
    fn test_finish_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig::new().with_output_path(dir.path().join("results.json"));

        let mut registry = Registry::new();
        registry.annotate("A").weight(2).unwrap().number("1");

        let mut collector = RunCollector::new(&registry);
        collector.on_test_finished(Outcome::passed("A"));
        let (report, _) = collector.finish_and_write(&config).unwrap();

        let written = read_report(&config.output_path).unwrap();
        assert_eq!(written, report);
        assert_eq!(written.tests[0].number.as_deref(), Some("1"));
    }

    #[test]
    fn test_no_document_when_aggregation_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig::new().with_output_path(dir.path().join("results.json"));

        let registry = Registry::new();
        let mut collector = RunCollector::new(&registry);
        collector.on_test_finished(Outcome::failed("x", FailureDetail::default()));

        assert!(collector.finish_and_write(&config).is_err());
        assert!(!config.output_path.exists());
    }
}
