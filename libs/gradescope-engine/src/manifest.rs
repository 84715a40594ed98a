// Declarations document: per-test annotations written as JSON
//
// {
//   "tests": {
//     "tests/test_io.py::test_read": {
//       "weight": 10,
//       "number": "1.1",
//       "visibility": "after_due_date",
//       "hide_errors": true,
//       "tags": ["io"],
//       "leaderboard": { "column_name": "runtime", "sort_order": "asc" },
//       "partial_credit": 5
//     }
//   }
// }

use crate::annotation::coerce_to_string;
use crate::registry::{DeclarationError, Registry};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaderboardDeclaration {
    pub column_name: Value,
    #[serde(default)]
    pub sort_order: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Declaration {
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub number: Option<Value>,
    #[serde(default)]
    pub visibility: Option<Value>,
    #[serde(default)]
    pub hide_errors: Option<Value>,
    #[serde(default)]
    pub tags: Option<Value>,
    #[serde(default)]
    pub leaderboard: Option<LeaderboardDeclaration>,
    #[serde(default)]
    pub partial_credit: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationsDocument {
    #[serde(default)]
    pub tests: BTreeMap<String, Declaration>,
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to parse declarations document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{} invalid declaration(s){}", .0.len(), first_error(.0))]
    Invalid(Vec<DeclarationError>),
}

fn first_error(errors: &[DeclarationError]) -> String {
    errors
        .first()
        .map(|e| format!(", first: {}", e))
        .unwrap_or_default()
}

impl DeclarationsDocument {
    pub fn from_json(content: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Apply every declaration to `registry`.
    ///
    /// All tests are processed even after a failure so that every offending
    /// attribute is reported at once.
    pub fn apply(self, registry: &mut Registry) -> Result<(), ManifestError> {
        let mut errors = Vec::new();

        for (test, declaration) in self.tests {
            declaration.apply(registry, &test, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ManifestError::Invalid(errors))
        }
    }

    /// Parse and build a registry in one step
    pub fn load(content: &str) -> Result<Registry, ManifestError> {
        let mut registry = Registry::new();
        Self::from_json(content)?.apply(&mut registry)?;
        Ok(registry)
    }
}

impl Declaration {
    fn apply(self, registry: &mut Registry, test: &str, errors: &mut Vec<DeclarationError>) {
        let mut annotator = registry.annotate(test);

        if let Some(weight) = self.weight {
            if let Err(e) = annotator.weight(weight) {
                errors.push(e);
            }
        }
        if let Some(number) = self.number {
            annotator.number(number);
        }
        if let Some(visibility) = self.visibility {
            if let Err(e) = annotator.visibility(visibility) {
                errors.push(e);
            }
        }
        match self.hide_errors {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(Value::Bool(true)) => {
                annotator.hide_errors();
            }
            Some(message) => {
                annotator.hide_errors_with(coerce_to_string(message));
            }
        }
        if let Some(tags) = self.tags {
            if let Err(e) = annotator.tags(tags) {
                errors.push(e);
            }
        }
        if let Some(leaderboard) = self.leaderboard {
            match leaderboard.sort_order {
                Some(order) => {
                    if let Err(e) = annotator.leaderboard_sorted(leaderboard.column_name, order) {
                        errors.push(e);
                    }
                }
                None => {
                    annotator.leaderboard(leaderboard.column_name);
                }
            }
        }
        if let Some(credit) = self.partial_credit {
            if let Err(e) = annotator.partial_credit(credit) {
                errors.push(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::enrich;
    use crate::outcome::Outcome;
    use gradescope_common::types::{SortOrder, Visibility};
    use serde_json::Number;

    #[test]
    fn test_load_full_declaration() {
        let registry = DeclarationsDocument::load(
            r#"{
                "tests": {
                    "t": {
                        "weight": 10,
                        "number": 1.5,
                        "visibility": "hidden",
                        "hide_errors": true,
                        "tags": "io",
                        "leaderboard": {"column_name": "runtime", "sort_order": "asc"}
                    }
                }
            }"#,
        )
        .unwrap();

        let record = enrich(&registry, Outcome::passed("t")).unwrap();
        let annotation = record.annotation;
        assert_eq!(annotation.weight, Number::from(10));
        assert_eq!(annotation.number.as_deref(), Some("1.5"));
        assert_eq!(annotation.visibility, Visibility::Hidden);
        assert_eq!(annotation.hide_errors.as_deref(), Some("Test failed"));
        assert_eq!(annotation.tags, vec!["io"]);
        assert_eq!(annotation.leaderboard_column.as_deref(), Some("runtime"));
        assert_eq!(annotation.leaderboard_sort_order, SortOrder::Asc);
    }

    #[test]
    fn test_custom_hide_message_and_default_sort_order() {
        let registry = DeclarationsDocument::load(
            r#"{"tests": {"t": {"hide_errors": "nope", "leaderboard": {"column_name": "acc"}}}}"#,
        )
        .unwrap();

        let annotation = enrich(&registry, Outcome::passed("t")).unwrap().annotation;
        assert_eq!(annotation.hide_errors.as_deref(), Some("nope"));
        assert_eq!(annotation.leaderboard_sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_partial_credit_arms_score_callback() {
        let registry =
            DeclarationsDocument::load(r#"{"tests": {"t": {"partial_credit": 4}}}"#).unwrap();
        registry.context("t").set_score(1).unwrap();

        let annotation = enrich(&registry, Outcome::passed("t")).unwrap().annotation;
        assert_eq!(annotation.weight, Number::from(4));
        assert_eq!(annotation.score, Some(Number::from(1)));
    }

    #[test]
    fn test_every_invalid_attribute_is_reported() {
        let err = DeclarationsDocument::load(
            r#"{
                "tests": {
                    "a": {"weight": "heavy", "visibility": "foo"},
                    "b": {"tags": 3},
                    "c": {"weight": 1}
                }
            }"#,
        )
        .unwrap_err();

        let ManifestError::Invalid(errors) = err else {
            panic!("expected invalid declarations");
        };
        let found: Vec<(&str, &str)> = errors
            .iter()
            .map(|e| (e.test.as_str(), e.source.attribute()))
            .collect();
        assert_eq!(found, vec![("a", "weight"), ("a", "visibility"), ("b", "tags")]);
    }

    #[test]
    fn test_invalid_error_message() {
        assert_eq!(
            ManifestError::Invalid(Vec::new()).to_string(),
            "0 invalid declaration(s)"
        );

        let err = DeclarationsDocument::load(r#"{"tests": {"a": {"tags": 3}}}"#).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("1 invalid declaration(s), first: "));
        assert!(message.contains("`a`"));
    }

    #[test]
    fn test_unknown_attribute_is_a_parse_error() {
        let err = DeclarationsDocument::load(r#"{"tests": {"t": {"wieght": 1}}}"#).unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }
}
