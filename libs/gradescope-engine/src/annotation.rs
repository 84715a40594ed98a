/// Test Annotations - Declared Per-Test Metadata
///
/// Every attribute a test can declare about itself lives in
/// [`TestAnnotation`]. Values arrive loosely typed (anything convertible into
/// a `serde_json::Value`) and are validated here, at declaration time, so a
/// bad weight or visibility is reported against the test that declared it
/// instead of surfacing later while the results document is assembled.
///
/// **Validation Rules:**
/// - weight / partial credit: must be a number (type error) and >= 0 (value error)
/// - number: any value, coerced to a string
/// - visibility: one of the four known strings (value error otherwise)
/// - tags: a string or an array (type error otherwise), elements coerced to strings
/// - leaderboard sort order: `asc` or `desc` (value error otherwise)
/// - score: must be a number (type error) and >= 0 (value error), never clamped

use gradescope_common::types::{SortOrder, Visibility};
use serde_json::{Number, Value};
use thiserror::Error;

pub const DEFAULT_HIDE_ERRORS_MESSAGE: &str = "Test failed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnotationError {
    #[error("{attribute} must be {expected}, got {found}")]
    Type {
        attribute: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("{attribute} {reason}, got {found}")]
    Value {
        attribute: &'static str,
        reason: &'static str,
        found: String,
    },

    #[error("{attribute} is not available: the test never declared {declaration}")]
    Unbound {
        attribute: &'static str,
        declaration: &'static str,
    },
}

impl AnnotationError {
    pub fn attribute(&self) -> &'static str {
        match self {
            AnnotationError::Type { attribute, .. }
            | AnnotationError::Value { attribute, .. }
            | AnnotationError::Unbound { attribute, .. } => attribute,
        }
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self, AnnotationError::Type { .. })
    }

    pub fn is_value_error(&self) -> bool {
        matches!(self, AnnotationError::Value { .. })
    }
}

/// Metadata attached to a single test.
///
/// `score` and `leaderboard_value` are the only fields written while the
/// test body runs; everything else is fixed once the test is declared.
#[derive(Debug, Clone, PartialEq)]
pub struct TestAnnotation {
    pub weight: Number,
    pub number: Option<String>,
    pub visibility: Visibility,
    pub hide_errors: Option<String>,
    pub tags: Vec<String>,
    pub leaderboard_column: Option<String>,
    pub leaderboard_sort_order: SortOrder,
    pub leaderboard_value: Option<Value>,
    pub score: Option<Number>,
}

impl Default for TestAnnotation {
    fn default() -> Self {
        Self {
            weight: Number::from(0),
            number: None,
            visibility: Visibility::default(),
            hide_errors: None,
            tags: Vec::new(),
            leaderboard_column: None,
            leaderboard_sort_order: SortOrder::default(),
            leaderboard_value: None,
            score: None,
        }
    }
}

/// Short description of a value for error messages
fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

/// Strings stay verbatim; everything else uses its JSON text
pub(crate) fn coerce_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Validate a non-negative number. Shared by weight, partial credit and score.
fn non_negative(value: Value, attribute: &'static str) -> Result<Number, AnnotationError> {
    let number = match value {
        Value::Number(n) => n,
        other => {
            return Err(AnnotationError::Type {
                attribute,
                expected: "an integer or a float",
                found: describe(&other),
            })
        }
    };

    // Every serde_json::Number converts to f64
    let is_negative = number.as_f64().map_or(false, |f| f < 0.0);
    if is_negative {
        return Err(AnnotationError::Value {
            attribute,
            reason: "must be non-negative",
            found: number.to_string(),
        });
    }

    Ok(number)
}

pub fn parse_weight(value: impl Into<Value>) -> Result<Number, AnnotationError> {
    non_negative(value.into(), "weight")
}

pub fn parse_partial_credit(value: impl Into<Value>) -> Result<Number, AnnotationError> {
    non_negative(value.into(), "partial_credit")
}

pub fn parse_score(value: impl Into<Value>) -> Result<Number, AnnotationError> {
    non_negative(value.into(), "score")
}

pub fn parse_number(value: impl Into<Value>) -> String {
    coerce_to_string(value.into())
}

pub fn parse_visibility(value: impl Into<Value>) -> Result<Visibility, AnnotationError> {
    let value = value.into();
    value
        .as_str()
        .and_then(|s| s.parse::<Visibility>().ok())
        .ok_or_else(|| AnnotationError::Value {
            attribute: "visibility",
            reason: "must be one of 'hidden', 'after_due_date', 'after_published', or 'visible'",
            found: describe(&value),
        })
}

pub fn parse_tags(value: impl Into<Value>) -> Result<Vec<String>, AnnotationError> {
    match value.into() {
        Value::String(tag) => Ok(vec![tag]),
        Value::Array(tags) => Ok(tags.into_iter().map(coerce_to_string).collect()),
        other => Err(AnnotationError::Type {
            attribute: "tags",
            expected: "a string or a list of strings",
            found: describe(&other),
        }),
    }
}

pub fn parse_sort_order(value: impl Into<Value>) -> Result<SortOrder, AnnotationError> {
    let value = value.into();
    value
        .as_str()
        .and_then(|s| s.parse::<SortOrder>().ok())
        .ok_or_else(|| AnnotationError::Value {
            attribute: "leaderboard_sort_order",
            reason: "must be either 'asc' or 'desc'",
            found: describe(&value),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_weight_accepts_integers_and_floats() {
        assert_eq!(parse_weight(10).unwrap(), Number::from(10));
        assert_eq!(parse_weight(0).unwrap(), Number::from(0));
        assert_eq!(parse_weight(2.5).unwrap().as_f64(), Some(2.5));
    }

    #[test]
    fn test_weight_rejects_non_numbers() {
        let err = parse_weight("ten").unwrap_err();
        assert!(err.is_type_error());
        assert_eq!(err.attribute(), "weight");

        assert!(parse_weight(json!([1])).unwrap_err().is_type_error());
        assert!(parse_weight(true).unwrap_err().is_type_error());
        // NaN has no JSON representation and becomes null
        assert!(parse_weight(f64::NAN).unwrap_err().is_type_error());
    }

    #[test]
    fn test_weight_rejects_negative() {
        let err = parse_weight(-1).unwrap_err();
        assert!(err.is_value_error());
        assert!(parse_weight(-0.5).unwrap_err().is_value_error());
    }

    #[test]
    fn test_score_is_never_clamped() {
        assert!(parse_score(-3).unwrap_err().is_value_error());
        assert!(parse_score("3").unwrap_err().is_type_error());
        assert_eq!(parse_score(3).unwrap(), Number::from(3));
    }

    #[test]
    fn test_number_coerces_to_string() {
        assert_eq!(parse_number("1.5"), "1.5");
        assert_eq!(parse_number(3), "3");
        assert_eq!(parse_number(1.25), "1.25");
    }

    #[test]
    fn test_visibility_validation() {
        assert_eq!(parse_visibility("hidden").unwrap(), Visibility::Hidden);
        assert_eq!(
            parse_visibility("after_published").unwrap(),
            Visibility::AfterPublished
        );

        let err = parse_visibility("foo").unwrap_err();
        assert!(err.is_value_error());
        assert_eq!(err.attribute(), "visibility");

        // Non-strings are a value error too
        assert!(parse_visibility(1).unwrap_err().is_value_error());
    }

    #[test]
    fn test_tags_single_string_and_list_are_equivalent() {
        assert_eq!(parse_tags("x").unwrap(), vec!["x".to_string()]);
        assert_eq!(parse_tags(vec!["x"]).unwrap(), vec!["x".to_string()]);
    }

    #[test]
    fn test_tags_coerce_elements() {
        assert_eq!(
            parse_tags(json!(["a", 1, true])).unwrap(),
            vec!["a".to_string(), "1".to_string(), "true".to_string()]
        );
        assert!(parse_tags(json!({"a": 1})).unwrap_err().is_type_error());
        assert!(parse_tags(5).unwrap_err().is_type_error());
    }

    #[test]
    fn test_sort_order_validation() {
        assert_eq!(parse_sort_order("asc").unwrap(), SortOrder::Asc);
        assert_eq!(parse_sort_order("desc").unwrap(), SortOrder::Desc);
        assert!(parse_sort_order("up").unwrap_err().is_value_error());
    }

    #[test]
    fn test_default_annotation() {
        let annotation = TestAnnotation::default();
        assert_eq!(annotation.weight, Number::from(0));
        assert_eq!(annotation.visibility, Visibility::Visible);
        assert_eq!(annotation.leaderboard_sort_order, SortOrder::Desc);
        assert!(annotation.tags.is_empty());
        assert!(annotation.number.is_none());
        assert!(annotation.hide_errors.is_none());
        assert!(annotation.score.is_none());
    }
}
