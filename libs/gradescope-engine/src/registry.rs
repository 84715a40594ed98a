/// Per-Test Metadata Registry
///
/// **Responsibility:**
/// Own one metadata record per test, keyed by the test's qualified name.
///
/// **Lifecycle of a record:**
/// 1. Declaration: [`Annotator`] validates and stores static attributes
/// 2. Execution: the test body receives a [`TestContext`] and may set its
///    score or leaderboard value through it
/// 3. Enrichment: the record is read back exactly once after the test
///    finished (see `enrichment.rs`)
///
/// The static part is only touched through `&mut Registry`, so declaration
/// happens before execution starts. The dynamic part sits behind a per-test
/// mutex shared with that test's contexts, which lets the engine run test
/// bodies on other threads.

use crate::annotation::{self, AnnotationError, TestAnnotation, DEFAULT_HIDE_ERRORS_MESSAGE};
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// A declaration rejected for a specific test
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid declaration for test `{test}`: {source}")]
pub struct DeclarationError {
    pub test: String,
    #[source]
    pub source: AnnotationError,
}

/// Values the running test body may write
#[derive(Debug, Default)]
pub(crate) struct DynamicValues {
    pub(crate) score_bound: bool,
    pub(crate) leaderboard_bound: bool,
    pub(crate) score: Option<Number>,
    pub(crate) leaderboard_value: Option<Value>,
}

#[derive(Debug, Default)]
pub(crate) struct Slot {
    pub(crate) annotation: TestAnnotation,
    pub(crate) dynamic: Arc<Mutex<DynamicValues>>,
    pub(crate) rejected: Option<AnnotationError>,
}

#[derive(Debug, Default)]
pub struct Registry {
    slots: HashMap<String, Slot>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or continue) declaring attributes for `test`
    pub fn annotate(&mut self, test: impl Into<String>) -> Annotator<'_> {
        let test = test.into();
        let slot = self.slots.entry(test.clone()).or_default();
        Annotator { test, slot }
    }

    /// Handle passed to the body of `test` while it runs.
    ///
    /// An undeclared test gets a context with no callbacks bound.
    pub fn context(&self, test: &str) -> TestContext {
        let dynamic = self
            .slots
            .get(test)
            .map(|slot| Arc::clone(&slot.dynamic))
            .unwrap_or_default();

        TestContext {
            test: test.to_string(),
            dynamic,
        }
    }

    pub fn contains(&self, test: &str) -> bool {
        self.slots.contains_key(test)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every test whose declaration failed validation, sorted by name
    pub fn rejected(&self) -> Vec<DeclarationError> {
        let mut rejected: Vec<DeclarationError> = self
            .slots
            .iter()
            .filter_map(|(test, slot)| {
                slot.rejected.clone().map(|source| DeclarationError {
                    test: test.clone(),
                    source,
                })
            })
            .collect();
        rejected.sort_by(|a, b| a.test.cmp(&b.test));
        rejected
    }

    pub(crate) fn slot(&self, test: &str) -> Option<&Slot> {
        self.slots.get(test)
    }
}

/// Declaration-time attribute setter for one test.
///
/// Each setter validates its input first; a rejected value leaves the stored
/// annotation untouched and marks the test as rejected.
#[derive(Debug)]
pub struct Annotator<'a> {
    test: String,
    slot: &'a mut Slot,
}

impl<'a> Annotator<'a> {
    fn reject(&mut self, source: AnnotationError) -> DeclarationError {
        tracing::warn!(test = %self.test, attribute = source.attribute(), error = %source, "Declaration rejected");
        if self.slot.rejected.is_none() {
            self.slot.rejected = Some(source.clone());
        }
        DeclarationError {
            test: self.test.clone(),
            source,
        }
    }

    fn dynamic(&self) -> std::sync::MutexGuard<'_, DynamicValues> {
        self.slot
            .dynamic
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn weight(&mut self, value: impl Into<Value>) -> Result<&mut Self, DeclarationError> {
        match annotation::parse_weight(value) {
            Ok(weight) => {
                self.slot.annotation.weight = weight;
                Ok(self)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    pub fn number(&mut self, value: impl Into<Value>) -> &mut Self {
        self.slot.annotation.number = Some(annotation::parse_number(value));
        self
    }

    pub fn visibility(&mut self, value: impl Into<Value>) -> Result<&mut Self, DeclarationError> {
        match annotation::parse_visibility(value) {
            Ok(visibility) => {
                self.slot.annotation.visibility = visibility;
                Ok(self)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Replace failure output with the default message
    pub fn hide_errors(&mut self) -> &mut Self {
        self.hide_errors_with(DEFAULT_HIDE_ERRORS_MESSAGE)
    }

    pub fn hide_errors_with(&mut self, message: impl Into<String>) -> &mut Self {
        self.slot.annotation.hide_errors = Some(message.into());
        self
    }

    pub fn tags(&mut self, value: impl Into<Value>) -> Result<&mut Self, DeclarationError> {
        match annotation::parse_tags(value) {
            Ok(tags) => {
                self.slot.annotation.tags = tags;
                Ok(self)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Bind the test to a leaderboard column sorted descending
    pub fn leaderboard(&mut self, column_name: impl Into<Value>) -> &mut Self {
        self.slot.annotation.leaderboard_column =
            Some(annotation::coerce_to_string(column_name.into()));
        self.slot.annotation.leaderboard_sort_order = Default::default();
        self.dynamic().leaderboard_bound = true;
        self
    }

    pub fn leaderboard_sorted(
        &mut self,
        column_name: impl Into<Value>,
        sort_order: impl Into<Value>,
    ) -> Result<&mut Self, DeclarationError> {
        match annotation::parse_sort_order(sort_order) {
            Ok(order) => {
                self.leaderboard(column_name);
                self.slot.annotation.leaderboard_sort_order = order;
                Ok(self)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Set the maximum score and let the test body report what it earned
    pub fn partial_credit(&mut self, value: impl Into<Value>) -> Result<&mut Self, DeclarationError> {
        match annotation::parse_partial_credit(value) {
            Ok(weight) => {
                self.slot.annotation.weight = weight;
                self.dynamic().score_bound = true;
                Ok(self)
            }
            Err(e) => Err(self.reject(e)),
        }
    }
}

/// Callbacks available to a running test body
#[derive(Debug, Clone)]
pub struct TestContext {
    test: String,
    dynamic: Arc<Mutex<DynamicValues>>,
}

impl TestContext {
    pub fn test(&self) -> &str {
        &self.test
    }

    /// Record the earned score. Requires a partial credit declaration.
    pub fn set_score(&self, score: impl Into<Value>) -> Result<(), AnnotationError> {
        let mut dynamic = self.dynamic.lock().unwrap_or_else(PoisonError::into_inner);
        if !dynamic.score_bound {
            return Err(AnnotationError::Unbound {
                attribute: "score",
                declaration: "partial_credit",
            });
        }
        let score = annotation::parse_score(score)?;
        tracing::debug!(test = %self.test, score = %score, "Score set");
        dynamic.score = Some(score);
        Ok(())
    }

    /// Record the leaderboard value. Requires a leaderboard declaration.
    pub fn set_leaderboard_value(&self, value: impl Into<Value>) -> Result<(), AnnotationError> {
        let mut dynamic = self.dynamic.lock().unwrap_or_else(PoisonError::into_inner);
        if !dynamic.leaderboard_bound {
            return Err(AnnotationError::Unbound {
                attribute: "leaderboard_value",
                declaration: "leaderboard",
            });
        }
        let value = value.into();
        tracing::debug!(test = %self.test, value = %value, "Leaderboard value set");
        dynamic.leaderboard_value = Some(value);
        Ok(())
    }
}
