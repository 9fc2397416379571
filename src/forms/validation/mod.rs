mod rules;

use std::collections::{BTreeMap, BTreeSet};

use super::domain::{AnswerEntry, Form};

/// Per-question validation failure. Every variant renders the message the
/// caller shows next to the offending question.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("an answer to this required question is missing")]
    MissingRequiredAnswer,
    #[error("expected a single value, got {got}")]
    ExpectedSingleValue { got: usize },
    #[error("'{value}' is not one of the question's options")]
    InvalidOption { value: String },
    #[error("'{value}' is not a number")]
    NotNumeric { value: String },
    #[error("answer length {length} is below the minimum length {min}")]
    BelowMinLength { length: usize, min: usize },
    #[error("answer length {length} exceeds the maximum length {max}")]
    AboveMaxLength { length: usize, max: usize },
    #[error("value {value} is below the minimum {min}")]
    BelowMinValue { value: i64, min: i64 },
    #[error("value {value} exceeds the maximum {max}")]
    AboveMaxValue { value: i64, max: i64 },
    #[error("this question does not belong to the form")]
    UnknownQuestion,
    #[error("the submission answers this question more than once")]
    DuplicateAnswer,
}

impl AnswerError {
    /// Length and value bound failures are both range violations as far as
    /// callers are concerned.
    pub fn is_out_of_range(&self) -> bool {
        matches!(
            self,
            AnswerError::BelowMinLength { .. }
                | AnswerError::AboveMaxLength { .. }
                | AnswerError::BelowMinValue { .. }
                | AnswerError::AboveMaxValue { .. }
        )
    }
}

/// Complete set of per-question failures for one submission. Validation never
/// stops at the first problem; the caller reports everything in one round
/// trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    errors: BTreeMap<u32, AnswerError>,
}

impl ValidationReport {
    fn record(&mut self, question_id: u32, error: AnswerError) {
        // The first failure recorded for a question wins; later checks for
        // the same question are skipped anyway.
        self.errors.entry(question_id).or_insert(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn error_for(&self, question_id: u32) -> Option<&AnswerError> {
        self.errors.get(&question_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &AnswerError)> {
        self.errors.iter().map(|(id, error)| (*id, error))
    }

    /// Human-readable message per offending question id, in wire form.
    pub fn details(&self) -> BTreeMap<u32, String> {
        self.errors
            .iter()
            .map(|(id, error)| (*id, error.to_string()))
            .collect()
    }
}

/// Validate every submitted answer against the form's question schemas.
///
/// Pure and total: no state is touched, and the result is either complete
/// acceptance or the full set of per-question errors.
pub fn validate_submission(form: &Form, answers: &[AnswerEntry]) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();

    let mut seen = BTreeSet::new();
    for entry in answers {
        if !seen.insert(entry.question_id) {
            report.record(entry.question_id, AnswerError::DuplicateAnswer);
        }
        if form.question(entry.question_id).is_none() {
            report.record(entry.question_id, AnswerError::UnknownQuestion);
        }
    }

    for question in &form.questions {
        if report.error_for(question.id).is_some() {
            continue;
        }

        let values: &[String] = answers
            .iter()
            .find(|entry| entry.question_id == question.id)
            .map(|entry| entry.values.as_slice())
            .unwrap_or(&[]);

        let answered = values.iter().any(|value| !value.trim().is_empty());
        if !answered {
            if question.required {
                report.record(question.id, AnswerError::MissingRequiredAnswer);
            }
            // A blank answer to an optional question is simply not counted.
            continue;
        }

        if let Some(error) = rules::check_answer(question, values) {
            report.record(question.id, error);
        }
    }

    if report.is_empty() {
        Ok(())
    } else {
        Err(report)
    }
}
