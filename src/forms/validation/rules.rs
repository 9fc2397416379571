use super::AnswerError;
use crate::forms::domain::{Constraints, Question, QuestionKind};

/// Dispatch one answered question to its type handler. Adding a question
/// type means adding a `QuestionKind` variant and a handler here.
pub(crate) fn check_answer(question: &Question, values: &[String]) -> Option<AnswerError> {
    let constraints = question.constraints.unwrap_or_default();
    match question.kind {
        QuestionKind::FreeText => free_text(&constraints, values),
        QuestionKind::SingleChoice => single_choice(&question.options, values),
        QuestionKind::MultiChoice => multi_choice(&question.options, values),
        QuestionKind::NumericScale => numeric_scale(&constraints, values),
    }
}

fn free_text(constraints: &Constraints, values: &[String]) -> Option<AnswerError> {
    let text = match single_value(values) {
        Ok(text) => text,
        Err(error) => return Some(error),
    };
    let length = text.chars().count();
    if let Some(min) = constraints.min_length {
        if length < min {
            return Some(AnswerError::BelowMinLength { length, min });
        }
    }
    if let Some(max) = constraints.max_length {
        if length > max {
            return Some(AnswerError::AboveMaxLength { length, max });
        }
    }
    None
}

fn single_choice(options: &[String], values: &[String]) -> Option<AnswerError> {
    let selected = match single_value(values) {
        Ok(selected) => selected,
        Err(error) => return Some(error),
    };
    match_option(options, selected)
}

fn multi_choice(options: &[String], values: &[String]) -> Option<AnswerError> {
    // Duplicates within the selection are permitted; each value is checked
    // independently, case-sensitively.
    for value in values {
        if let Some(error) = match_option(options, value) {
            return Some(error);
        }
    }
    None
}

fn numeric_scale(constraints: &Constraints, values: &[String]) -> Option<AnswerError> {
    let raw = match single_value(values) {
        Ok(raw) => raw,
        Err(error) => return Some(error),
    };
    let value: i64 = match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            return Some(AnswerError::NotNumeric {
                value: raw.to_string(),
            })
        }
    };
    if let Some(min) = constraints.min_value {
        if value < min {
            return Some(AnswerError::BelowMinValue { value, min });
        }
    }
    if let Some(max) = constraints.max_value {
        if value > max {
            return Some(AnswerError::AboveMaxValue { value, max });
        }
    }
    None
}

fn match_option(options: &[String], selected: &str) -> Option<AnswerError> {
    if options.iter().any(|option| option == selected) {
        None
    } else {
        Some(AnswerError::InvalidOption {
            value: selected.to_string(),
        })
    }
}

/// Cardinality check shared by the single-value kinds.
fn single_value(values: &[String]) -> Result<&str, AnswerError> {
    if values.len() == 1 {
        Ok(values[0].as_str())
    } else {
        Err(AnswerError::ExpectedSingleValue { got: values.len() })
    }
}
