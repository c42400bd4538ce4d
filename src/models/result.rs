// src/models/result.rs

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};

use crate::models::survey::{Question, QuestionType};
use crate::utils::html::clean_html;

pub const SCALE_MIN: i64 = 1;
pub const SCALE_MAX: i64 = 10;
pub const SCALE_DEFAULT: i64 = 5;

/// Represents the 'results' table in the database.
/// Created exactly once per assignment, immutable afterwards.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SurveyResult {
    pub id: i64,
    pub assignment_id: i64,
    /// Answers keyed by question id; the value shape depends on the
    /// question type.
    pub answers: Json<HashMap<i64, Value>>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting answers against a pending assignment.
#[derive(Debug, Deserialize)]
pub struct SubmitResultRequest {
    #[serde(default)]
    pub answers: HashMap<i64, Value>,
}

/// Validates submitted answers against the survey's questions and normalizes
/// them into their canonical shapes:
///
/// * single_choice — one of the question's options
/// * multi_choice  — deduplicated subset of the options
/// * text          — sanitized free string
/// * scale         — integer 1..=10, defaulting to 5 when absent
///
/// Unknown question ids are rejected outright.
pub fn normalize_answers(
    questions: &[Question],
    submitted: &HashMap<i64, Value>,
) -> Result<HashMap<i64, Value>, String> {
    let known: HashSet<i64> = questions.iter().map(|q| q.id).collect();
    for id in submitted.keys() {
        if !known.contains(id) {
            return Err(format!("Unknown question id {}.", id));
        }
    }

    let mut normalized = HashMap::with_capacity(questions.len());
    for question in questions {
        let raw = submitted.get(&question.id);
        let value = match question.question_type {
            QuestionType::SingleChoice => {
                let choice = raw
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(question))?;
                if !question.options.0.iter().any(|o| o == choice) {
                    return Err(format!(
                        "'{}' is not an option of question '{}'.",
                        choice, question.text
                    ));
                }
                Value::from(choice)
            }
            QuestionType::MultiChoice => {
                let selected = raw
                    .and_then(Value::as_array)
                    .ok_or_else(|| missing(question))?;
                let mut choices: Vec<String> = Vec::new();
                for entry in selected {
                    let choice = entry.as_str().ok_or_else(|| missing(question))?;
                    if !question.options.0.iter().any(|o| o == choice) {
                        return Err(format!(
                            "'{}' is not an option of question '{}'.",
                            choice, question.text
                        ));
                    }
                    if !choices.iter().any(|c| c == choice) {
                        choices.push(choice.to_string());
                    }
                }
                Value::from(choices)
            }
            QuestionType::Text => {
                let text = raw
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(question))?;
                Value::from(clean_html(text))
            }
            QuestionType::Scale => match raw {
                None | Some(Value::Null) => Value::from(SCALE_DEFAULT),
                Some(v) => {
                    let n = v.as_i64().ok_or_else(|| {
                        format!("Question '{}' expects an integer answer.", question.text)
                    })?;
                    if !(SCALE_MIN..=SCALE_MAX).contains(&n) {
                        return Err(format!(
                            "Answer to '{}' must be between {} and {}.",
                            question.text, SCALE_MIN, SCALE_MAX
                        ));
                    }
                    Value::from(n)
                }
            },
        };
        normalized.insert(question.id, value);
    }

    Ok(normalized)
}

fn missing(question: &Question) -> String {
    format!("Question '{}' is missing an answer.", question.text)
}
